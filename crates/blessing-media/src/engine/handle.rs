//! Explicitly owned engine handle.
//!
//! Holds at most one live engine. The first [`EngineHandle::acquire`] pays
//! the cold-start load; concurrent callers wait on the same load and get the
//! same engine. [`EngineHandle::release`] terminates it so the next acquire
//! loads afresh.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::engine::{CodecEngine, EngineLoader};
use crate::error::MediaResult;
use crate::metrics;

/// Guard proving exclusive use of the engine for one composition run.
pub type RunGuard<'a> = MutexGuard<'a, ()>;

pub struct EngineHandle<L: EngineLoader> {
    loader: L,
    slot: Mutex<Option<Arc<L::Engine>>>,
    run_lock: Mutex<()>,
    loads: AtomicU64,
}

impl<L: EngineLoader> EngineHandle<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            slot: Mutex::new(None),
            run_lock: Mutex::new(()),
            loads: AtomicU64::new(0),
        }
    }

    /// Return the live engine, loading it first if needed.
    ///
    /// The slot lock is held across the load, so a second caller arriving
    /// mid-load waits for it instead of starting another.
    pub async fn acquire(&self) -> MediaResult<Arc<L::Engine>> {
        let mut slot = self.slot.lock().await;

        if let Some(engine) = slot.as_ref() {
            return Ok(Arc::clone(engine));
        }

        let started = Instant::now();
        info!("Loading codec engine (cold start)");

        match self.loader.load().await {
            Ok(engine) => {
                let engine = Arc::new(engine);
                *slot = Some(Arc::clone(&engine));
                self.loads.fetch_add(1, Ordering::SeqCst);
                metrics::record_engine_load(true);
                info!(
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Codec engine ready"
                );
                Ok(engine)
            }
            Err(e) => {
                metrics::record_engine_load(false);
                warn!(error = %e, "Codec engine failed to load");
                Err(e)
            }
        }
    }

    /// Return the live engine without loading.
    pub async fn current(&self) -> Option<Arc<L::Engine>> {
        self.slot.lock().await.as_ref().map(Arc::clone)
    }

    /// Terminate and clear the engine. Safe to call when nothing is loaded.
    ///
    /// Waits for an in-flight run to finish first.
    pub async fn release(&self) -> MediaResult<()> {
        let _run = self.run_lock.lock().await;
        let engine = self.slot.lock().await.take();

        match engine {
            Some(engine) => {
                engine.terminate().await?;
                info!("Codec engine released");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Whether an engine is currently loaded.
    pub async fn is_loaded(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Number of successful loads over the handle's lifetime.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    /// Take exclusive use of the engine for one run.
    pub async fn lock_run(&self) -> RunGuard<'_> {
        self.run_lock.lock().await
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recording::RecordingEngine;
    use crate::error::MediaError;
    use async_trait::async_trait;
    use std::time::Duration;

    struct SlowLoader {
        calls: AtomicU64,
        fail: bool,
    }

    #[async_trait]
    impl EngineLoader for SlowLoader {
        type Engine = RecordingEngine;

        async fn load(&self) -> MediaResult<RecordingEngine> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail {
                return Err(MediaError::engine_unavailable("no binary"));
            }
            Ok(RecordingEngine::default())
        }
    }

    fn handle(fail: bool) -> EngineHandle<SlowLoader> {
        EngineHandle::new(SlowLoader {
            calls: AtomicU64::new(0),
            fail,
        })
    }

    #[tokio::test]
    async fn test_concurrent_acquire_loads_once() {
        let handle = handle(false);

        let (a, b) = tokio::join!(handle.acquire(), handle.acquire());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(handle.loader().calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.load_count(), 1);
    }

    #[tokio::test]
    async fn test_release_then_acquire_reloads() {
        let handle = handle(false);

        let first = handle.acquire().await.unwrap();
        handle.release().await.unwrap();
        assert!(first.terminated.load(Ordering::SeqCst));
        assert!(!handle.is_loaded().await);

        let second = handle.acquire().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(handle.load_count(), 2);
    }

    #[tokio::test]
    async fn test_release_without_engine_is_noop() {
        let handle = handle(false);
        handle.release().await.unwrap();
        handle.release().await.unwrap();
        assert_eq!(handle.loader().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_load_leaves_slot_empty() {
        let handle = handle(true);

        assert!(handle.acquire().await.is_err());
        assert!(!handle.is_loaded().await);
        assert!(handle.acquire().await.is_err());
        assert_eq!(handle.loader().calls.load(Ordering::SeqCst), 2);
    }
}
