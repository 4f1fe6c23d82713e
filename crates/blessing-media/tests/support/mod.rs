//! Simulating engine and fixtures for pipeline tests.
//!
//! `SimEngine` never decodes media. Every file it produces is a small JSON
//! stub describing the media (duration, overlay, audio), derived from the
//! command the way FFmpeg would: `-t` limits, `concat` sums, `-shortest`
//! takes the minimum.

#![allow(dead_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use blessing_media::command::InputSource;
use blessing_media::{
    AssetFetcher, CodecEngine, Composer, EngineFile, EngineLoader, FfmpegCommand, MediaError,
    MediaResult, Namespace, ProgressFn, ProgressSink,
};
use blessing_models::AssetRef;

pub const JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

/// What a simulated media file contains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaStub {
    pub duration: f64,
    pub overlay: bool,
    pub audio: bool,
}

impl MediaStub {
    pub fn audio(duration: f64) -> Vec<u8> {
        serde_json::to_vec(&MediaStub {
            duration,
            overlay: false,
            audio: true,
        })
        .unwrap()
    }

    pub fn parse(bytes: &[u8]) -> MediaStub {
        serde_json::from_slice(bytes).unwrap()
    }
}

/// State shared by every engine a loader hands out.
#[derive(Default)]
pub struct SimState {
    pub files: Mutex<HashMap<EngineFile, Vec<u8>>>,
    pub live: Mutex<HashSet<String>>,
    pub max_live: AtomicUsize,
    pub commands: Mutex<Vec<Vec<String>>>,
    pub fail_exec_on: Mutex<Option<String>>,
    pub fail_read: AtomicBool,
}

impl SimState {
    pub fn fail_exec_on(&self, pattern: &str) {
        *self.fail_exec_on.lock().unwrap() = Some(pattern.to_string());
    }

    pub fn live_namespaces(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn stored_files(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }

    /// Every `drawtext` filter passed to the engine, in order.
    pub fn drawtext_filters(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .flatten()
            .filter(|arg| arg.starts_with("drawtext="))
            .collect()
    }
}

pub struct SimEngine {
    state: Arc<SimState>,
    pub terminated: AtomicBool,
}

impl SimEngine {
    fn ensure_live(&self) -> MediaResult<()> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(MediaError::engine_unavailable("terminated"));
        }
        Ok(())
    }

    fn stub(&self, file: &EngineFile) -> Option<MediaStub> {
        let files = self.state.files.lock().unwrap();
        files
            .get(file)
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }

    fn simulate(&self, command: &FfmpegCommand) -> MediaStub {
        let inputs: Vec<MediaStub> = command
            .inputs()
            .iter()
            .map(|input| {
                let mut stub = match input.source() {
                    InputSource::File(file) => self.stub(file).unwrap_or(MediaStub {
                        duration: f64::INFINITY,
                        ..MediaStub::default()
                    }),
                    InputSource::Lavfi(description) => MediaStub {
                        duration: lavfi_duration(description).unwrap_or(f64::INFINITY),
                        overlay: false,
                        audio: true,
                    },
                };
                if let Some(limit) = input.declared_duration() {
                    stub.duration = stub.duration.min(limit);
                }
                stub
            })
            .collect();

        let concat = command
            .output_flag_value("-filter_complex")
            .is_some_and(|f| f.contains("concat"));

        let mut duration = if concat {
            inputs.iter().map(|i| i.duration).sum()
        } else if command.has_output_flag("-shortest") {
            inputs.iter().map(|i| i.duration).fold(f64::INFINITY, f64::min)
        } else {
            inputs.first().map(|i| i.duration).unwrap_or(0.0)
        };

        if let Some(limit) = command.output_flag_value("-t").and_then(|t| t.parse::<f64>().ok()) {
            duration = duration.min(limit);
        }

        let overlay = command
            .output_flag_value("-vf")
            .is_some_and(|f| f.starts_with("drawtext="))
            || inputs.first().is_some_and(|i| i.overlay);

        let audio = !command.has_output_flag("-an") && inputs.iter().any(|i| i.audio);

        MediaStub {
            duration,
            overlay,
            audio,
        }
    }
}

fn lavfi_duration(description: &str) -> Option<f64> {
    description
        .split(':')
        .find_map(|part| part.strip_prefix("duration="))
        .and_then(|d| d.parse().ok())
}

#[async_trait]
impl CodecEngine for SimEngine {
    async fn create_namespace(&self, id: &str) -> MediaResult<Namespace> {
        self.ensure_live()?;
        let mut live = self.state.live.lock().unwrap();
        live.insert(id.to_string());
        self.state.max_live.fetch_max(live.len(), Ordering::SeqCst);
        Ok(Namespace::new(id))
    }

    async fn write_file(&self, namespace: &Namespace, name: &str, data: &[u8]) -> MediaResult<EngineFile> {
        self.ensure_live()?;
        let file = namespace.file(name);
        self.state.files.lock().unwrap().insert(file.clone(), data.to_vec());
        Ok(file)
    }

    async fn exec(&self, command: &FfmpegCommand, progress: &ProgressFn<'_>) -> MediaResult<()> {
        self.ensure_live()?;
        let args = command.render_args(|f| f.to_string());
        self.state.commands.lock().unwrap().push(args.clone());

        // Yield so concurrent callers get a chance to interleave
        tokio::task::yield_now().await;

        let pattern = self.state.fail_exec_on.lock().unwrap().clone();
        if let Some(pattern) = pattern {
            if args.iter().any(|a| a.contains(&pattern)) {
                return Err(MediaError::ffmpeg_failed("simulated failure", None, Some(1)));
            }
        }

        progress(0.5);
        let stub = self.simulate(command);
        progress(1.0);

        self.state
            .files
            .lock()
            .unwrap()
            .insert(command.output().clone(), serde_json::to_vec(&stub)?);
        Ok(())
    }

    async fn read_file(&self, file: &EngineFile) -> MediaResult<Vec<u8>> {
        self.ensure_live()?;
        if self.state.fail_read.load(Ordering::SeqCst) {
            return Err(MediaError::internal("simulated read failure"));
        }
        self.state
            .files
            .lock()
            .unwrap()
            .get(file)
            .cloned()
            .ok_or_else(|| MediaError::FileNotFound(file.to_string().into()))
    }

    async fn delete_namespace(&self, namespace: &Namespace) -> MediaResult<()> {
        self.state
            .files
            .lock()
            .unwrap()
            .retain(|file, _| file.namespace() != namespace.id());
        self.state.live.lock().unwrap().remove(namespace.id());
        Ok(())
    }

    async fn terminate(&self) -> MediaResult<()> {
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out `SimEngine`s over one shared state, counting loads.
pub struct SimLoader {
    pub state: Arc<SimState>,
    pub loads: AtomicUsize,
    pub delay: Duration,
    pub fail: bool,
}

#[async_trait]
impl EngineLoader for SimLoader {
    type Engine = SimEngine;

    async fn load(&self) -> MediaResult<SimEngine> {
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(MediaError::engine_unavailable("simulated cold start failure"));
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(SimEngine {
            state: Arc::clone(&self.state),
            terminated: AtomicBool::new(false),
        })
    }
}

/// Serves fixed bytes per reference; unknown references fail.
#[derive(Default)]
pub struct StaticFetcher {
    assets: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn with(mut self, reference: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.assets.insert(reference.to_string(), bytes.into());
        self
    }
}

#[async_trait]
impl AssetFetcher for StaticFetcher {
    async fn fetch(&self, reference: &AssetRef) -> MediaResult<Vec<u8>> {
        self.assets
            .get(reference.as_str())
            .cloned()
            .ok_or_else(|| MediaError::fetch_failed(reference, "HTTP 404"))
    }
}

pub type SimComposer = Composer<SimLoader, StaticFetcher>;

/// Composer over a fresh simulated engine serving images `img0..img9`.
pub fn sim_composer(fetcher: StaticFetcher) -> (SimComposer, Arc<SimState>) {
    sim_composer_with(fetcher, Duration::ZERO, false)
}

pub fn sim_composer_with(
    fetcher: StaticFetcher,
    delay: Duration,
    fail: bool,
) -> (SimComposer, Arc<SimState>) {
    let state = Arc::new(SimState::default());
    let loader = SimLoader {
        state: Arc::clone(&state),
        loads: AtomicUsize::new(0),
        delay,
        fail,
    };
    (Composer::new(loader, fetcher), state)
}

pub fn image_fetcher() -> StaticFetcher {
    (0..10).fold(StaticFetcher::default(), |fetcher, i| {
        let bytes = if i % 2 == 0 { JPEG } else { PNG };
        fetcher.with(&format!("img{}", i), bytes)
    })
}

pub fn image_refs(count: usize) -> Vec<AssetRef> {
    (0..count).map(|i| AssetRef::new(format!("img{}", i))).collect()
}

/// Progress sink recording every value.
pub fn recording_sink() -> (ProgressSink, Arc<Mutex<Vec<u8>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let sink: ProgressSink = Arc::new(move |p| sink_seen.lock().unwrap().push(p));
    (sink, seen)
}
