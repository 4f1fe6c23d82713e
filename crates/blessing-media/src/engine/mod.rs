//! Codec engine abstraction.
//!
//! The pipeline never talks to FFmpeg directly. It drives a [`CodecEngine`]
//! that owns a scoped file store and executes [`FfmpegCommand`]s against it.
//! [`FfmpegEngine`] is the production implementation; tests substitute an
//! in-memory double.

use async_trait::async_trait;
use std::fmt;

use crate::command::FfmpegCommand;
use crate::error::MediaResult;

pub mod ffmpeg;
pub mod handle;

#[cfg(test)]
pub(crate) mod recording;

pub use ffmpeg::{FfmpegEngine, FfmpegLoader};
pub use handle::EngineHandle;

/// Fractional progress callback (`0.0..=1.0`).
pub type ProgressFn<'a> = dyn Fn(f64) + Send + Sync + 'a;

/// A run-scoped directory inside the engine's storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    id: String,
}

impl Namespace {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Handle for a file named `name` inside this namespace.
    ///
    /// The file does not need to exist yet; commands use this to name
    /// their outputs.
    pub fn file(&self, name: impl Into<String>) -> EngineFile {
        EngineFile {
            namespace: self.id.clone(),
            name: name.into(),
        }
    }
}

/// Opaque handle to a file inside an engine namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EngineFile {
    namespace: String,
    name: String,
}

impl EngineFile {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for EngineFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A loaded, stateful audio/video processing engine.
///
/// Engines are not reentrant: callers must not run two compositions against
/// the same engine at once. [`EngineHandle`] enforces this.
#[async_trait]
pub trait CodecEngine: Send + Sync + 'static {
    /// Create an empty namespace for one run.
    async fn create_namespace(&self, id: &str) -> MediaResult<Namespace>;

    /// Write bytes into a namespace.
    async fn write_file(&self, namespace: &Namespace, name: &str, data: &[u8])
        -> MediaResult<EngineFile>;

    /// Execute a command, reporting fractional progress.
    async fn exec(&self, command: &FfmpegCommand, progress: &ProgressFn<'_>) -> MediaResult<()>;

    /// Read a file back out of the engine.
    async fn read_file(&self, file: &EngineFile) -> MediaResult<Vec<u8>>;

    /// Delete a namespace and everything in it.
    async fn delete_namespace(&self, namespace: &Namespace) -> MediaResult<()>;

    /// Release every resource the engine holds. Further calls fail.
    async fn terminate(&self) -> MediaResult<()>;
}

/// Performs the one-time (cold start) load of an engine.
#[async_trait]
pub trait EngineLoader: Send + Sync + 'static {
    type Engine: CodecEngine;

    async fn load(&self) -> MediaResult<Self::Engine>;
}
