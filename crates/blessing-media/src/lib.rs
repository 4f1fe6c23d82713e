#![deny(unreachable_patterns)]
//! Blessing video composition pipeline.
//!
//! This crate provides:
//! - A codec engine abstraction with an FFmpeg-backed implementation
//! - An explicitly owned engine handle with a one-time cold start
//! - Asset fetching and staging into run-scoped namespaces
//! - Composition, text overlay, audio mix and finalization stages
//! - Monotonic progress reporting from `-progress pipe:2`

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod lifecycle;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod stages;

pub use command::{CommandInput, FfmpegCommand};
pub use config::MediaConfig;
pub use engine::{
    CodecEngine, EngineFile, EngineHandle, EngineLoader, FfmpegEngine, FfmpegLoader, Namespace,
    ProgressFn,
};
pub use error::{MediaError, MediaResult};
pub use fetch::{AssetFetcher, DefaultFetcher};
pub use lifecycle::{compose_blessing_video, initialize_engine, teardown_engine};
pub use logging::RunLogger;
pub use pipeline::{ComposedVideo, Composer};
pub use probe::{probe_output, OutputReport};
pub use progress::{noop_sink, ProgressSink, ProgressTracker};
pub use stages::audio::AudioOrigin;
pub use stages::finalize::CutKind;
pub use stages::{escape_drawtext_text, OverlayOutcome, PipelineStage};
