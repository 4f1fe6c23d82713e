//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use blessing_models::{CompositionError, FailureKind};

use crate::stages::PipelineStage;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during composition.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Failed to fetch {reference}: {message}")]
    FetchFailed { reference: String, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("File not found in engine storage: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: Box<MediaError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an engine-unavailable error.
    pub fn engine_unavailable(message: impl Into<String>) -> Self {
        Self::EngineUnavailable(message.into())
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a fetch failure error.
    pub fn fetch_failed(reference: impl ToString, message: impl Into<String>) -> Self {
        Self::FetchFailed {
            reference: reference.to_string(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Attribute this error to a pipeline stage.
    ///
    /// Errors already attributed to a stage keep their original stage.
    pub fn in_stage(self, stage: PipelineStage) -> Self {
        match self {
            err @ MediaError::Stage { .. } => err,
            err => MediaError::Stage {
                stage,
                source: Box::new(err),
            },
        }
    }

    /// Stage this error was attributed to, if any.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            MediaError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Map to the caller-facing failure category.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            MediaError::InvalidRequest(_) => FailureKind::InvalidRequest,
            MediaError::FfmpegNotFound | MediaError::EngineUnavailable(_) => {
                FailureKind::EngineUnavailable
            }
            MediaError::FetchFailed { .. } => FailureKind::AssetFetch,
            MediaError::Stage { stage, source } => match source.as_ref() {
                // A torn-down engine is reported as such regardless of stage
                MediaError::EngineUnavailable(_) | MediaError::FfmpegNotFound => {
                    FailureKind::EngineUnavailable
                }
                _ => stage.failure_kind(),
            },
            _ => FailureKind::Composition,
        }
    }

    /// Convert into the structured failure result returned to callers.
    pub fn into_composition_error(self) -> CompositionError {
        CompositionError::new(self.failure_kind(), self.to_string())
    }
}

impl From<MediaError> for CompositionError {
    fn from(err: MediaError) -> Self {
        err.into_composition_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_attribution_maps_kind() {
        let err = MediaError::ffmpeg_failed("boom", None, Some(1)).in_stage(PipelineStage::Mix);
        assert_eq!(err.failure_kind(), FailureKind::Mix);
        assert_eq!(err.stage(), Some(PipelineStage::Mix));
    }

    #[test]
    fn test_stage_attribution_is_not_overwritten() {
        let err = MediaError::fetch_failed("a.jpg", "404")
            .in_stage(PipelineStage::Staging)
            .in_stage(PipelineStage::Finalize);
        assert_eq!(err.stage(), Some(PipelineStage::Staging));
        assert_eq!(err.failure_kind(), FailureKind::AssetFetch);
    }

    #[test]
    fn test_engine_loss_mid_stage_reports_engine_unavailable() {
        let err = MediaError::engine_unavailable("terminated").in_stage(PipelineStage::Compose);
        assert_eq!(err.failure_kind(), FailureKind::EngineUnavailable);
    }

    #[test]
    fn test_into_composition_error_keeps_message() {
        let err: CompositionError =
            MediaError::InvalidRequest("no images".to_string()).into();
        assert_eq!(err.kind, FailureKind::InvalidRequest);
        assert!(err.message.contains("no images"));
    }
}
