//! Structured composition failures.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Category of a failed composition run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The request itself is unusable (e.g. no images)
    InvalidRequest,
    /// The codec engine could not be loaded or was torn down
    EngineUnavailable,
    /// An image or custom audio could not be fetched
    AssetFetch,
    /// The visual track could not be encoded
    Composition,
    /// Text overlay failed; recoverable, never a run failure
    Overlay,
    /// Audio synthesis or muxing failed
    Mix,
    /// The final file could not be read back
    Finalization,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::EngineUnavailable => "engine_unavailable",
            FailureKind::AssetFetch => "asset_fetch",
            FailureKind::Composition => "composition",
            FailureKind::Overlay => "overlay",
            FailureKind::Mix => "mix",
            FailureKind::Finalization => "finalization",
        }
    }

    /// Stable, user-facing message. Clients localize by `as_str()` code.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureKind::InvalidRequest => "Please add at least one photo before creating a video.",
            FailureKind::EngineUnavailable => {
                "The video engine could not be started. Please try again."
            }
            FailureKind::AssetFetch => {
                "One of your photos or your music could not be loaded. Please check them and retry."
            }
            FailureKind::Composition => "Video generation failed, please try again.",
            FailureKind::Overlay => "The blessing text could not be added to the video.",
            FailureKind::Mix => "The music could not be added to the video. Please try again.",
            FailureKind::Finalization => "The finished video could not be saved. Please try again.",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure result of a composition run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, JsonSchema)]
#[error("{kind}: {message}")]
pub struct CompositionError {
    pub kind: FailureKind,
    /// Diagnostic detail for logs; not shown to end users
    pub message: String,
}

impl CompositionError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidRequest, message)
    }

    pub fn engine_unavailable(message: impl Into<String>) -> Self {
        Self::new(FailureKind::EngineUnavailable, message)
    }

    pub fn user_message(&self) -> &'static str {
        self.kind.user_message()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_are_snake_case() {
        let json = serde_json::to_string(&FailureKind::AssetFetch).unwrap();
        assert_eq!(json, "\"asset_fetch\"");
        assert_eq!(FailureKind::EngineUnavailable.as_str(), "engine_unavailable");
    }

    #[test]
    fn test_error_display_includes_kind() {
        let err = CompositionError::new(FailureKind::Mix, "ffmpeg exited with 1");
        assert_eq!(err.to_string(), "mix: ffmpeg exited with 1");
        assert!(!err.user_message().is_empty());
    }
}
