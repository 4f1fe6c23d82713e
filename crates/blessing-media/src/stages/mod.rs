//! Pipeline stages.
//!
//! Each stage is a free function over a [`crate::engine::CodecEngine`] that
//! takes the previous stage's typed artifact and returns its own. Stages run
//! strictly in this order: staging, compose, overlay, mix, finalize.

use serde::{Deserialize, Serialize};
use std::fmt;

use blessing_models::FailureKind;

pub mod audio;
pub mod compose;
pub mod finalize;
pub mod overlay;
pub mod staging;

pub use audio::{mix_audio, MixedVideo};
pub use compose::{compose_visual_track, VisualTrack};
pub use finalize::{finalize, FinalCut};
pub use overlay::{apply_overlay, escape_drawtext_text, OverlayOutcome};
pub use staging::{stage_assets, StagedAssets, StagedAudio, StagedImage};

/// A step of the composition pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Staging,
    Compose,
    Overlay,
    Mix,
    Finalize,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Staging => "staging",
            PipelineStage::Compose => "compose",
            PipelineStage::Overlay => "overlay",
            PipelineStage::Mix => "mix",
            PipelineStage::Finalize => "finalize",
        }
    }

    /// Failure category when this stage fails.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            PipelineStage::Staging => FailureKind::AssetFetch,
            PipelineStage::Compose => FailureKind::Composition,
            PipelineStage::Overlay => FailureKind::Overlay,
            PipelineStage::Mix => FailureKind::Mix,
            PipelineStage::Finalize => FailureKind::Finalization,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
