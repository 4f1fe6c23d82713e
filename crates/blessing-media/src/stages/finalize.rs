//! Finalizer: read the carry-forward file out of the engine.

use tracing::info;

use blessing_models::VideoArtifact;

use crate::engine::{CodecEngine, EngineFile};
use crate::error::{MediaError, MediaResult};
use crate::stages::{MixedVideo, VisualTrack};

/// Which stage produced the final file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutKind {
    Composed,
    Overlaid,
    Mixed,
}

/// The file a run delivers.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalCut {
    pub file: EngineFile,
    pub kind: CutKind,
}

impl FinalCut {
    /// Prefer the muxed output, then the visual track as it came out of the
    /// overlay stage.
    pub fn select(track: &VisualTrack, mixed: Option<&MixedVideo>) -> Self {
        match mixed {
            Some(mixed) => Self {
                file: mixed.file.clone(),
                kind: CutKind::Mixed,
            },
            None if track.has_overlay => Self {
                file: track.file.clone(),
                kind: CutKind::Overlaid,
            },
            None => Self {
                file: track.file.clone(),
                kind: CutKind::Composed,
            },
        }
    }
}

/// Read `cut` back as an MP4 artifact.
pub async fn finalize<E>(engine: &E, cut: &FinalCut) -> MediaResult<VideoArtifact>
where
    E: CodecEngine + ?Sized,
{
    let bytes = engine.read_file(&cut.file).await?;

    if bytes.is_empty() {
        return Err(MediaError::internal(format!("{} is empty", cut.file)));
    }

    info!(file = %cut.file, kind = ?cut.kind, bytes = bytes.len(), "Final video read");
    Ok(VideoArtifact::mp4(bytes))
}
