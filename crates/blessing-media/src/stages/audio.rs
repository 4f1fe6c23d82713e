//! Audio mix: attach a soundtrack to the carry-forward visual track.
//!
//! The `"default"` selection synthesises a sine tone as long as the visual
//! track; a custom selection uses the staged bytes. The mux copies video,
//! re-encodes audio and trims to the shorter stream. Failure here is fatal.

use tracing::info;

use blessing_models::{AudioPolicy, MusicSelection};

use crate::command::{CommandInput, FfmpegCommand};
use crate::engine::{CodecEngine, EngineFile, Namespace, ProgressFn};
use crate::error::{MediaError, MediaResult};
use crate::stages::{StagedAudio, VisualTrack};

/// Synthesised tone output.
pub const TONE_FILE: &str = "tone.wav";
/// Output name of the mix stage.
pub const MIXED_FILE: &str = "mixed.mp4";

/// Where the soundtrack came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOrigin {
    Tone,
    Custom,
}

/// A visual track with audio muxed in.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedVideo {
    pub file: EngineFile,
    pub origin: AudioOrigin,
    /// Upper bound; a shorter custom soundtrack trims the result further
    pub max_duration_secs: f64,
}

/// Build the tone synthesis command.
pub fn build_tone_command(namespace: &Namespace, duration_secs: f64, policy: &AudioPolicy) -> FfmpegCommand {
    FfmpegCommand::new(namespace.file(TONE_FILE))
        .input(CommandInput::lavfi(policy.tone_source(duration_secs)))
        .audio_codec("pcm_s16le")
        .expected_duration(duration_secs)
}

/// Build the mux command: video stream copied, audio re-encoded, trimmed to
/// the shorter input.
pub fn build_mux_command(
    namespace: &Namespace,
    track: &VisualTrack,
    audio: &EngineFile,
    policy: &AudioPolicy,
) -> FfmpegCommand {
    FfmpegCommand::new(namespace.file(MIXED_FILE))
        .input(CommandInput::file(track.file.clone()))
        .input(CommandInput::file(audio.clone()))
        .map("0:v:0")
        .map("1:a:0")
        .video_codec("copy")
        .audio_codec(policy.codec.clone())
        .audio_bitrate(policy.bitrate.clone())
        .shortest()
        .faststart()
        .expected_duration(track.duration_secs)
}

/// Mix audio into `track` according to `music`.
///
/// Returns `Ok(None)` when no music was selected.
pub async fn mix_audio<E>(
    engine: &E,
    namespace: &Namespace,
    track: &VisualTrack,
    music: &MusicSelection,
    staged: Option<&StagedAudio>,
    policy: &AudioPolicy,
    progress: &ProgressFn<'_>,
) -> MediaResult<Option<MixedVideo>>
where
    E: CodecEngine + ?Sized,
{
    let (audio, origin) = match music {
        MusicSelection::None => return Ok(None),
        MusicSelection::Default => {
            let tone = build_tone_command(namespace, track.duration_secs, policy);
            info!(
                namespace = namespace.id(),
                frequency = policy.tone_frequency,
                duration_secs = track.duration_secs,
                "Synthesising default tone"
            );
            engine.exec(&tone, &|f: f64| progress(f * 0.5)).await?;
            (tone.output().clone(), AudioOrigin::Tone)
        }
        MusicSelection::Custom(reference) => {
            let staged = staged.ok_or_else(|| {
                MediaError::internal(format!("custom audio {} was not staged", reference))
            })?;
            (staged.file.clone(), AudioOrigin::Custom)
        }
    };

    let mux = build_mux_command(namespace, track, &audio, policy);
    info!(namespace = namespace.id(), audio = %audio, "Muxing audio");

    match origin {
        AudioOrigin::Tone => engine.exec(&mux, &|f: f64| progress(0.5 + f * 0.5)).await?,
        AudioOrigin::Custom => engine.exec(&mux, progress).await?,
    }

    Ok(Some(MixedVideo {
        file: mux.output().clone(),
        origin,
        max_duration_secs: track.duration_secs,
    }))
}
