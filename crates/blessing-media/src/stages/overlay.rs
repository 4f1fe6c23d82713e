//! Overlay: burn the blessing text onto the visual track.
//!
//! This is the one recoverable stage. Any failure yields
//! [`OverlayOutcome::WithoutOverlay`] carrying the untouched input track.
//!
//! Text reaches `drawtext` through two parsers: the filtergraph parser, then
//! the filter option parser. Each level strips one layer of backslash
//! escaping, so the text is escaped for the option level first and the whole
//! filter description is escaped again for the graph level. `expansion=none`
//! keeps drawtext from interpreting the result a third time.

use std::path::Path;
use tracing::{info, warn};

use blessing_models::{EncodingPolicy, OverlayStyle};

use crate::command::{CommandInput, FfmpegCommand};
use crate::engine::{CodecEngine, Namespace, ProgressFn};
use crate::metrics;
use crate::stages::VisualTrack;

/// Output name of the overlay stage.
pub const OVERLAID_FILE: &str = "overlaid.mp4";

/// Result of the overlay stage. Both variants carry a usable track.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayOutcome {
    /// Text was burned in
    WithOverlay(VisualTrack),
    /// The pre-overlay track carried forward
    WithoutOverlay { track: VisualTrack, reason: String },
}

impl OverlayOutcome {
    /// The carry-forward track.
    pub fn track(&self) -> &VisualTrack {
        match self {
            OverlayOutcome::WithOverlay(track) => track,
            OverlayOutcome::WithoutOverlay { track, .. } => track,
        }
    }

    pub fn into_track(self) -> VisualTrack {
        match self {
            OverlayOutcome::WithOverlay(track) => track,
            OverlayOutcome::WithoutOverlay { track, .. } => track,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, OverlayOutcome::WithOverlay(_))
    }

    /// Why the overlay was not applied.
    pub fn reason(&self) -> Option<&str> {
        match self {
            OverlayOutcome::WithOverlay(_) => None,
            OverlayOutcome::WithoutOverlay { reason, .. } => Some(reason),
        }
    }
}

/// Characters FFmpeg's tokenizer strips from both ends of a value.
const TOKEN_WHITESPACE: &[char] = &[' ', '\n', '\t', '\r'];

/// Escape text for a filter option value.
///
/// Backslash, colon and single quote are backslash-escaped. Line breaks are
/// normalised to a single `\n` character, which drawtext renders as a break.
/// Leading and trailing whitespace (line breaks included) is escaped too,
/// otherwise the option parser would trim it.
pub fn escape_drawtext_text(text: &str) -> String {
    let normalised = text.replace("\r\n", "\n").replace('\r', "\n");
    let body_start = normalised.len() - normalised.trim_start_matches(TOKEN_WHITESPACE).len();
    let body_end = normalised.trim_end_matches(TOKEN_WHITESPACE).len();
    let mut out = String::with_capacity(normalised.len() + 8);

    for (i, c) in normalised.char_indices() {
        match c {
            '\\' => out.push_str("\\\\"),
            ':' => out.push_str("\\:"),
            '\'' => out.push_str("\\'"),
            c if i < body_start || i >= body_end => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }

    out
}

/// Escape a filter description for the filtergraph parser.
fn escape_filtergraph(description: &str) -> String {
    let mut out = String::with_capacity(description.len() + 8);
    for c in description.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Build the complete `drawtext` filter for `text`.
pub fn build_drawtext_filter(text: &str, style: &OverlayStyle, font_file: Option<&Path>) -> String {
    let mut options = vec![format!("text={}", escape_drawtext_text(text))];

    if let Some(font) = font_file {
        options.push(format!(
            "fontfile={}",
            escape_drawtext_text(&font.to_string_lossy())
        ));
    }

    options.extend([
        "expansion=none".to_string(),
        format!("fontcolor={}", style.font_color),
        format!("fontsize={}", style.font_size),
        "box=1".to_string(),
        format!("boxcolor={}", style.box_color),
        format!("boxborderw={}", style.box_border),
        "x=(w-text_w)/2".to_string(),
        "y=(h-text_h)/2".to_string(),
    ]);

    format!("drawtext={}", escape_filtergraph(&options.join(":")))
}

/// Build the overlay command reading `track`.
pub fn build_overlay_command(
    namespace: &Namespace,
    track: &VisualTrack,
    text: &str,
    style: &OverlayStyle,
    font_file: Option<&Path>,
    policy: &EncodingPolicy,
) -> FfmpegCommand {
    FfmpegCommand::new(namespace.file(OVERLAID_FILE))
        .input(CommandInput::file(track.file.clone()))
        .video_filter(build_drawtext_filter(text, style, font_file))
        .encoding(policy)
        .no_audio()
        .faststart()
        .expected_duration(track.duration_secs)
}

/// Try to burn `text` onto `track`; never fails the run.
#[allow(clippy::too_many_arguments)]
pub async fn apply_overlay<E>(
    engine: &E,
    namespace: &Namespace,
    track: VisualTrack,
    text: &str,
    style: &OverlayStyle,
    font_file: Option<&Path>,
    policy: &EncodingPolicy,
    progress: &ProgressFn<'_>,
) -> OverlayOutcome
where
    E: CodecEngine + ?Sized,
{
    if text.trim().is_empty() {
        info!(namespace = namespace.id(), "No blessing text, skipping overlay");
        return OverlayOutcome::WithoutOverlay {
            track,
            reason: "blessing text is empty".to_string(),
        };
    }

    let command = build_overlay_command(namespace, &track, text, style, font_file, policy);

    match engine.exec(&command, progress).await {
        Ok(()) => {
            info!(namespace = namespace.id(), "Blessing text overlay applied");
            OverlayOutcome::WithOverlay(VisualTrack {
                file: command.output().clone(),
                duration_secs: track.duration_secs,
                has_overlay: true,
            })
        }
        Err(e) => {
            warn!(
                namespace = namespace.id(),
                error = %e,
                "Overlay failed, continuing without blessing text"
            );
            metrics::record_overlay_fallback();
            OverlayOutcome::WithoutOverlay {
                track,
                reason: e.to_string(),
            }
        }
    }
}
