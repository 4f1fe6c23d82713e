//! Progress parsing and reporting.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Caller-supplied progress sink receiving whole percentages (0-100).
pub type ProgressSink = Arc<dyn Fn(u8) + Send + Sync>;

/// A sink that ignores every update.
pub fn noop_sink() -> ProgressSink {
    Arc::new(|_| {})
}

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Fraction of `total_duration_ms` encoded so far, in `0.0..=1.0`.
    pub fn fraction(&self, total_duration_ms: i64) -> f64 {
        if self.is_complete {
            return 1.0;
        }
        if total_duration_ms <= 0 {
            return 0.0;
        }
        (self.out_time_ms as f64 / total_duration_ms as f64).clamp(0.0, 1.0)
    }
}

/// Parse a progress line from FFmpeg's `-progress` output.
///
/// Returns a snapshot at the end of each progress block.
pub fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let line = line.trim();

    if let Some((key, value)) = line.split_once('=') {
        match key {
            // Despite the name, out_time_ms is in microseconds
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<i64>() {
                    current.out_time_ms = us / 1000;
                }
            }
            "frame" => {
                if let Ok(frame) = value.parse() {
                    current.frame = frame;
                }
            }
            "fps" => {
                if let Ok(fps) = value.parse() {
                    current.fps = fps;
                }
            }
            "speed" => {
                // Format: "1.5x" or "N/A"
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    current.speed = speed;
                }
            }
            "progress" => {
                // "continue" or "end"
                if value == "end" {
                    current.is_complete = true;
                }
                return Some(current.clone());
            }
            _ => {}
        }
    }

    None
}

/// Whether a stderr line belongs to the `-progress` key/value stream.
pub fn is_progress_line(line: &str) -> bool {
    matches!(
        line.split_once('='),
        Some((key, _)) if !key.is_empty() && key.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    )
}

/// Share of the overall run owned by each stage, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressBand {
    pub start: u8,
    pub end: u8,
}

impl ProgressBand {
    pub const COMPOSE: ProgressBand = ProgressBand { start: 0, end: 90 };
    pub const OVERLAY: ProgressBand = ProgressBand { start: 90, end: 95 };
    pub const MIX: ProgressBand = ProgressBand { start: 95, end: 99 };

    fn scale(&self, fraction: f64) -> u8 {
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        let span = f64::from(self.end - self.start);
        self.start + (fraction * span).round() as u8
    }
}

/// Monotonic progress reporter for one run.
///
/// Values are clamped to `0..=99` until [`ProgressTracker::complete`] emits
/// the single `100`. Duplicate and decreasing values are dropped.
pub struct ProgressTracker {
    sink: ProgressSink,
    last: AtomicU8,
    started: AtomicBool,
}

impl ProgressTracker {
    pub fn new(sink: ProgressSink) -> Self {
        Self {
            sink,
            last: AtomicU8::new(0),
            started: AtomicBool::new(false),
        }
    }

    /// Report an overall percentage.
    pub fn report(&self, percent: u8) {
        let percent = percent.min(99);
        self.emit(percent);
    }

    /// Report a stage-relative fraction inside `band`.
    pub fn report_in(&self, band: ProgressBand, fraction: f64) {
        self.report(band.scale(fraction));
    }

    /// Callback for [`crate::engine::CodecEngine::exec`] scoped to `band`.
    pub fn band(&self, band: ProgressBand) -> impl Fn(f64) + Send + Sync + '_ {
        move |fraction| self.report_in(band, fraction)
    }

    /// Emit the final 100. Only called after the artifact has been read.
    pub fn complete(&self) {
        self.emit(100);
    }

    /// Last value delivered to the sink.
    pub fn current(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }

    fn emit(&self, percent: u8) {
        let first = !self.started.swap(true, Ordering::SeqCst);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        if percent > previous || (first && percent == previous) {
            (self.sink)(percent);
        }
    }
}
