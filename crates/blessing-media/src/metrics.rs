//! Composition metrics.
//!
//! Recorded through the `metrics` facade; the embedding application decides
//! whether to install a recorder.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const RUNS_TOTAL: &str = "blessing_runs_total";
    pub const RUN_DURATION_SECONDS: &str = "blessing_run_duration_seconds";
    pub const OVERLAY_FALLBACKS_TOTAL: &str = "blessing_overlay_fallbacks_total";
    pub const ENGINE_LOADS_TOTAL: &str = "blessing_engine_loads_total";
    pub const FFMPEG_DURATION_SECONDS: &str = "blessing_ffmpeg_duration_seconds";
}

/// Record a finished run. `outcome` is `succeeded` or a failure kind code.
pub fn record_run(outcome: &str, duration_secs: f64) {
    let labels = [("outcome", outcome.to_string())];

    counter!(names::RUNS_TOTAL, &labels).increment(1);
    histogram!(names::RUN_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an overlay stage that fell back to the plain track.
pub fn record_overlay_fallback() {
    counter!(names::OVERLAY_FALLBACKS_TOTAL).increment(1);
}

/// Record an engine cold start.
pub fn record_engine_load(success: bool) {
    let labels = [("success", success.to_string())];
    counter!(names::ENGINE_LOADS_TOTAL, &labels).increment(1);
}

/// Record wall time of one FFmpeg process.
pub fn record_ffmpeg_duration(duration_secs: f64) {
    histogram!(names::FFMPEG_DURATION_SECONDS).record(duration_secs);
}
