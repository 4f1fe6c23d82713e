//! Structured run logging.
//!
//! Every event of one composition run carries the same `run_id` field so a
//! run can be followed through the log regardless of interleaving.

use tracing::{error, info, warn, Span};

use blessing_models::RunId;

use crate::stages::PipelineStage;

/// Logger bound to one composition run.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
}

impl RunLogger {
    pub fn new(run_id: &RunId) -> Self {
        Self {
            run_id: run_id.to_string(),
        }
    }

    /// Log the start of a run.
    pub fn log_start(&self, images: usize, music: &str) {
        info!(
            run_id = %self.run_id,
            images,
            music,
            "Composition started"
        );
    }

    /// Log entry into a pipeline stage.
    pub fn log_stage(&self, stage: PipelineStage) {
        info!(run_id = %self.run_id, stage = %stage, "Stage started");
    }

    /// Log a recoverable problem.
    pub fn log_warning(&self, stage: PipelineStage, message: &str) {
        warn!(
            run_id = %self.run_id,
            stage = %stage,
            "Run warning: {}", message
        );
    }

    /// Log a fatal failure.
    pub fn log_error(&self, kind: &str, message: &str) {
        error!(
            run_id = %self.run_id,
            kind,
            "Composition failed: {}", message
        );
    }

    /// Log a successful run.
    pub fn log_completion(&self, bytes: usize, duration_ms: u64) {
        info!(
            run_id = %self.run_id,
            bytes,
            duration_ms,
            "Composition completed"
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Span enclosing the whole run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("composition", run_id = %self.run_id)
    }
}
