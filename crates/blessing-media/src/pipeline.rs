//! Composition orchestrator.
//!
//! [`Composer::compose`] drives one run through
//! staging → compose → overlay → mix → finalize against an engine taken
//! from its [`EngineHandle`]. Runs are serialised on the handle's run lock.
//! The run namespace is deleted on every exit path, and progress reaches
//! 100 only once the artifact has been read back.

use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, warn, Instrument};

use blessing_models::{
    AudioPolicy, CompositionError, CompositionRequest, EncodingPolicy, OverlayStyle, RunId,
    VideoArtifact,
};

use crate::config::MediaConfig;
use crate::engine::{CodecEngine, EngineHandle, EngineLoader, FfmpegLoader, Namespace};
use crate::error::{MediaError, MediaResult};
use crate::fetch::{AssetFetcher, DefaultFetcher};
use crate::logging::RunLogger;
use crate::metrics;
use crate::progress::{ProgressBand, ProgressSink, ProgressTracker};
use crate::stages::audio::AudioOrigin;
use crate::stages::finalize::CutKind;
use crate::stages::{
    apply_overlay, compose_visual_track, finalize, mix_audio, stage_assets, FinalCut,
    OverlayOutcome, PipelineStage,
};

/// A successfully composed video and what happened along the way.
#[derive(Debug, Clone)]
pub struct ComposedVideo {
    pub artifact: VideoArtifact,
    pub run_id: RunId,
    /// 5 s per image; a shorter custom soundtrack trims the real length
    pub nominal_duration_secs: f64,
    pub overlay_applied: bool,
    /// Why the overlay was skipped, when it was
    pub overlay_warning: Option<String>,
    pub audio: Option<AudioOrigin>,
    pub final_cut: CutKind,
}

impl ComposedVideo {
    pub fn audio_mixed(&self) -> bool {
        self.audio.is_some()
    }
}

struct RunOutput {
    artifact: VideoArtifact,
    duration_secs: f64,
    overlay: OverlayOutcome,
    audio: Option<AudioOrigin>,
    final_cut: CutKind,
}

/// Owns an engine handle and composes blessing videos with it.
pub struct Composer<L: EngineLoader, F: AssetFetcher = DefaultFetcher> {
    handle: EngineHandle<L>,
    fetcher: F,
    encoding: EncodingPolicy,
    audio: AudioPolicy,
    style: OverlayStyle,
    font_file: Option<PathBuf>,
}

impl Composer<FfmpegLoader, DefaultFetcher> {
    /// FFmpeg-backed composer fetching assets over HTTP and from disk.
    pub fn from_config(config: MediaConfig) -> MediaResult<Self> {
        let fetcher = DefaultFetcher::new(config.fetch_timeout)?;
        let font_file = config.font_file.clone();
        Ok(Self::new(FfmpegLoader::new(config), fetcher).with_font_file(font_file))
    }
}

impl<L: EngineLoader, F: AssetFetcher> Composer<L, F> {
    pub fn new(loader: L, fetcher: F) -> Self {
        Self {
            handle: EngineHandle::new(loader),
            fetcher,
            encoding: EncodingPolicy::default(),
            audio: AudioPolicy::default(),
            style: OverlayStyle::default(),
            font_file: None,
        }
    }

    pub fn with_font_file(mut self, font_file: Option<PathBuf>) -> Self {
        self.font_file = font_file;
        self
    }

    pub fn handle(&self) -> &EngineHandle<L> {
        &self.handle
    }

    /// Pay the engine cold start ahead of the first run.
    ///
    /// Concurrent calls share one load.
    pub async fn initialize_engine(&self) -> Result<(), CompositionError> {
        self.handle
            .acquire()
            .await
            .map(|_| ())
            .map_err(|e| CompositionError::engine_unavailable(e.to_string()))
    }

    /// Terminate the engine. The next run or initialize loads a fresh one.
    pub async fn teardown_engine(&self) -> MediaResult<()> {
        self.handle.release().await
    }

    /// Compose one video from `request`, reporting 0..=100 to `progress`.
    pub async fn compose(
        &self,
        request: &CompositionRequest,
        progress: ProgressSink,
    ) -> Result<ComposedVideo, CompositionError> {
        let run_id = RunId::new();
        let logger = RunLogger::new(&run_id);
        let span = logger.create_span();

        self.compose_run(request, progress, run_id, logger)
            .instrument(span)
            .await
    }

    async fn compose_run(
        &self,
        request: &CompositionRequest,
        progress: ProgressSink,
        run_id: RunId,
        logger: RunLogger,
    ) -> Result<ComposedVideo, CompositionError> {
        let started = Instant::now();

        if let Err(err) = request.validate() {
            logger.log_error(err.kind.as_str(), &err.message);
            metrics::record_run(err.kind.as_str(), started.elapsed().as_secs_f64());
            return Err(err);
        }

        logger.log_start(request.images.len(), request.music.as_str());

        // Run lock before acquire: release() then waits for this run
        let _run = self.handle.lock_run().await;

        let result = match self.handle.acquire().await {
            Ok(engine) => {
                let tracker = ProgressTracker::new(progress);
                tracker.report(0);

                let result = self
                    .run_in_namespace(engine.as_ref(), &run_id, request, &tracker, &logger)
                    .await;
                if result.is_ok() {
                    tracker.complete();
                }
                result
            }
            Err(e) => Err(e),
        };

        let elapsed = started.elapsed();

        match result {
            Ok(output) => {
                metrics::record_run("succeeded", elapsed.as_secs_f64());
                logger.log_completion(output.artifact.len(), elapsed.as_millis() as u64);

                let overlay_applied = output.overlay.is_applied();
                let overlay_warning = output.overlay.reason().map(str::to_string);

                Ok(ComposedVideo {
                    artifact: output.artifact,
                    run_id,
                    nominal_duration_secs: output.duration_secs,
                    overlay_applied,
                    overlay_warning,
                    audio: output.audio,
                    final_cut: output.final_cut,
                })
            }
            Err(e) => {
                let err = e.into_composition_error();
                metrics::record_run(err.kind.as_str(), elapsed.as_secs_f64());
                logger.log_error(err.kind.as_str(), &err.message);
                Err(err)
            }
        }
    }

    /// Run every stage inside a fresh namespace, deleting it afterwards.
    async fn run_in_namespace(
        &self,
        engine: &L::Engine,
        run_id: &RunId,
        request: &CompositionRequest,
        tracker: &ProgressTracker,
        logger: &RunLogger,
    ) -> MediaResult<RunOutput> {
        let namespace = engine
            .create_namespace(run_id.as_str())
            .await
            .map_err(|e| MediaError::engine_unavailable(format!("cannot create namespace: {}", e)))?;

        let result = self
            .run_stages(engine, &namespace, request, tracker, logger)
            .await;

        if let Err(e) = engine.delete_namespace(&namespace).await {
            warn!(
                run_id = %run_id,
                namespace = namespace.id(),
                error = %e,
                "Failed to delete run namespace"
            );
        } else {
            debug!(namespace = namespace.id(), "Run namespace deleted");
        }

        result
    }

    async fn run_stages(
        &self,
        engine: &L::Engine,
        namespace: &Namespace,
        request: &CompositionRequest,
        tracker: &ProgressTracker,
        logger: &RunLogger,
    ) -> MediaResult<RunOutput> {
        logger.log_stage(PipelineStage::Staging);
        let staged = stage_assets(engine, namespace, &self.fetcher, request)
            .await
            .map_err(|e| e.in_stage(PipelineStage::Staging))?;

        logger.log_stage(PipelineStage::Compose);
        let track = compose_visual_track(
            engine,
            namespace,
            &staged.images,
            &self.encoding,
            &tracker.band(ProgressBand::COMPOSE),
        )
        .await
        .map_err(|e| e.in_stage(PipelineStage::Compose))?;
        let duration_secs = track.duration_secs;

        logger.log_stage(PipelineStage::Overlay);
        let overlay = apply_overlay(
            engine,
            namespace,
            track,
            &request.blessing_text,
            &self.style,
            self.font_file.as_deref(),
            &self.encoding,
            &tracker.band(ProgressBand::OVERLAY),
        )
        .await;
        if let Some(reason) = overlay.reason() {
            logger.log_warning(PipelineStage::Overlay, reason);
        }
        tracker.report_in(ProgressBand::OVERLAY, 1.0);

        let mixed = if request.music.is_active() {
            logger.log_stage(PipelineStage::Mix);
            let mixed = mix_audio(
                engine,
                namespace,
                overlay.track(),
                &request.music,
                staged.audio.as_ref(),
                &self.audio,
                &tracker.band(ProgressBand::MIX),
            )
            .await
            .map_err(|e| e.in_stage(PipelineStage::Mix))?;
            tracker.report_in(ProgressBand::MIX, 1.0);
            mixed
        } else {
            None
        };

        logger.log_stage(PipelineStage::Finalize);
        let cut = FinalCut::select(overlay.track(), mixed.as_ref());
        let artifact = finalize(engine, &cut)
            .await
            .map_err(|e| e.in_stage(PipelineStage::Finalize))?;

        Ok(RunOutput {
            artifact,
            duration_secs,
            overlay,
            audio: mixed.map(|m| m.origin),
            final_cut: cut.kind,
        })
    }
}
