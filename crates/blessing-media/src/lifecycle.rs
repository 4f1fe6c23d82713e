//! Process-wide default composer.
//!
//! Thin free functions over one lazily built FFmpeg-backed [`Composer`],
//! configured from the environment on first use. Callers that need more
//! than one engine construct their own `Composer` instead.

use tokio::sync::OnceCell;

use blessing_models::{CompositionError, CompositionRequest};

use crate::config::MediaConfig;
use crate::engine::FfmpegLoader;
use crate::error::MediaResult;
use crate::pipeline::{ComposedVideo, Composer};
use crate::progress::ProgressSink;

static DEFAULT_COMPOSER: OnceCell<Composer<FfmpegLoader>> = OnceCell::const_new();

async fn default_composer() -> Result<&'static Composer<FfmpegLoader>, CompositionError> {
    DEFAULT_COMPOSER
        .get_or_try_init(|| async { Composer::from_config(MediaConfig::from_env()) })
        .await
        .map_err(|e| CompositionError::engine_unavailable(e.to_string()))
}

/// Load the default engine ahead of the first composition.
pub async fn initialize_engine() -> Result<(), CompositionError> {
    default_composer().await?.initialize_engine().await
}

/// Compose a blessing video on the default engine.
pub async fn compose_blessing_video(
    request: &CompositionRequest,
    progress: ProgressSink,
) -> Result<ComposedVideo, CompositionError> {
    default_composer().await?.compose(request, progress).await
}

/// Terminate the default engine, if it was ever built.
pub async fn teardown_engine() -> MediaResult<()> {
    match DEFAULT_COMPOSER.get() {
        Some(composer) => composer.teardown_engine().await,
        None => Ok(()),
    }
}
