//! Composer configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for the engine and asset fetching.
///
/// Encoding policy is deliberately absent: it is fixed, see
/// [`blessing_models::encoding`].
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// FFmpeg binary; resolved from `PATH` when unset
    pub ffmpeg_path: Option<PathBuf>,
    /// Parent directory of the engine's private storage
    pub work_dir: PathBuf,
    /// Timeout applied to each FFmpeg command
    pub command_timeout: Duration,
    /// Timeout applied to each asset fetch
    pub fetch_timeout: Duration,
    /// Font used for the blessing text; fontconfig default when unset
    pub font_file: Option<PathBuf>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            work_dir: std::env::temp_dir(),
            command_timeout: Duration::from_secs(600), // 10 minutes
            fetch_timeout: Duration::from_secs(30),
            font_file: None,
        }
    }
}

impl MediaConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ffmpeg_path: std::env::var("BLESSING_FFMPEG_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            work_dir: std::env::var("BLESSING_WORK_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            command_timeout: Duration::from_secs(
                std::env::var("BLESSING_COMMAND_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            fetch_timeout: Duration::from_secs(
                std::env::var("BLESSING_FETCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            font_file: std::env::var("BLESSING_FONT_FILE")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = Some(path.into());
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_file = Some(path.into());
        self
    }
}
