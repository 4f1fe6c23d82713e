//! FFmpeg-backed codec engine.
//!
//! The engine's storage is a private temporary directory; each namespace is
//! a sub-directory. Commands run as `ffmpeg` child processes with
//! `-progress pipe:2` so progress and diagnostics arrive on stderr.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::FfmpegCommand;
use crate::config::MediaConfig;
use crate::engine::{CodecEngine, EngineFile, EngineLoader, Namespace, ProgressFn};
use crate::error::{MediaError, MediaResult};
use crate::metrics;
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};

/// Diagnostic stderr lines kept for error reports.
const MAX_DIAGNOSTIC_LINES: usize = 20;

/// Loads an [`FfmpegEngine`] from configuration.
#[derive(Debug, Clone)]
pub struct FfmpegLoader {
    config: MediaConfig,
}

impl FfmpegLoader {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineLoader for FfmpegLoader {
    type Engine = FfmpegEngine;

    async fn load(&self) -> MediaResult<FfmpegEngine> {
        FfmpegEngine::start(&self.config).await
    }
}

/// Codec engine executing commands with a local FFmpeg binary.
pub struct FfmpegEngine {
    binary: PathBuf,
    version: String,
    root: PathBuf,
    storage: Mutex<Option<TempDir>>,
    timeout: Duration,
    terminated: AtomicBool,
}

impl std::fmt::Debug for FfmpegEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegEngine")
            .field("binary", &self.binary)
            .field("version", &self.version)
            .field("root", &self.root)
            .field("terminated", &self.terminated.load(Ordering::SeqCst))
            .finish()
    }
}

impl FfmpegEngine {
    /// Locate and verify FFmpeg, then create the engine's private storage.
    pub async fn start(config: &MediaConfig) -> MediaResult<Self> {
        let started = Instant::now();

        let binary = match &config.ffmpeg_path {
            Some(path) => path.clone(),
            None => which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?,
        };

        let output = Command::new(&binary)
            .args(["-hide_banner", "-version"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                MediaError::engine_unavailable(format!(
                    "failed to run {}: {}",
                    binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            return Err(MediaError::engine_unavailable(format!(
                "{} -version exited with {:?}",
                binary.display(),
                output.status.code()
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("ffmpeg (unknown version)")
            .to_string();

        tokio::fs::create_dir_all(&config.work_dir).await?;
        let storage = tempfile::Builder::new()
            .prefix("blessing-engine-")
            .tempdir_in(&config.work_dir)?;
        let root = storage.path().to_path_buf();

        info!(
            binary = %binary.display(),
            version = %version,
            root = %root.display(),
            duration_ms = started.elapsed().as_millis() as u64,
            "FFmpeg engine loaded"
        );

        Ok(Self {
            binary,
            version,
            root,
            storage: Mutex::new(Some(storage)),
            timeout: config.command_timeout,
            terminated: AtomicBool::new(false),
        })
    }

    /// First line of `ffmpeg -version`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Root of the engine's private storage.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path backing an engine file.
    pub fn resolve(&self, file: &EngineFile) -> PathBuf {
        self.root.join(file.namespace()).join(file.name())
    }

    fn namespace_dir(&self, namespace: &Namespace) -> PathBuf {
        self.root.join(namespace.id())
    }

    fn ensure_live(&self) -> MediaResult<()> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(MediaError::engine_unavailable("engine has been terminated"));
        }
        Ok(())
    }
}

/// Reject names that could escape the namespace directory.
fn validate_component(name: &str) -> MediaResult<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
    {
        return Err(MediaError::internal(format!(
            "invalid engine file name: {:?}",
            name
        )));
    }
    Ok(())
}

#[async_trait]
impl CodecEngine for FfmpegEngine {
    async fn create_namespace(&self, id: &str) -> MediaResult<Namespace> {
        self.ensure_live()?;
        validate_component(id)?;

        let namespace = Namespace::new(id);
        tokio::fs::create_dir_all(self.namespace_dir(&namespace)).await?;
        debug!(namespace = id, "Created engine namespace");
        Ok(namespace)
    }

    async fn write_file(
        &self,
        namespace: &Namespace,
        name: &str,
        data: &[u8],
    ) -> MediaResult<EngineFile> {
        self.ensure_live()?;
        validate_component(name)?;

        let file = namespace.file(name);
        let path = self.resolve(&file);
        tokio::fs::write(&path, data).await?;
        debug!(file = %file, bytes = data.len(), "Wrote engine file");
        Ok(file)
    }

    async fn exec(
        &self,
        command: &FfmpegCommand,
        progress: &ProgressFn<'_>,
    ) -> MediaResult<()> {
        self.ensure_live()?;

        let args = command.render_args(|file| self.resolve(file).to_string_lossy().into_owned());
        debug!("Running FFmpeg: ffmpeg {}", args.join(" "));

        let started = Instant::now();
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MediaError::engine_unavailable(format!("failed to spawn FFmpeg: {}", e))
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;
        let expected_ms = command
            .expected_duration_secs()
            .map(|secs| (secs * 1000.0) as i64)
            .unwrap_or(0);

        let run = async {
            let mut reader = BufReader::new(stderr).lines();
            let mut current = FfmpegProgress::default();
            let mut diagnostics: VecDeque<String> = VecDeque::new();

            while let Some(line) = reader.next_line().await? {
                if let Some(snapshot) = parse_progress_line(&line, &mut current) {
                    progress(snapshot.fraction(expected_ms));
                } else if !is_progress_line(&line) && !line.trim().is_empty() {
                    if diagnostics.len() == MAX_DIAGNOSTIC_LINES {
                        diagnostics.pop_front();
                    }
                    diagnostics.push_back(line);
                }
            }

            let status = child.wait().await?;
            Ok::<_, MediaError>((status, diagnostics))
        };

        let outcome = tokio::time::timeout(self.timeout, run).await;
        let (status, diagnostics) = match outcome {
            Ok(result) => result?,
            Err(_) => {
                let secs = self.timeout.as_secs();
                warn!("FFmpeg timed out after {} seconds, killing process", secs);
                let _ = child.kill().await;
                return Err(MediaError::Timeout(secs));
            }
        };

        metrics::record_ffmpeg_duration(started.elapsed().as_secs_f64());

        if status.success() {
            Ok(())
        } else {
            let stderr = Vec::from(diagnostics).join("\n");
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                (!stderr.is_empty()).then_some(stderr),
                status.code(),
            ))
        }
    }

    async fn read_file(&self, file: &EngineFile) -> MediaResult<Vec<u8>> {
        self.ensure_live()?;

        let path = self.resolve(file);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MediaError::FileNotFound(path))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_namespace(&self, namespace: &Namespace) -> MediaResult<()> {
        // Deletion after terminate is a no-op: terminate removed everything.
        if self.terminated.load(Ordering::SeqCst) {
            return Ok(());
        }

        match tokio::fs::remove_dir_all(self.namespace_dir(namespace)).await {
            Ok(()) => {
                debug!(namespace = namespace.id(), "Deleted engine namespace");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn terminate(&self) -> MediaResult<()> {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let storage = self
            .storage
            .lock()
            .map_err(|_| MediaError::internal("engine storage lock poisoned"))?
            .take();

        if let Some(storage) = storage {
            tokio::task::spawn_blocking(move || storage.close())
                .await
                .map_err(|e| MediaError::internal(format!("storage cleanup panicked: {}", e)))??;
        }

        info!(root = %self.root.display(), "FFmpeg engine terminated");
        Ok(())
    }
}
