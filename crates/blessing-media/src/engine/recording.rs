//! In-memory engine for unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::command::FfmpegCommand;
use crate::engine::{CodecEngine, EngineFile, Namespace, ProgressFn};
use crate::error::{MediaError, MediaResult};

/// Stores files in a map and records every command.
///
/// `exec` writes the output file's name as its content, or fails when the
/// rendered command contains `fail_on`.
#[derive(Default)]
pub struct RecordingEngine {
    pub files: Mutex<HashMap<EngineFile, Vec<u8>>>,
    pub namespaces: Mutex<Vec<Namespace>>,
    pub commands: Mutex<Vec<Vec<String>>>,
    pub fail_on: Mutex<Option<String>>,
    pub terminated: AtomicBool,
}

impl RecordingEngine {
    pub fn failing_on(pattern: &str) -> Self {
        let engine = Self::default();
        *engine.fail_on.lock().unwrap() = Some(pattern.to_string());
        engine
    }

    pub fn last_command(&self) -> Vec<String> {
        self.commands.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CodecEngine for RecordingEngine {
    async fn create_namespace(&self, id: &str) -> MediaResult<Namespace> {
        let ns = Namespace::new(id);
        self.namespaces.lock().unwrap().push(ns.clone());
        Ok(ns)
    }

    async fn write_file(&self, ns: &Namespace, name: &str, data: &[u8]) -> MediaResult<EngineFile> {
        let file = ns.file(name);
        self.files.lock().unwrap().insert(file.clone(), data.to_vec());
        Ok(file)
    }

    async fn exec(&self, command: &FfmpegCommand, progress: &ProgressFn<'_>) -> MediaResult<()> {
        let args = command.render_args(|f| f.to_string());
        self.commands.lock().unwrap().push(args.clone());

        if let Some(pattern) = self.fail_on.lock().unwrap().as_deref() {
            if args.iter().any(|a| a.contains(pattern)) {
                return Err(MediaError::ffmpeg_failed("injected failure", None, Some(1)));
            }
        }

        progress(1.0);
        let output = command.output().clone();
        let content = output.name().as_bytes().to_vec();
        self.files.lock().unwrap().insert(output, content);
        Ok(())
    }

    async fn read_file(&self, file: &EngineFile) -> MediaResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(file)
            .cloned()
            .ok_or_else(|| MediaError::FileNotFound(file.to_string().into()))
    }

    async fn delete_namespace(&self, ns: &Namespace) -> MediaResult<()> {
        self.files
            .lock()
            .unwrap()
            .retain(|file, _| file.namespace() != ns.id());
        self.namespaces.lock().unwrap().retain(|n| n != ns);
        Ok(())
    }

    async fn terminate(&self) -> MediaResult<()> {
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }
}
