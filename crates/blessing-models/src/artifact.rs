//! Finished video artifacts.

use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// Media type of every artifact produced by the composer.
pub const VIDEO_MEDIA_TYPE: &str = "video/mp4";

/// Encoded video bytes tagged with their media type.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoArtifact {
    bytes: Vec<u8>,
    media_type: &'static str,
}

impl std::fmt::Debug for VideoArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoArtifact")
            .field("len", &self.bytes.len())
            .field("media_type", &self.media_type)
            .finish()
    }
}

impl VideoArtifact {
    /// Wrap MP4 bytes.
    pub fn mp4(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            media_type: VIDEO_MEDIA_TYPE,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn media_type(&self) -> &'static str {
        self.media_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Download file name for a recipient, e.g. `blessing-video-Ana.mp4`.
    pub fn suggested_file_name(recipient: &str) -> String {
        let cleaned: String = recipient
            .trim()
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        let cleaned = cleaned.trim_matches('-');

        if cleaned.is_empty() {
            "blessing-video-video.mp4".to_string()
        } else {
            format!("blessing-video-{}.mp4", cleaned)
        }
    }

    /// Write the artifact into `dir` and return its path and `file://` URL.
    pub fn persist(&self, dir: &Path, file_name: &str) -> io::Result<(PathBuf, Url)> {
        std::fs::create_dir_all(dir)?;
        let path = std::path::absolute(dir.join(file_name))?;
        std::fs::write(&path, &self.bytes)?;

        let url = Url::from_file_path(&path).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot build a file URL for {}", path.display()),
            )
        })?;

        Ok((path, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggested_file_name() {
        assert_eq!(
            VideoArtifact::suggested_file_name("Grandma Li"),
            "blessing-video-Grandma-Li.mp4"
        );
        assert_eq!(
            VideoArtifact::suggested_file_name("../etc/passwd"),
            "blessing-video-etc-passwd.mp4"
        );
        assert_eq!(VideoArtifact::suggested_file_name("  "), "blessing-video-video.mp4");
    }

    #[test]
    fn test_persist_returns_file_url() {
        let dir = tempfile::TempDir::new().unwrap();
        let artifact = VideoArtifact::mp4(vec![0, 0, 0, 24]);

        let (path, url) = artifact.persist(dir.path(), "out.mp4").unwrap();

        assert_eq!(url.scheme(), "file");
        assert_eq!(std::fs::read(&path).unwrap(), vec![0, 0, 0, 24]);
        assert_eq!(artifact.media_type(), "video/mp4");
    }
}
