//! Building a composition request from flags or a JSON file.

use anyhow::{Context as _, Result};
use std::path::Path;

use blessing_models::{AssetRef, CompositionRequest, MusicSelection};

/// Load a request from a JSON file.
pub fn load_request(path: &Path) -> Result<CompositionRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid request JSON in {}", path.display()))
}

/// Assemble a request from individual flags.
///
/// `music` follows the JSON rules: empty means none, `default` means the
/// synthesised tone, anything else is a reference.
pub fn request_from_flags(
    images: &[String],
    text: &str,
    recipient: Option<&str>,
    music: Option<&str>,
) -> CompositionRequest {
    let images = images.iter().map(AssetRef::new).collect();
    let mut request = CompositionRequest::new(images, text);

    if let Some(recipient) = recipient {
        request = request.with_recipient(recipient);
    }
    if let Some(music) = music {
        request = request.with_music(MusicSelection::from(Some(music.to_string())));
    }

    request
}
