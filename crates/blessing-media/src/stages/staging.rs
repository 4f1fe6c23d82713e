//! Asset staging: fetch every input and write it into the run namespace.

use std::path::Path;
use tracing::{debug, info};

use blessing_models::{AssetRef, CompositionRequest};

use crate::engine::{CodecEngine, EngineFile, Namespace};
use crate::error::{MediaError, MediaResult};
use crate::fetch::AssetFetcher;

/// An image written into the engine, in presentation order.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedImage {
    pub index: usize,
    pub file: EngineFile,
}

/// Custom audio written into the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedAudio {
    pub file: EngineFile,
}

/// Everything the later stages read from.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedAssets {
    pub images: Vec<StagedImage>,
    /// Present only for a custom music selection
    pub audio: Option<StagedAudio>,
}

/// Fetch and stage all inputs of `request`.
///
/// Any fetch failure aborts; nothing is retried.
pub async fn stage_assets<E, F>(
    engine: &E,
    namespace: &Namespace,
    fetcher: &F,
    request: &CompositionRequest,
) -> MediaResult<StagedAssets>
where
    E: CodecEngine + ?Sized,
    F: AssetFetcher + ?Sized,
{
    let mut images = Vec::with_capacity(request.images.len());

    for (index, reference) in request.images.iter().enumerate() {
        let data = fetcher.fetch(reference).await?;
        let name = image_file_name(index, reference, &data)?;
        let file = engine.write_file(namespace, &name, &data).await?;
        debug!(index, file = %file, bytes = data.len(), "Staged image");
        images.push(StagedImage { index, file });
    }

    let audio = match request.music.custom_ref() {
        Some(reference) => {
            let data = fetcher.fetch(reference).await?;
            if data.is_empty() {
                return Err(MediaError::fetch_failed(reference, "audio is empty"));
            }
            let file = engine
                .write_file(namespace, &audio_file_name(reference), &data)
                .await?;
            debug!(file = %file, bytes = data.len(), "Staged custom audio");
            Some(StagedAudio { file })
        }
        None => None,
    };

    info!(
        namespace = namespace.id(),
        images = images.len(),
        custom_audio = audio.is_some(),
        "Assets staged"
    );

    Ok(StagedAssets { images, audio })
}

/// Index-ordered name carrying the sniffed image extension.
pub fn image_file_name(index: usize, reference: &AssetRef, data: &[u8]) -> MediaResult<String> {
    let format = image::guess_format(data)
        .map_err(|_| MediaError::fetch_failed(reference, "not a recognised image format"))?;
    let ext = format.extensions_str().first().copied().unwrap_or("img");
    Ok(format!("image{:03}.{}", index, ext))
}

/// `music.<ext>`, keeping a short alphanumeric extension from the reference.
pub fn audio_file_name(reference: &AssetRef) -> String {
    let raw = reference.as_str();
    if raw.starts_with("data:") {
        return "music.audio".to_string();
    }

    let path_part = url::Url::parse(raw)
        .ok()
        .filter(|u| u.scheme().len() > 1)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|| raw.to_string());

    let ext = Path::new(&path_part)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "audio".to_string());

    format!("music.{}", ext)
}
