//! Asset fetching.
//!
//! References are resolved by scheme: `http(s)://` over HTTP, `file://` and
//! bare paths from disk, `data:` URLs decoded in place.

use async_trait::async_trait;
use base64::Engine as _;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

use blessing_models::AssetRef;

use crate::error::{MediaError, MediaResult};

/// Resolves asset references to raw bytes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetFetcher: Send + Sync + 'static {
    async fn fetch(&self, reference: &AssetRef) -> MediaResult<Vec<u8>>;
}

/// Fetcher for HTTP(S), file and data references.
#[derive(Debug, Clone)]
pub struct DefaultFetcher {
    http: reqwest::Client,
}

impl DefaultFetcher {
    pub fn new(timeout: Duration) -> MediaResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaError::internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    async fn fetch_http(&self, reference: &AssetRef, url: Url) -> MediaResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::fetch_failed(reference, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::fetch_failed(
                reference,
                format!("HTTP {}", status),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| MediaError::fetch_failed(reference, e.to_string()))?;
        Ok(body.to_vec())
    }

    async fn fetch_path(&self, reference: &AssetRef, path: &Path) -> MediaResult<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| MediaError::fetch_failed(reference, format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl AssetFetcher for DefaultFetcher {
    async fn fetch(&self, reference: &AssetRef) -> MediaResult<Vec<u8>> {
        let raw = reference.as_str().trim();

        let data = match Url::parse(raw) {
            Ok(url) => match url.scheme() {
                "http" | "https" => self.fetch_http(reference, url).await?,
                "file" => {
                    let path = url.to_file_path().map_err(|_| {
                        MediaError::fetch_failed(reference, "not a local file URL")
                    })?;
                    self.fetch_path(reference, &path).await?
                }
                "data" => decode_data_url(raw)
                    .ok_or_else(|| MediaError::fetch_failed(reference, "malformed data URL"))?,
                // Single-letter "schemes" are Windows drive letters
                scheme if scheme.len() == 1 => self.fetch_path(reference, Path::new(raw)).await?,
                scheme => {
                    return Err(MediaError::fetch_failed(
                        reference,
                        format!("unsupported scheme '{}'", scheme),
                    ))
                }
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                self.fetch_path(reference, Path::new(raw)).await?
            }
            Err(e) => return Err(MediaError::fetch_failed(reference, e.to_string())),
        };

        debug!(reference = %reference, bytes = data.len(), "Fetched asset");
        Ok(data)
    }
}

/// Decode an RFC 2397 `data:` URL payload.
pub fn decode_data_url(raw: &str) -> Option<Vec<u8>> {
    let rest = raw.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;

    if meta.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(cleaned.as_bytes())
            .ok()
    } else {
        Some(urlencoding::decode_binary(payload.as_bytes()).into_owned())
    }
}
