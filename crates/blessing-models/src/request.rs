//! Composition request models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::encoding::SECONDS_PER_IMAGE;
use crate::failure::CompositionError;

/// Reserved music reference meaning "synthesize a default tone".
pub const DEFAULT_MUSIC_SENTINEL: &str = "default";

/// Reference to a fetchable asset (URL, `data:` URL or filesystem path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AssetRef(pub String);

impl AssetRef {
    /// Create from anything string-like.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // data: URLs can be megabytes long
        if self.0.starts_with("data:") && self.0.len() > 64 {
            write!(f, "{}...", &self.0[..self.0.char_indices().nth(48).map_or(0, |(i, _)| i)])
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<String> for AssetRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AssetRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Music choice for a composition.
///
/// Serialized as an optional string: `null` or `""` means no music,
/// `"default"` selects the synthesized tone, anything else is a reference
/// to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum MusicSelection {
    /// No audio track
    #[default]
    None,
    /// Synthesized sine tone matching the visual duration
    Default,
    /// Caller-supplied audio to fetch and stage
    Custom(AssetRef),
}

impl MusicSelection {
    /// Whether the audio mix stage should run.
    pub fn is_active(&self) -> bool {
        !matches!(self, MusicSelection::None)
    }

    /// The reference to stage, if any.
    pub fn custom_ref(&self) -> Option<&AssetRef> {
        match self {
            MusicSelection::Custom(reference) => Some(reference),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MusicSelection::None => "none",
            MusicSelection::Default => DEFAULT_MUSIC_SENTINEL,
            MusicSelection::Custom(_) => "custom",
        }
    }
}

impl From<Option<String>> for MusicSelection {
    fn from(value: Option<String>) -> Self {
        match value {
            None => MusicSelection::None,
            Some(s) if s.trim().is_empty() => MusicSelection::None,
            Some(s) if s == DEFAULT_MUSIC_SENTINEL => MusicSelection::Default,
            Some(s) => MusicSelection::Custom(AssetRef(s)),
        }
    }
}

impl From<MusicSelection> for Option<String> {
    fn from(value: MusicSelection) -> Self {
        match value {
            MusicSelection::None => None,
            MusicSelection::Default => Some(DEFAULT_MUSIC_SENTINEL.to_string()),
            MusicSelection::Custom(reference) => Some(reference.0),
        }
    }
}

/// Request to compose one blessing video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompositionRequest {
    /// Images in presentation order
    pub images: Vec<AssetRef>,

    /// Blessing text burned onto the video (may contain line breaks)
    #[serde(default)]
    pub blessing_text: String,

    /// Recipient name; decorative only, used for the download file name
    #[serde(default)]
    pub recipient_name: String,

    /// Music selection
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub music: MusicSelection,
}

impl CompositionRequest {
    /// Create a request with no music.
    pub fn new(images: Vec<AssetRef>, blessing_text: impl Into<String>) -> Self {
        Self {
            images,
            blessing_text: blessing_text.into(),
            recipient_name: String::new(),
            music: MusicSelection::None,
        }
    }

    pub fn with_recipient(mut self, name: impl Into<String>) -> Self {
        self.recipient_name = name.into();
        self
    }

    pub fn with_music(mut self, music: MusicSelection) -> Self {
        self.music = music;
        self
    }

    /// Nominal visual duration in seconds (5 per image).
    pub fn nominal_duration_secs(&self) -> f64 {
        self.images.len() as f64 * SECONDS_PER_IMAGE
    }

    /// Validate the request.
    pub fn validate(&self) -> Result<(), CompositionError> {
        if self.images.is_empty() {
            return Err(CompositionError::invalid_request(
                "At least one image is required",
            ));
        }

        if let Some(index) = self.images.iter().position(|r| r.as_str().trim().is_empty()) {
            return Err(CompositionError::invalid_request(format!(
                "Image reference {} is empty",
                index
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureKind;

    #[test]
    fn test_music_selection_from_json() {
        let none: MusicSelection = serde_json::from_str("null").unwrap();
        assert_eq!(none, MusicSelection::None);

        let empty: MusicSelection = serde_json::from_str("\"\"").unwrap();
        assert_eq!(empty, MusicSelection::None);

        let default: MusicSelection = serde_json::from_str("\"default\"").unwrap();
        assert_eq!(default, MusicSelection::Default);

        let custom: MusicSelection = serde_json::from_str("\"https://cdn/a.mp3\"").unwrap();
        assert_eq!(
            custom.custom_ref().map(AssetRef::as_str),
            Some("https://cdn/a.mp3")
        );
    }

    #[test]
    fn test_music_selection_serializes_as_option() {
        assert_eq!(serde_json::to_string(&MusicSelection::None).unwrap(), "null");
        assert_eq!(
            serde_json::to_string(&MusicSelection::Default).unwrap(),
            "\"default\""
        );
    }

    #[test]
    fn test_request_defaults_missing_fields() {
        let request: CompositionRequest =
            serde_json::from_str(r#"{"images": ["a.jpg", "b.jpg"]}"#).unwrap();
        assert_eq!(request.images.len(), 2);
        assert!(request.blessing_text.is_empty());
        assert!(!request.music.is_active());
        assert!((request.nominal_duration_secs() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_validate_rejects_empty_images() {
        let request = CompositionRequest::new(vec![], "hello");
        let err = request.validate().unwrap_err();
        assert_eq!(err.kind, FailureKind::InvalidRequest);
    }

    #[test]
    fn test_validate_rejects_blank_reference() {
        let request = CompositionRequest::new(vec!["a.jpg".into(), " ".into()], "hello");
        assert!(request.validate().is_err());

        let ok = CompositionRequest::new(vec!["a.jpg".into()], "hello");
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_long_data_url_display_is_truncated() {
        let reference = AssetRef::new(format!("data:image/png;base64,{}", "A".repeat(500)));
        let shown = reference.to_string();
        assert!(shown.len() < 60);
        assert!(shown.ends_with("..."));
    }
}
