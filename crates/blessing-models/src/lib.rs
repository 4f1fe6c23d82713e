//! Shared data models for the blessing video composer.
//!
//! This crate provides Serde-serializable types for:
//! - Composition requests (images, blessing text, music selection)
//! - Fixed encoding and rendering policy
//! - Output artifacts and structured failures

pub mod artifact;
pub mod encoding;
pub mod failure;
pub mod request;
pub mod run;

// Re-export common types
pub use artifact::{VideoArtifact, VIDEO_MEDIA_TYPE};
pub use encoding::{AudioPolicy, EncodingPolicy, OverlayStyle, SECONDS_PER_IMAGE};
pub use failure::{CompositionError, FailureKind};
pub use request::{AssetRef, CompositionRequest, MusicSelection, DEFAULT_MUSIC_SENTINEL};
pub use run::RunId;
