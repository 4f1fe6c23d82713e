//! Fixed encoding and rendering policy.
//!
//! None of these values are user-configurable; they are grouped into
//! structs so stages can take them by reference and tests can inspect them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Duration of each image segment in seconds.
pub const SECONDS_PER_IMAGE: f64 = 5.0;

/// Canonical frame size.
pub const FRAME_WIDTH: u32 = 1280;
pub const FRAME_HEIGHT: u32 = 720;
/// Frame rate for looped still images.
pub const FRAME_RATE: u32 = 25;

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default pixel format
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "medium";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;

/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";
/// Default tone frequency in Hz
pub const DEFAULT_TONE_FREQUENCY: u32 = 440;
/// Default sample rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Video encoding policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingPolicy {
    pub codec: String,
    pub pixel_format: String,
    pub preset: String,
    pub crf: u8,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
}

impl Default for EncodingPolicy {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            frame_rate: FRAME_RATE,
        }
    }
}

impl EncodingPolicy {
    /// Filter chain that fits an image into the canonical frame.
    ///
    /// Aspect ratio is preserved; the remainder is padded black.
    pub fn scale_filter(&self) -> String {
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,format={fmt}",
            w = self.width,
            h = self.height,
            fmt = self.pixel_format
        )
    }

    /// Video encoder arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
        ]
    }
}

/// Audio synthesis and encoding policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AudioPolicy {
    pub codec: String,
    pub bitrate: String,
    pub tone_frequency: u32,
    pub sample_rate: u32,
}

impl Default for AudioPolicy {
    fn default() -> Self {
        Self {
            codec: DEFAULT_AUDIO_CODEC.to_string(),
            bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            tone_frequency: DEFAULT_TONE_FREQUENCY,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl AudioPolicy {
    /// `lavfi` source description for the default tone.
    pub fn tone_source(&self, duration_secs: f64) -> String {
        format!(
            "sine=frequency={}:sample_rate={}:duration={:.3}",
            self.tone_frequency, self.sample_rate, duration_secs
        )
    }
}

/// Blessing text rendering policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OverlayStyle {
    pub font_color: String,
    pub font_size: u32,
    pub box_color: String,
    pub box_border: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font_color: "white".to_string(),
            font_size: 48,
            box_color: "black@0.5".to_string(),
            box_border: 10,
        }
    }
}
