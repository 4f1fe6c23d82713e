//! Inspection of a written blessing video with `ffprobe`.
//!
//! The report is checked against the fixed [`EncodingPolicy`]: every
//! composed video should come out at the canonical frame size and rate,
//! H.264 encoded, with an audio stream only when music was mixed in.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use blessing_models::EncodingPolicy;

use crate::error::{MediaError, MediaResult};

/// Frame rate difference still counted as a match.
const FPS_TOLERANCE: f64 = 0.01;

/// What `ffprobe` reports about a written video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputReport {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Decoder-side codec name, e.g. `h264`
    pub video_codec: String,
    pub audio_codec: Option<String>,
}

impl OutputReport {
    pub fn has_audio(&self) -> bool {
        self.audio_codec.is_some()
    }

    /// Ways the video departs from `policy`; empty when it conforms.
    pub fn deviations(&self, policy: &EncodingPolicy) -> Vec<String> {
        let mut found = Vec::new();

        if (self.width, self.height) != (policy.width, policy.height) {
            found.push(format!(
                "frame is {}x{}, expected {}x{}",
                self.width, self.height, policy.width, policy.height
            ));
        }
        if (self.fps - f64::from(policy.frame_rate)).abs() > FPS_TOLERANCE {
            found.push(format!(
                "frame rate is {:.2}, expected {}",
                self.fps, policy.frame_rate
            ));
        }
        let expected_codec = decoded_codec_name(&policy.codec);
        if self.video_codec != expected_codec {
            found.push(format!(
                "video codec is {}, expected {}",
                self.video_codec, expected_codec
            ));
        }

        found
    }

    pub fn conforms_to(&self, policy: &EncodingPolicy) -> bool {
        self.deviations(policy).is_empty()
    }
}

/// Name `ffprobe` reports for streams written by `encoder`.
fn decoded_codec_name(encoder: &str) -> &str {
    match encoder {
        "libx264" => "h264",
        "libx265" => "hevc",
        "libvpx-vp9" => "vp9",
        other => other,
    }
}

#[derive(Debug, Deserialize)]
struct ProbeDocument {
    #[serde(default)]
    streams: Vec<ProbedStream>,
    #[serde(default)]
    format: ProbedFormat,
}

#[derive(Debug, Default, Deserialize)]
struct ProbedFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "codec_type", rename_all = "lowercase")]
enum ProbedStream {
    Video {
        codec_name: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        avg_frame_rate: Option<String>,
    },
    Audio {
        codec_name: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// Run `ffprobe` on a written video.
pub async fn probe_output(path: impl AsRef<Path>) -> MediaResult<OutputReport> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    let ffprobe = which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;
    let output = Command::new(ffprobe)
        .args(["-v", "error", "-of", "json", "-show_entries"])
        .arg("format=duration:stream=codec_type,codec_name,width,height,avg_frame_rate")
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(MediaError::FfprobeFailed {
            message: format!("ffprobe exited with {:?}", output.status.code()),
            stderr: (!stderr.is_empty()).then_some(stderr),
        });
    }

    parse_report(&output.stdout)
}

/// Build a report from `ffprobe -of json` output.
pub fn parse_report(json: &[u8]) -> MediaResult<OutputReport> {
    let document: ProbeDocument = serde_json::from_slice(json)?;
    let probe_failure = |message: &str| MediaError::FfprobeFailed {
        message: message.to_string(),
        stderr: None,
    };

    let duration_secs = document
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| probe_failure("container reports no duration"))?;

    let mut video = None;
    let mut audio_codec = None;
    for stream in document.streams {
        match stream {
            ProbedStream::Video {
                codec_name,
                width,
                height,
                avg_frame_rate,
            } if video.is_none() => {
                video = Some((codec_name, width, height, avg_frame_rate));
            }
            ProbedStream::Audio { codec_name } if audio_codec.is_none() => {
                audio_codec = Some(codec_name.unwrap_or_default());
            }
            _ => {}
        }
    }

    let (codec_name, width, height, rate) =
        video.ok_or_else(|| probe_failure("no video stream"))?;

    Ok(OutputReport {
        duration_secs,
        width: width.unwrap_or(0),
        height: height.unwrap_or(0),
        fps: rate.as_deref().and_then(rational).unwrap_or(0.0),
        video_codec: codec_name.unwrap_or_default(),
        audio_codec,
    })
}

/// `num/den` or a plain decimal.
fn rational(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then_some(num.parse::<f64>().ok()? / den)
        }
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLESSING_WITH_TONE: &[u8] = br#"{
        "streams": [
            {"codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720,
             "avg_frame_rate": "25/1"},
            {"codec_type": "audio", "codec_name": "aac"},
            {"codec_type": "data"}
        ],
        "format": {"duration": "15.000000"}
    }"#;

    #[test]
    fn test_parse_report() {
        let report = parse_report(BLESSING_WITH_TONE).unwrap();

        assert_eq!((report.width, report.height), (1280, 720));
        assert_eq!(report.video_codec, "h264");
        assert_eq!(report.audio_codec.as_deref(), Some("aac"));
        assert!((report.duration_secs - 15.0).abs() < 1e-9);
        assert!((report.fps - 25.0).abs() < 1e-9);
        assert!(report.conforms_to(&EncodingPolicy::default()));
    }

    #[test]
    fn test_silent_video_has_no_audio() {
        let json = br#"{
            "streams": [{"codec_type": "video", "codec_name": "h264", "width": 1280,
                         "height": 720, "avg_frame_rate": "25/1"}],
            "format": {"duration": "5.0"}
        }"#;

        let report = parse_report(json).unwrap();
        assert!(!report.has_audio());
        assert!(report.conforms_to(&EncodingPolicy::default()));
    }

    #[test]
    fn test_deviations_name_each_mismatch() {
        let report = OutputReport {
            duration_secs: 5.0,
            width: 640,
            height: 480,
            fps: 30000.0 / 1001.0,
            video_codec: "mpeg4".to_string(),
            audio_codec: None,
        };

        let deviations = report.deviations(&EncodingPolicy::default());
        assert_eq!(deviations.len(), 3);
        assert!(deviations[0].contains("640x480"));
        assert!(deviations[1].contains("29.97"));
        assert!(deviations[2].contains("expected h264"));
    }

    #[test]
    fn test_report_requires_video_and_duration() {
        let audio_only = br#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "3"}}"#;
        assert!(parse_report(audio_only).is_err());

        let no_duration = br#"{"streams": [{"codec_type": "video"}], "format": {}}"#;
        assert!(parse_report(no_duration).is_err());
    }

    #[test]
    fn test_rational() {
        assert_eq!(rational("25/1"), Some(25.0));
        assert_eq!(rational("12.5"), Some(12.5));
        assert_eq!(rational("0/0"), None);
        assert_eq!(rational("n/a"), None);
    }
}
