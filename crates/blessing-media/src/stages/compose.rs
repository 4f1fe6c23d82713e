//! Composition: turn staged stills into one continuous visual track.
//!
//! A single image is encoded directly. Several images are each scaled into a
//! labelled stream and concatenated in input order.

use tracing::info;

use blessing_models::{EncodingPolicy, SECONDS_PER_IMAGE};

use crate::command::{CommandInput, FfmpegCommand};
use crate::engine::{CodecEngine, EngineFile, Namespace, ProgressFn};
use crate::error::{MediaError, MediaResult};
use crate::stages::StagedImage;

/// Output name of the composition stage.
pub const COMPOSED_FILE: &str = "composed.mp4";

/// An encoded, silent visual track.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualTrack {
    pub file: EngineFile,
    /// Nominal duration in seconds (5 per image)
    pub duration_secs: f64,
    /// Whether the blessing text is burned in
    pub has_overlay: bool,
}

/// Build the composition command for `images`.
pub fn build_compose_command(
    namespace: &Namespace,
    images: &[StagedImage],
    policy: &EncodingPolicy,
) -> MediaResult<FfmpegCommand> {
    if images.is_empty() {
        return Err(MediaError::InvalidRequest(
            "cannot compose a video from zero images".to_string(),
        ));
    }

    let duration = images.len() as f64 * SECONDS_PER_IMAGE;
    let mut command = FfmpegCommand::new(namespace.file(COMPOSED_FILE));

    for image in images {
        command = command.input(
            CommandInput::file(image.file.clone()).looped_still(policy.frame_rate, SECONDS_PER_IMAGE),
        );
    }

    command = if images.len() == 1 {
        command.video_filter(policy.scale_filter())
    } else {
        command.filter_complex(concat_filter(images.len(), policy)).map("[v]")
    };

    Ok(command
        .encoding(policy)
        .no_audio()
        .duration(duration)
        .faststart()
        .expected_duration(duration))
}

/// `[0:v]scale..[v0];[1:v]scale..[v1];[v0][v1]concat=n=2:v=1:a=0[v]`
fn concat_filter(count: usize, policy: &EncodingPolicy) -> String {
    let scale = policy.scale_filter();
    let mut chains: Vec<String> = (0..count)
        .map(|i| format!("[{i}:v]{scale}[v{i}]"))
        .collect();

    let labels: String = (0..count).map(|i| format!("[v{i}]")).collect();
    chains.push(format!("{labels}concat=n={count}:v=1:a=0[v]"));

    chains.join(";")
}

/// Encode the staged images into a visual track.
pub async fn compose_visual_track<E>(
    engine: &E,
    namespace: &Namespace,
    images: &[StagedImage],
    policy: &EncodingPolicy,
    progress: &ProgressFn<'_>,
) -> MediaResult<VisualTrack>
where
    E: CodecEngine + ?Sized,
{
    let command = build_compose_command(namespace, images, policy)?;
    let duration_secs = images.len() as f64 * SECONDS_PER_IMAGE;

    info!(
        namespace = namespace.id(),
        images = images.len(),
        duration_secs,
        single = images.len() == 1,
        "Composing visual track"
    );

    engine.exec(&command, progress).await?;

    Ok(VisualTrack {
        file: command.output().clone(),
        duration_secs,
        has_overlay: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::recording::RecordingEngine;
    use crate::progress::{ProgressBand, ProgressTracker};
    use std::sync::{Arc, Mutex};

    fn staged(ns: &Namespace, n: usize) -> Vec<StagedImage> {
        (0..n)
            .map(|index| StagedImage {
                index,
                file: ns.file(format!("image{:03}.jpg", index)),
            })
            .collect()
    }

    #[test]
    fn test_single_image_skips_concat() {
        let ns = Namespace::new("run");
        let cmd = build_compose_command(&ns, &staged(&ns, 1), &EncodingPolicy::default()).unwrap();
        let args = cmd.render_args(|f| f.to_string());

        assert!(cmd.has_output_flag("-vf"));
        assert!(!cmd.has_output_flag("-filter_complex"));
        assert!(!args.iter().any(|a| a.contains("concat")));
        assert_eq!(cmd.output_flag_value("-t"), Some("5.000"));
    }

    #[test]
    fn test_multi_image_concatenates_in_order() {
        let ns = Namespace::new("run");
        let cmd = build_compose_command(&ns, &staged(&ns, 3), &EncodingPolicy::default()).unwrap();

        let filter = cmd.output_flag_value("-filter_complex").unwrap();
        assert!(filter.contains("[0:v]scale=1280:720"));
        assert!(filter.ends_with("[v0][v1][v2]concat=n=3:v=1:a=0[v]"));
        assert_eq!(cmd.output_flag_value("-map"), Some("[v]"));
        assert_eq!(cmd.output_flag_value("-t"), Some("15.000"));
        assert_eq!(cmd.expected_duration_secs(), Some(15.0));

        let inputs: Vec<_> = cmd.inputs().iter().map(|i| i.declared_duration()).collect();
        assert_eq!(inputs, vec![Some(5.0); 3]);
    }

    #[test]
    fn test_policy_constants_applied() {
        let ns = Namespace::new("run");
        let cmd = build_compose_command(&ns, &staged(&ns, 2), &EncodingPolicy::default()).unwrap();
        assert_eq!(cmd.output_flag_value("-crf"), Some("23"));
        assert_eq!(cmd.output_flag_value("-preset"), Some("medium"));
        assert_eq!(cmd.output_flag_value("-pix_fmt"), Some("yuv420p"));
        assert_eq!(cmd.output_flag_value("-c:v"), Some("libx264"));
    }

    #[test]
    fn test_zero_images_rejected() {
        let ns = Namespace::new("run");
        assert!(build_compose_command(&ns, &[], &EncodingPolicy::default()).is_err());
    }

    #[tokio::test]
    async fn test_compose_returns_track_handle() {
        let engine = RecordingEngine::default();
        let ns = Namespace::new("run");

        let track = compose_visual_track(
            &engine,
            &ns,
            &staged(&ns, 2),
            &EncodingPolicy::default(),
            &|_: f64| {},
        )
        .await
        .unwrap();

        assert_eq!(track.file, ns.file(COMPOSED_FILE));
        assert!((track.duration_secs - 10.0).abs() < f64::EPSILON);
        assert!(!track.has_overlay);
    }

    #[tokio::test]
    async fn test_compose_reports_through_tracker_band() {
        let engine = RecordingEngine::default();
        let ns = Namespace::new("run");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let tracker =
            ProgressTracker::new(Arc::new(move |p: u8| sink_seen.lock().unwrap().push(p)));

        compose_visual_track(
            &engine,
            &ns,
            &staged(&ns, 1),
            &EncodingPolicy::default(),
            &tracker.band(ProgressBand::COMPOSE),
        )
        .await
        .unwrap();

        assert_eq!(tracker.current(), 90);
        assert_eq!(*seen.lock().unwrap(), vec![90]);
    }
}
