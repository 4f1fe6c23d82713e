//! Blessing video CLI.
//!
//! Composes one video from local or remote images, writes it to disk and
//! prints a JSON summary with its `file://` URL.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use blessing_media::{
    compose_blessing_video, initialize_engine, probe_output, teardown_engine, ComposedVideo,
    OutputReport, ProgressSink,
};
use blessing_models::{CompositionRequest, EncodingPolicy, VideoArtifact};
use url::Url;

mod request;

#[derive(Parser)]
#[command(
    name = "blessing",
    version,
    about = "Compose a blessing video from photos, a message and music",
    after_help = "EXAMPLES:\n  \
                  blessing compose -i a.jpg -i b.png -t \"Happy birthday!\" --music default\n  \
                  blessing compose --request request.json --output-dir ./out\n  \
                  blessing schema"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a video
    Compose(ComposeArgs),

    /// Print the JSON schema of a request file
    Schema,
}

#[derive(clap::Args)]
struct ComposeArgs {
    /// Image reference (path, file://, http(s):// or data: URL), in order
    #[arg(short, long = "image")]
    images: Vec<String>,

    /// Blessing text burned onto the video
    #[arg(short, long, default_value = "")]
    text: String,

    /// Recipient name, used for the output file name
    #[arg(short, long)]
    recipient: Option<String>,

    /// `default` for a generated tone, or an audio reference
    #[arg(short, long)]
    music: Option<String>,

    /// Read the whole request from a JSON file instead of flags
    #[arg(long, conflicts_with_all = ["images", "text", "recipient", "music"])]
    request: Option<PathBuf>,

    /// Directory the video is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Skip probing the written file
    #[arg(long)]
    no_probe: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install rustls crypto provider"))?;

    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Schema => {
            let schema = schemars::schema_for!(CompositionRequest);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Commands::Compose(args) => {
            let result = compose(args).await;
            if let Err(e) = teardown_engine().await {
                warn!(error = %e, "Engine teardown failed");
            }
            result
        }
    }
}

fn init_tracing() -> Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("blessing=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    Ok(())
}

async fn compose(args: ComposeArgs) -> Result<()> {
    let request = match &args.request {
        Some(path) => request::load_request(path)?,
        None => request::request_from_flags(
            &args.images,
            &args.text,
            args.recipient.as_deref(),
            args.music.as_deref(),
        ),
    };

    info!(
        images = request.images.len(),
        music = request.music.as_str(),
        "Starting blessing video"
    );

    initialize_engine()
        .await
        .map_err(|e| anyhow!("{} ({})", e.user_message(), e.message))?;

    let progress: ProgressSink = Arc::new(|percent: u8| info!(percent, "Progress"));

    let video = match compose_blessing_video(&request, progress).await {
        Ok(video) => video,
        Err(e) => {
            error!(kind = e.kind.as_str(), message = %e.message, "Composition failed");
            return Err(anyhow!("{} ({})", e.user_message(), e.message));
        }
    };

    if let Some(reason) = &video.overlay_warning {
        warn!(reason = %reason, "Video was produced without the blessing text");
    }

    let file_name = VideoArtifact::suggested_file_name(&request.recipient_name);
    let (path, url) = video.artifact.persist(&args.output_dir, &file_name)?;

    let report = if args.no_probe {
        None
    } else {
        match probe_output(&path).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!(error = %e, "Could not probe output");
                None
            }
        }
    };

    let summary = build_summary(&video, &path, &url, report.as_ref());
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

/// JSON summary printed after a successful run.
///
/// `duration_secs` is the probed length; a short custom soundtrack makes it
/// smaller than `max_duration_secs` (5 s per image).
fn build_summary(
    video: &ComposedVideo,
    path: &Path,
    url: &Url,
    report: Option<&OutputReport>,
) -> serde_json::Value {
    serde_json::json!({
        "run_id": video.run_id,
        "file": path,
        "url": url.as_str(),
        "media_type": video.artifact.media_type(),
        "bytes": video.artifact.len(),
        "duration_secs": report.map(|r| r.duration_secs),
        "max_duration_secs": video.nominal_duration_secs,
        "overlay_applied": video.overlay_applied,
        "overlay_warning": video.overlay_warning,
        "audio_mixed": video.audio_mixed(),
        "deviations": report.map(|r| r.deviations(&EncodingPolicy::default())),
        "probe": report,
        "created_at": chrono::Utc::now().to_rfc3339(),
    })
}
