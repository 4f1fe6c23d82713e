//! FFmpeg command builder.
//!
//! Commands never carry bare paths: inputs and the output are [`EngineFile`]
//! handles that the executing engine resolves inside its own storage.

use blessing_models::EncodingPolicy;

use crate::engine::EngineFile;

/// Where an input's data comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    /// A file in the engine's storage
    File(EngineFile),
    /// A `lavfi` generator description (e.g. `sine=...`)
    Lavfi(String),
}

/// One `-i` input with its input-side options.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInput {
    args: Vec<String>,
    source: InputSource,
}

impl CommandInput {
    /// Input read from an engine file.
    pub fn file(file: EngineFile) -> Self {
        Self {
            args: Vec::new(),
            source: InputSource::File(file),
        }
    }

    /// Input produced by a `lavfi` generator.
    pub fn lavfi(description: impl Into<String>) -> Self {
        Self {
            args: Vec::new(),
            source: InputSource::Lavfi(description.into()),
        }
    }

    /// Add an input argument (placed before `-i`).
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Loop a still image at `fps` for `seconds`.
    pub fn looped_still(self, fps: u32, seconds: f64) -> Self {
        self.arg("-loop")
            .arg("1")
            .arg("-framerate")
            .arg(fps.to_string())
            .duration(seconds)
    }

    /// Limit the input's duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(format!("{:.3}", seconds))
    }

    pub fn source(&self) -> &InputSource {
        &self.source
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Duration declared with `-t`, if any.
    pub fn declared_duration(&self) -> Option<f64> {
        flag_value(&self.args, "-t").and_then(|v| v.parse().ok())
    }
}

/// A single rendered command-line argument.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandArg {
    Literal(String),
    File(EngineFile),
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Inputs in `-i` order (input index = position)
    inputs: Vec<CommandInput>,
    /// Output file
    output: EngineFile,
    /// Output arguments (after all inputs)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
    /// Expected output duration, used to turn `out_time` into a fraction
    expected_duration: Option<f64>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: EngineFile) -> Self {
        Self {
            inputs: Vec::new(),
            output,
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
            expected_duration: None,
        }
    }

    /// Append an input.
    pub fn input(mut self, input: CommandInput) -> Self {
        self.inputs.push(input);
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a stream or filter label into the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Apply the fixed video encoding policy.
    pub fn encoding(self, policy: &EncodingPolicy) -> Self {
        self.output_args(policy.to_ffmpeg_args())
    }

    /// Drop audio streams.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Stop at the end of the shortest stream.
    pub fn shortest(self) -> Self {
        self.output_arg("-shortest")
    }

    /// Limit output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Move the moov atom to the front for progressive playback.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Declare the expected output duration for progress reporting.
    pub fn expected_duration(mut self, seconds: f64) -> Self {
        self.expected_duration = Some(seconds);
        self
    }

    pub fn inputs(&self) -> &[CommandInput] {
        &self.inputs
    }

    pub fn output(&self) -> &EngineFile {
        &self.output
    }

    pub fn expected_duration_secs(&self) -> Option<f64> {
        self.expected_duration
    }

    /// Whether `flag` appears among the output arguments.
    pub fn has_output_flag(&self, flag: &str) -> bool {
        self.output_args.iter().any(|a| a == flag)
    }

    /// Value following `flag` among the output arguments.
    pub fn output_flag_value(&self, flag: &str) -> Option<&str> {
        flag_value(&self.output_args, flag)
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<CommandArg> {
        let mut args = Vec::new();
        let lit = |s: &str| CommandArg::Literal(s.to_string());

        // Overwrite flag
        if self.overwrite {
            args.push(lit("-y"));
        }

        args.push(lit("-hide_banner"));
        args.push(lit("-nostdin"));

        // Log level
        args.push(lit("-v"));
        args.push(CommandArg::Literal(self.log_level.clone()));

        // Progress output to stderr
        args.push(lit("-progress"));
        args.push(lit("pipe:2"));
        args.push(lit("-nostats"));

        for input in &self.inputs {
            args.extend(input.args.iter().cloned().map(CommandArg::Literal));
            match &input.source {
                InputSource::File(file) => {
                    args.push(lit("-i"));
                    args.push(CommandArg::File(file.clone()));
                }
                InputSource::Lavfi(description) => {
                    args.push(lit("-f"));
                    args.push(lit("lavfi"));
                    args.push(lit("-i"));
                    args.push(CommandArg::Literal(description.clone()));
                }
            }
        }

        args.extend(self.output_args.iter().cloned().map(CommandArg::Literal));
        args.push(CommandArg::File(self.output.clone()));

        args
    }

    /// Render arguments to strings, resolving files with `resolve`.
    pub fn render_args<F>(&self, resolve: F) -> Vec<String>
    where
        F: Fn(&EngineFile) -> String,
    {
        self.build_args()
            .into_iter()
            .map(|arg| match arg {
                CommandArg::Literal(s) => s,
                CommandArg::File(file) => resolve(&file),
            })
            .collect()
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}
