//! Rendering and playback through external programs.
//!
//! Waveform videos are drawn by `ffmpeg`: a formula is evaluated by the
//! `aevalsrc` source, raw samples are read as `f32le`, and in both cases the
//! `showwaves` filter turns the audio into video frames that are muxed
//! together with the audio track. Playback goes to an external player that
//! blocks until the viewer is closed.
//!
//! The [`MediaTools`] trait is the seam between the workflow and these
//! programs; [`SystemTools`] is the implementation that actually spawns
//! them.

use std::{
    ffi::OsString,
    path::Path,
    process::{Command, Stdio},
};

use crate::{
    config::{RenderOptions, ToolOptions},
    error::WavelabError,
};

/// Rendering and playback operations used by the workflow.
pub trait MediaTools {
    /// Render a video of `formula` (an ffmpeg expression in `t`) to `output`.
    fn render_formula(&self, formula: &str, output: &Path) -> Result<(), WavelabError>;

    /// Render a video of a raw mono `f32le` stream to `output`.
    fn render_raw(
        &self,
        raw_audio: &Path,
        sampling_rate: u32,
        output: &Path,
    ) -> Result<(), WavelabError>;

    /// Show `video` to the user and return once the player is closed.
    fn play(&self, video: &Path) -> Result<(), WavelabError>;
}

/// Quote a value for ffmpeg's filtergraph parser.
///
/// The whole value is wrapped in single quotes, so commas, colons and
/// brackets in a formula stay part of the expression. Embedded single
/// quotes are closed, escaped and reopened.
pub fn quote_filter_value(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// The `-filter_complex` graph shared by both render modes.
fn showwaves_graph(options: &RenderOptions) -> String {
    format!(
        "[0:a]showwaves=s={}:mode={}:rate={}[v]",
        options.size_argument(),
        options.mode,
        options.frames_per_second
    )
}

// `-nostdin` keeps ffmpeg from eating the review answer typed afterwards.
fn leading_arguments(options: &RenderOptions) -> Vec<OsString> {
    ["-hide_banner", "-nostdin", "-loglevel", options.log_level.as_str(), "-y"]
        .into_iter()
        .map(OsString::from)
        .collect()
}

fn trailing_arguments(options: &RenderOptions, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "-filter_complex".to_string(),
        showwaves_graph(options),
        "-map".to_string(),
        "[v]".to_string(),
        "-map".to_string(),
        "0:a".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(output.as_os_str().to_owned());
    args
}

/// ffmpeg arguments that render `formula` into `output`.
pub fn formula_arguments(formula: &str, output: &Path, options: &RenderOptions) -> Vec<OsString> {
    let source = format!(
        "aevalsrc=exprs={}:s={}:d={}",
        quote_filter_value(formula),
        options.formula_sample_rate,
        options.formula_duration
    );

    let mut args = leading_arguments(options);
    args.extend(["-f", "lavfi", "-i"].map(OsString::from));
    args.push(source.into());
    args.extend(trailing_arguments(options, output));
    args
}

/// ffmpeg arguments that render a raw mono `f32le` stream into `output`.
pub fn raw_arguments(
    raw_audio: &Path,
    sampling_rate: u32,
    output: &Path,
    options: &RenderOptions,
) -> Vec<OsString> {
    let mut args = leading_arguments(options);
    args.extend(["-f", "f32le", "-ar"].map(OsString::from));
    args.push(sampling_rate.to_string().into());
    args.extend(["-ac", "1", "-i"].map(OsString::from));
    args.push(raw_audio.as_os_str().to_owned());
    args.extend(trailing_arguments(options, output));
    args
}

/// Run a command to completion, inheriting the terminal.
///
/// A launch failure becomes [`WavelabError::ToolLaunch`] and a non-zero
/// exit becomes [`WavelabError::ToolFailed`].
pub(crate) fn run_blocking(mut command: Command) -> Result<(), WavelabError> {
    let tool = command.get_program().to_string_lossy().into_owned();
    log::debug!("Running {command:?}");

    let status = command
        .stdin(Stdio::inherit())
        .status()
        .map_err(|error| WavelabError::ToolLaunch {
            tool: tool.clone(),
            reason: error.to_string(),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(WavelabError::ToolFailed { tool, status })
    }
}

/// [`MediaTools`] backed by real `ffmpeg` and player processes.
#[derive(Debug, Clone, Default)]
pub struct SystemTools {
    render: RenderOptions,
    tools: ToolOptions,
}

impl SystemTools {
    /// Create tools from render and program settings.
    pub fn new(render: RenderOptions, tools: ToolOptions) -> Self {
        Self { render, tools }
    }

    /// The render settings in use.
    pub fn render_options(&self) -> &RenderOptions {
        &self.render
    }

    /// The program settings in use.
    pub fn tool_options(&self) -> &ToolOptions {
        &self.tools
    }

    fn run_ffmpeg(&self, args: Vec<OsString>, output: &Path) -> Result<(), WavelabError> {
        let mut command = Command::new(&self.tools.ffmpeg);
        command.args(args);
        run_blocking(command)?;

        if !output.is_file() {
            return Err(WavelabError::MissingArtifact(output.to_path_buf()));
        }
        self.inspect(output);
        Ok(())
    }

    #[cfg(feature = "probe")]
    fn inspect(&self, output: &Path) {
        use crate::validation::{Severity, validate_render};

        let metadata = match crate::probe::probe_video(output) {
            Ok(metadata) => metadata,
            Err(error) => {
                log::warn!("Could not inspect {}: {error}", output.display());
                return;
            }
        };
        for finding in validate_render(&metadata, &self.render).findings() {
            match finding.severity {
                Severity::Info => log::debug!("{}", finding.message),
                Severity::Warning => log::warn!("{}", finding.message),
                Severity::Error => log::error!("{}", finding.message),
            }
        }
    }

    #[cfg(not(feature = "probe"))]
    fn inspect(&self, _output: &Path) {}
}

impl MediaTools for SystemTools {
    fn render_formula(&self, formula: &str, output: &Path) -> Result<(), WavelabError> {
        log::info!("Rendering formula {formula:?} to {}", output.display());
        self.run_ffmpeg(formula_arguments(formula, output, &self.render), output)
    }

    fn render_raw(
        &self,
        raw_audio: &Path,
        sampling_rate: u32,
        output: &Path,
    ) -> Result<(), WavelabError> {
        log::info!(
            "Rendering {} at {sampling_rate} Hz to {}",
            raw_audio.display(),
            output.display()
        );
        self.run_ffmpeg(
            raw_arguments(raw_audio, sampling_rate, output, &self.render),
            output,
        )
    }

    fn play(&self, video: &Path) -> Result<(), WavelabError> {
        let mut command = Command::new(&self.tools.player);
        command.args(&self.tools.player_args).arg(video);
        run_blocking(command)
    }
}

#[cfg(test)]
mod tests {
    use std::{ffi::OsString, path::Path};

    use super::{formula_arguments, quote_filter_value, raw_arguments};
    use crate::config::RenderOptions;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn quoting_protects_filter_syntax() {
        assert_eq!(quote_filter_value("sin(2*PI*440*t)"), "'sin(2*PI*440*t)'");
        assert_eq!(quote_filter_value("a'b"), r"'a'\''b'");
    }

    #[test]
    fn formula_command_line() {
        let options = RenderOptions::new().with_formula_duration(2.5);
        let args = strings(formula_arguments(
            "0.5*sin(2*PI*220*t)",
            Path::new("video.mp4"),
            &options,
        ));

        let source_index = args.iter().position(|arg| arg == "lavfi").unwrap() + 2;
        assert_eq!(
            args[source_index],
            "aevalsrc=exprs='0.5*sin(2*PI*220*t)':s=44100:d=2.5"
        );
        assert!(args.contains(&"[0:a]showwaves=s=1280x720:mode=line:rate=25[v]".to_string()));
        assert_eq!(args.last().unwrap(), "video.mp4");
        assert_eq!(
            &args[..5],
            ["-hide_banner", "-nostdin", "-loglevel", "error", "-y"]
        );
    }

    #[test]
    fn raw_command_line() {
        let options = RenderOptions::new().with_size(320, 240).with_mode("p2p");
        let args = strings(raw_arguments(
            Path::new("/tmp/fn/audio.raw"),
            8000,
            Path::new("/tmp/fn/video.mp4"),
            &options,
        ));

        let window: Vec<&str> = args.iter().map(String::as_str).collect();
        let input = [
            "-f",
            "f32le",
            "-ar",
            "8000",
            "-ac",
            "1",
            "-i",
            "/tmp/fn/audio.raw",
            "-filter_complex",
        ];
        assert!(window.windows(input.len()).any(|w| w == input));
        assert!(args.contains(&"[0:a]showwaves=s=320x240:mode=p2p:rate=25[v]".to_string()));
    }
}
