//! Render and tool configuration.
//!
//! [`RenderOptions`] controls how `ffmpeg` draws the waveform video;
//! [`ToolOptions`] names the external programs that are invoked. Both are
//! builders: start from `new()` and override what you need.
//!
//! # Example
//!
//! ```
//! use wavelab::{RenderOptions, ToolOptions};
//!
//! let render = RenderOptions::new()
//!     .with_size(640, 360)
//!     .with_mode("p2p")
//!     .with_formula_duration(5.0);
//! let tools = ToolOptions::new()
//!     .with_player("vlc")
//!     .with_synthesizer("python3", ["helpers/create_video.py"]);
//! assert_eq!(render.size_argument(), "640x360");
//! assert_eq!(tools.player.to_str(), Some("vlc"));
//! ```

use std::ffi::OsString;
use std::path::PathBuf;

/// Name of the description file written next to a rendered video.
pub const DESCRIPTION_FILE: &str = "description.txt";

/// Name of the rendered video inside an output directory.
pub const VIDEO_FILE: &str = "video.mp4";

/// Name of the raw mono `f32` little-endian sample stream.
pub const RAW_AUDIO_FILE: &str = "audio.raw";

/// Name of the raw `f32` little-endian time axis stream.
pub const TIME_AXIS_FILE: &str = "time_axis";

/// Script run by `python3` when no synthesizer is configured.
pub const DEFAULT_SYNTHESIZER_SCRIPT: &str = "create_video.py";

/// How the waveform video is drawn and encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// `showwaves` drawing mode (`point`, `line`, `p2p`, `cline`).
    pub mode: String,
    /// Video frame rate.
    pub frames_per_second: u32,
    /// Sampling rate used when evaluating a formula.
    pub formula_sample_rate: u32,
    /// Length in seconds of audio generated from a formula.
    pub formula_duration: f64,
    /// Value passed to ffmpeg's `-loglevel`.
    pub log_level: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            mode: "line".to_string(),
            frames_per_second: 25,
            formula_sample_rate: 44_100,
            formula_duration: 10.0,
            log_level: "error".to_string(),
        }
    }
}

impl RenderOptions {
    /// Create options with default settings.
    ///
    /// Defaults: 1280×720, `line` mode, 25 fps, formulas evaluated at
    /// 44.1 kHz for 10 seconds, ffmpeg log level `error`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the video dimensions. Zero values are clamped to one.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    /// Set the `showwaves` drawing mode.
    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Set the video frame rate. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_frames_per_second(mut self, frames_per_second: u32) -> Self {
        self.frames_per_second = frames_per_second.max(1);
        self
    }

    /// Set the sampling rate used for formulas. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_formula_sample_rate(mut self, sample_rate: u32) -> Self {
        self.formula_sample_rate = sample_rate.max(1);
        self
    }

    /// Set how many seconds of audio a formula produces.
    #[must_use]
    pub fn with_formula_duration(mut self, seconds: f64) -> Self {
        self.formula_duration = seconds;
        self
    }

    /// Set ffmpeg's own log level (`quiet`, `error`, `warning`, `info`, ...).
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// The `WxH` form ffmpeg expects.
    pub fn size_argument(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// External programs used by the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOptions {
    /// The ffmpeg executable.
    pub ffmpeg: PathBuf,
    /// The media player used for review. It must block until closed.
    pub player: PathBuf,
    /// Extra arguments given to the player before the video path.
    pub player_args: Vec<OsString>,
    /// Program that evaluates a per-sample function directory.
    pub synthesizer: PathBuf,
    /// Arguments given to the synthesizer before `<dir> <total_time> <rate>`.
    pub synthesizer_args: Vec<OsString>,
}

impl Default for ToolOptions {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            player: PathBuf::from("mpv"),
            player_args: Vec::new(),
            synthesizer: PathBuf::from("python3"),
            synthesizer_args: vec![OsString::from(DEFAULT_SYNTHESIZER_SCRIPT)],
        }
    }
}

impl ToolOptions {
    /// Create options with default settings.
    ///
    /// Defaults: `ffmpeg`, `mpv`, and `python3 create_video.py`, all
    /// resolved through `PATH` / the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the ffmpeg executable.
    #[must_use]
    pub fn with_ffmpeg(mut self, program: impl Into<PathBuf>) -> Self {
        self.ffmpeg = program.into();
        self
    }

    /// Set the player executable.
    #[must_use]
    pub fn with_player(mut self, program: impl Into<PathBuf>) -> Self {
        self.player = program.into();
        self
    }

    /// Set arguments passed to the player before the video path.
    #[must_use]
    pub fn with_player_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.player_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the synthesizer program and its leading arguments.
    #[must_use]
    pub fn with_synthesizer<I, S>(mut self, program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.synthesizer = program.into();
        self.synthesizer_args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;

    use super::{RenderOptions, ToolOptions};

    #[test]
    fn render_defaults() {
        let options = RenderOptions::new();
        assert_eq!(options.size_argument(), "1280x720");
        assert_eq!(options.mode, "line");
        assert_eq!(options.formula_sample_rate, 44_100);
    }

    #[test]
    fn render_builders_clamp_zero() {
        let options = RenderOptions::new()
            .with_size(0, 0)
            .with_frames_per_second(0)
            .with_formula_sample_rate(0);
        assert_eq!(options.size_argument(), "1x1");
        assert_eq!(options.frames_per_second, 1);
        assert_eq!(options.formula_sample_rate, 1);
    }

    #[test]
    fn tool_defaults() {
        let tools = ToolOptions::new();
        assert_eq!(tools.ffmpeg.to_str(), Some("ffmpeg"));
        assert_eq!(tools.player.to_str(), Some("mpv"));
        assert_eq!(tools.synthesizer.to_str(), Some("python3"));
        assert_eq!(tools.synthesizer_args, vec![OsString::from("create_video.py")]);
    }
}
