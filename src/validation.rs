//! Checks on rendered videos.
//!
//! [`validate_metadata`] looks for structural problems (no picture, zero
//! dimensions, silent audio track); [`validate_render`] additionally
//! compares the file against the [`RenderOptions`] it was rendered with.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use wavelab::metadata::ArtifactMetadata;
//! use wavelab::validation::validate_metadata;
//!
//! let metadata = ArtifactMetadata {
//!     video: None,
//!     audio: None,
//!     duration: Duration::ZERO,
//!     format: "mp4".to_string(),
//! };
//! let report = validate_metadata(&metadata);
//! assert!(!report.is_valid());
//! ```

use std::fmt::{self, Display, Formatter};

use crate::{config::RenderOptions, metadata::ArtifactMetadata};

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// A description of the file, not a problem.
    Info,
    /// Reviewable, but not what was asked for.
    Warning,
    /// The file cannot be reviewed as a waveform video.
    Error,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARN",
            Severity::Error => "ERROR",
        })
    }
}

/// One observation about a rendered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// How serious it is.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

/// Findings collected by a validation pass, in the order they were made.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    findings: Vec<Finding>,
}

impl ValidationReport {
    fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.findings.push(Finding {
            severity,
            message: message.into(),
        });
    }

    /// Every finding.
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Messages of the findings with the given severity.
    pub fn messages(&self, severity: Severity) -> impl Iterator<Item = &str> {
        self.findings
            .iter()
            .filter(move |finding| finding.severity == severity)
            .map(|finding| finding.message.as_str())
    }

    /// The most serious severity present, if any.
    pub fn worst(&self) -> Option<Severity> {
        self.findings.iter().map(|finding| finding.severity).max()
    }

    /// `true` unless an error was found. Warnings do not count.
    pub fn is_valid(&self) -> bool {
        self.worst() != Some(Severity::Error)
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.findings.is_empty() {
            return writeln!(f, "No issues found.");
        }
        for finding in &self.findings {
            writeln!(f, "[{}] {}", finding.severity, finding.message)?;
        }
        Ok(())
    }
}

/// Structural checks that apply to any waveform video.
pub fn validate_metadata(metadata: &ArtifactMetadata) -> ValidationReport {
    let mut report = ValidationReport::default();

    match &metadata.video {
        Some(video) => {
            report.push(
                Severity::Info,
                format!(
                    "Video: {} {}x{} @ {:.2} fps",
                    video.codec, video.width, video.height, video.frames_per_second
                ),
            );
            if video.width == 0 || video.height == 0 {
                report.push(
                    Severity::Error,
                    format!("Video has no picture area ({}x{})", video.width, video.height),
                );
            }
            if video.frames_per_second <= 0.0 {
                report.push(Severity::Warning, "Video frame rate is unknown");
            }
        }
        None => report.push(Severity::Error, "No video stream; nothing to watch"),
    }

    match &metadata.audio {
        Some(audio) => {
            report.push(
                Severity::Info,
                format!(
                    "Audio: {} {} Hz, {} channel(s)",
                    audio.codec, audio.sample_rate, audio.channels
                ),
            );
            if audio.sample_rate == 0 {
                report.push(Severity::Error, "Audio sample rate is zero");
            }
        }
        None => report.push(Severity::Warning, "No audio stream; playback will be silent"),
    }

    report.push(
        Severity::Info,
        format!(
            "Duration: {:.3}s ({})",
            metadata.duration.as_secs_f64(),
            metadata.format
        ),
    );
    if metadata.duration.is_zero() {
        report.push(Severity::Warning, "Duration is zero");
    }

    report
}

/// [`validate_metadata`] plus a comparison with the requested picture size
/// and frame rate.
pub fn validate_render(metadata: &ArtifactMetadata, options: &RenderOptions) -> ValidationReport {
    let mut report = validate_metadata(metadata);

    if let Some(video) = &metadata.video {
        if (video.width, video.height) != (options.width, options.height) {
            report.push(
                Severity::Warning,
                format!(
                    "Rendered at {}x{}, requested {}",
                    video.width,
                    video.height,
                    options.size_argument()
                ),
            );
        }
        let requested = f64::from(options.frames_per_second);
        if video.frames_per_second > 0.0 && (video.frames_per_second - requested).abs() > 0.01 {
            report.push(
                Severity::Warning,
                format!(
                    "Rendered at {:.2} fps, requested {}",
                    video.frames_per_second, options.frames_per_second
                ),
            );
        }
    }

    report
}
