//! Error types for the `wavelab` crate.
//!
//! This module defines [`WavelabError`], the unified error type returned by
//! all fallible operations in the crate. Errors carry the paths and tool
//! names needed to tell the user which artifact or subprocess went wrong.

use std::{io::Error as IoError, path::PathBuf, process::ExitStatus};

use thiserror::Error;

/// The unified error type for all `wavelab` operations.
///
/// Every public method that can fail returns `Result<T, WavelabError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WavelabError {
    /// A versioned output directory could not be created.
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// The directory that was being created.
        path: PathBuf,
        /// Underlying I/O failure (permissions, collision with a concurrent run).
        source: IoError,
    },

    /// An external program could not be started at all.
    #[error("Failed to launch {tool}: {reason}")]
    ToolLaunch {
        /// Program name as it was invoked.
        tool: String,
        /// Why the launch failed.
        reason: String,
    },

    /// An external program ran but exited unsuccessfully.
    #[error("{tool} exited unsuccessfully ({status})")]
    ToolFailed {
        /// Program name as it was invoked.
        tool: String,
        /// The exit status reported by the operating system.
        status: ExitStatus,
    },

    /// An artifact that a previous step should have produced is absent.
    #[error("Expected artifact is missing: {0}")]
    MissingArtifact(PathBuf),

    /// A caller-supplied value is out of its valid domain.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A note name could not be parsed (e.g. `H4` or `A`).
    #[error("Invalid note: {0}")]
    InvalidNote(String),

    /// A raw sample file does not hold a whole number of `f32` values.
    #[error("Raw data at {path} has length {length}, which is not a multiple of 4 bytes")]
    InvalidRawData {
        /// The raw file that was read.
        path: PathBuf,
        /// Its length in bytes.
        length: u64,
    },

    /// Interactive input ended before a valid answer was given.
    #[error("Input closed before a valid answer was given")]
    InputClosed,

    /// The media file could not be opened for inspection.
    #[cfg(feature = "probe")]
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::probe::probe_video`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// An error originating from the FFmpeg libraries.
    #[cfg(feature = "probe")]
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

#[cfg(feature = "probe")]
impl From<ffmpeg_next::Error> for WavelabError {
    fn from(error: ffmpeg_next::Error) -> Self {
        WavelabError::FfmpegError(error.to_string())
    }
}
