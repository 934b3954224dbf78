//! Rendered artifact metadata types.
//!
//! Filled in by [`probe_video`](crate::probe::probe_video) (feature
//! `probe`) and checked by
//! [`validate_metadata`](crate::validation::validate_metadata).

use std::time::Duration;

/// Metadata for a rendered waveform video.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct ArtifactMetadata {
    /// Video stream metadata, if a video stream is present.
    pub video: Option<VideoMetadata>,
    /// Audio stream metadata, if an audio stream is present.
    pub audio: Option<AudioMetadata>,
    /// Total duration of the file.
    pub duration: Duration,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
}

/// Metadata for the video stream.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub frames_per_second: f64,
    /// Codec name (e.g. `"h264"`).
    pub codec: String,
}

/// Metadata for the audio stream.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct AudioMetadata {
    /// Sample rate in hertz.
    pub sample_rate: u32,
    /// Number of audio channels.
    pub channels: u16,
    /// Codec name (e.g. `"aac"`).
    pub codec: String,
}
