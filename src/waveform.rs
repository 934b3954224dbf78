//! Raw audio summaries.
//!
//! This module provides [`WaveformData`] for looking at a synthesized
//! `audio.raw` without plotting it: samples are bucketed into a
//! configurable number of bins, with min/max/RMS values per bin.
//!
//! # Example
//!
//! ```no_run
//! use wavelab::waveform::RawAudio;
//!
//! let raw = RawAudio::load("wave002")?;
//! let summary = raw.summarize(80);
//! for bin in &summary.bins {
//!     println!("{:+.3} {:+.3} {:.3}", bin.min, bin.max, bin.rms);
//! }
//! # Ok::<(), wavelab::WavelabError>(())
//! ```

use std::path::Path;
use std::time::Duration;

use crate::config::{RAW_AUDIO_FILE, TIME_AXIS_FILE};
use crate::error::WavelabError;
use crate::synth::read_f32_file;

/// A single waveform bin containing amplitude statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformBin {
    /// Minimum sample value in this bin.
    pub min: f32,
    /// Maximum sample value in this bin.
    pub max: f32,
    /// Root-mean-square amplitude for this bin.
    pub rms: f32,
}

/// Binned summary of a raw sample stream.
#[derive(Debug, Clone)]
pub struct WaveformData {
    /// One entry per bin.
    pub bins: Vec<WaveformBin>,
    /// Total number of samples summarized.
    pub total_samples: u64,
    /// Signal duration, when the sampling rate is known.
    pub duration: Option<Duration>,
    /// Sampling rate, when known.
    pub sample_rate: Option<u32>,
    /// Number of non-finite samples (NaN or infinite) that were skipped.
    pub non_finite_samples: u64,
}

/// Bucket `samples` into `bins` bins and compute min/max/RMS per bin.
///
/// Every bin but the last holds `ceil(len / bins)` samples; the result is
/// padded with zero bins so it always has exactly `bins` entries (at least
/// one). Non-finite samples are skipped and counted.
pub fn summarize(samples: &[f32], bins: usize) -> WaveformData {
    let num_bins = bins.max(1);
    let samples_per_bin = samples.len().div_ceil(num_bins).max(1);
    let mut non_finite_samples = 0_u64;

    let mut result = Vec::with_capacity(num_bins);
    for chunk in samples.chunks(samples_per_bin) {
        let mut min_val = f32::INFINITY;
        let mut max_val = f32::NEG_INFINITY;
        let mut sum_sq = 0.0_f64;
        let mut counted = 0_usize;

        for &s in chunk {
            if !s.is_finite() {
                non_finite_samples += 1;
                continue;
            }
            min_val = min_val.min(s);
            max_val = max_val.max(s);
            sum_sq += f64::from(s) * f64::from(s);
            counted += 1;
        }

        result.push(if counted == 0 {
            WaveformBin {
                min: 0.0,
                max: 0.0,
                rms: 0.0,
            }
        } else {
            WaveformBin {
                min: min_val,
                max: max_val,
                rms: (sum_sq / counted as f64).sqrt() as f32,
            }
        });
    }

    // Pad to exactly num_bins if the last chunks were short.
    result.resize(
        num_bins,
        WaveformBin {
            min: 0.0,
            max: 0.0,
            rms: 0.0,
        },
    );

    WaveformData {
        bins: result,
        total_samples: samples.len() as u64,
        duration: None,
        sample_rate: None,
        non_finite_samples,
    }
}

/// The raw streams of a synthesized directory.
#[derive(Debug, Clone)]
pub struct RawAudio {
    /// Samples from `audio.raw`.
    pub samples: Vec<f32>,
    /// Times from `time_axis`, if the file exists.
    pub time_axis: Option<Vec<f32>>,
}

impl RawAudio {
    /// Read `audio.raw` and, when present, `time_axis` from `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`WavelabError::MissingArtifact`] if `audio.raw` does not
    /// exist, and [`WavelabError::InvalidRawData`] if either file is not a
    /// whole number of `f32` values.
    pub fn load<P: AsRef<Path>>(directory: P) -> Result<Self, WavelabError> {
        let directory = directory.as_ref();
        let audio_path = directory.join(RAW_AUDIO_FILE);
        if !audio_path.is_file() {
            return Err(WavelabError::MissingArtifact(audio_path));
        }
        let samples = read_f32_file(&audio_path)?;

        let time_path = directory.join(TIME_AXIS_FILE);
        let time_axis = if time_path.is_file() {
            Some(read_f32_file(&time_path)?)
        } else {
            None
        };

        Ok(Self { samples, time_axis })
    }

    /// Sampling rate inferred from the first step of the time axis.
    pub fn inferred_sample_rate(&self) -> Option<u32> {
        let axis = self.time_axis.as_ref()?;
        let step = f64::from(*axis.get(1)?) - f64::from(*axis.first()?);
        if step > 0.0 {
            Some((1.0 / step).round() as u32)
        } else {
            None
        }
    }

    /// Summarize the samples; `sample_rate` overrides the inferred rate.
    pub fn summarize_with_rate(&self, bins: usize, sample_rate: Option<u32>) -> WaveformData {
        let mut data = summarize(&self.samples, bins);
        let rate = sample_rate
            .or_else(|| self.inferred_sample_rate())
            .filter(|&rate| rate > 0);
        data.sample_rate = rate;
        data.duration = rate
            .map(|rate| Duration::from_secs_f64(self.samples.len() as f64 / f64::from(rate)));
        data
    }

    /// Summarize the samples using the inferred sampling rate.
    pub fn summarize(&self, bins: usize) -> WaveformData {
        self.summarize_with_rate(bins, None)
    }
}
