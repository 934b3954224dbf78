//! Progress reporting for in-process synthesis.
//!
//! [`ProgressCallback`] receives [`ProgressInfo`] snapshots while samples
//! are being generated. External tools report their own progress on their
//! own terminal output, so only in-process work goes through here.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use wavelab::{FunctionSynthesizer, ProgressCallback, ProgressInfo, SynthesisParams, Synthesizer};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!(
//!             "{:.2}s of {:.2}s ({:.0}%)",
//!             info.signal_time,
//!             info.total_time,
//!             info.fraction() * 100.0
//!         );
//!     }
//! }
//!
//! let synthesizer = FunctionSynthesizer::new(|clock| wavelab::oscillator::sin(clock.t, 440.0) as f32)
//!     .with_progress(Arc::new(PrintProgress));
//! synthesizer.synthesize("wave001".as_ref(), &SynthesisParams::new(2.0, 8000)?)?;
//! # Ok::<(), wavelab::WavelabError>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::synth::SynthesisParams;

/// A snapshot of a synthesis run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInfo {
    /// Samples written so far.
    pub samples_written: u64,
    /// Samples the run is expected to write.
    ///
    /// Accumulated time steps can make the real count one off, so
    /// `samples_written` may briefly exceed this.
    pub samples_expected: u64,
    /// Signal time of the last sample written, in seconds.
    pub signal_time: f64,
    /// Length of the signal being generated, in seconds.
    pub total_time: f64,
    /// Wall-clock time since synthesis started.
    pub elapsed: Duration,
    /// Projected wall-clock time until the last sample.
    pub estimated_remaining: Option<Duration>,
    /// Set on the single report sent after the last sample.
    pub finished: bool,
}

impl ProgressInfo {
    /// Completed share of the run in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.finished {
            return 1.0;
        }
        if self.samples_expected == 0 {
            return 0.0;
        }
        (self.samples_written as f64 / self.samples_expected as f64).min(1.0)
    }

    /// Samples generated per wall-clock second so far.
    pub fn samples_per_second(&self) -> Option<f64> {
        let seconds = self.elapsed.as_secs_f64();
        (seconds > 0.0).then(|| self.samples_written as f64 / seconds)
    }
}

/// Receives progress updates.
///
/// Callbacks observe the run; they cannot stop it.
pub trait ProgressCallback: Send + Sync {
    /// Called every batch of samples and once more when the run ends.
    fn on_progress(&self, info: &ProgressInfo);
}

pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Counts samples of one run and reports every `batch_size` of them.
pub(crate) struct SynthesisProgress {
    callback: Arc<dyn ProgressCallback>,
    samples_expected: u64,
    total_time: f64,
    batch_size: u64,
    samples_written: u64,
    started: Instant,
}

impl SynthesisProgress {
    pub(crate) fn start(
        callback: Arc<dyn ProgressCallback>,
        params: &SynthesisParams,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            samples_expected: params.expected_samples(),
            total_time: params.total_time(),
            batch_size: batch_size.max(1),
            samples_written: 0,
            started: Instant::now(),
        }
    }

    /// Count the sample written at `signal_time`.
    pub(crate) fn sample_written(&mut self, signal_time: f64) {
        self.samples_written += 1;
        if self.samples_written % self.batch_size == 0 {
            self.report(signal_time, false);
        }
    }

    pub(crate) fn finish(&self, signal_time: f64) {
        self.report(signal_time, true);
    }

    fn report(&self, signal_time: f64, finished: bool) {
        let elapsed = self.started.elapsed();
        let remaining_samples = self.samples_expected.saturating_sub(self.samples_written);
        let estimated_remaining = if finished {
            Some(Duration::ZERO)
        } else if self.samples_written > 0 {
            Some(elapsed.mul_f64(remaining_samples as f64 / self.samples_written as f64))
        } else {
            None
        };

        self.callback.on_progress(&ProgressInfo {
            samples_written: self.samples_written,
            samples_expected: self.samples_expected,
            signal_time,
            total_time: self.total_time,
            elapsed,
            estimated_remaining,
            finished,
        });
    }
}
