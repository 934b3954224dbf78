//! Instruments and players for per-sample functions.
//!
//! A [`Sampler`] turns a time, a note frequency and a volume into a sample.
//! [`Instrument`] does so with a fixed timbre, a sum of sines at multiples
//! of the note frequency. A [`Player`] drives a sampler through an
//! [`Envelope`], striking the note again every `press_time` seconds.
//!
//! # Example
//!
//! ```
//! use wavelab::envelope::Adsr;
//! use wavelab::instrument::{Instrument, Player};
//! use wavelab::{FunctionSynthesizer, SynthesisParams, Synthesizer};
//!
//! let organ = Instrument::new(&[1.0, 2.0, 3.0], &[0.6, 0.3, 0.1])?;
//! let mut player = Player::new(organ, Adsr::new(0.02, 0.1, 0.6, 0.3)?, 0.5);
//! let dt = 1.0 / 8000.0;
//! let synthesizer = FunctionSynthesizer::new(move |clock| {
//!     player.sample(clock.t, 220.0, dt) as f32
//! });
//! # let directory = tempfile::tempdir()?;
//! synthesizer.synthesize(directory.path(), &SynthesisParams::new(0.1, 8000)?)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::{envelope::Envelope, error::WavelabError, oscillator, oscillator::Waveform};

/// Produces a sample for a note.
pub trait Sampler {
    /// The sample at time `t` for a note at `frequency`, scaled by `volume`.
    fn sample_at(&self, t: f64, frequency: f64, volume: f64) -> f64;
}

impl Sampler for Waveform {
    fn sample_at(&self, t: f64, frequency: f64, volume: f64) -> f64 {
        volume * self.sample(t, frequency)
    }
}

/// One sine component of an [`Instrument`]'s timbre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partial {
    /// Multiple of the note frequency.
    pub ratio: f64,
    /// Weight of this component.
    pub amplitude: f64,
}

/// A timbre made of sine partials.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    partials: Vec<Partial>,
}

impl Instrument {
    /// Pair up frequency ratios with their amplitudes.
    ///
    /// # Errors
    ///
    /// Returns [`WavelabError::InvalidArgument`] if the two slices differ in
    /// length.
    pub fn new(ratios: &[f64], amplitudes: &[f64]) -> Result<Self, WavelabError> {
        if ratios.len() != amplitudes.len() {
            return Err(WavelabError::InvalidArgument(format!(
                "an instrument needs one amplitude per frequency ratio, got {} ratios and {} amplitudes",
                ratios.len(),
                amplitudes.len()
            )));
        }
        let partials = ratios
            .iter()
            .zip(amplitudes)
            .map(|(&ratio, &amplitude)| Partial { ratio, amplitude })
            .collect();
        Ok(Self { partials })
    }

    /// A single sine at the note frequency.
    pub fn pure() -> Self {
        Self {
            partials: vec![Partial {
                ratio: 1.0,
                amplitude: 1.0,
            }],
        }
    }

    /// The partials, in the order given.
    pub fn partials(&self) -> &[Partial] {
        &self.partials
    }
}

impl Sampler for Instrument {
    fn sample_at(&self, t: f64, frequency: f64, volume: f64) -> f64 {
        let sum: f64 = self
            .partials
            .iter()
            .map(|partial| partial.amplitude * oscillator::sin(t, frequency * partial.ratio))
            .sum();
        volume * sum
    }
}

/// Plays a sampler through an envelope.
///
/// The note is struck on the first sample and released after it has been
/// held for `press_time` seconds; the following sample strikes it again.
#[derive(Debug, Clone)]
pub struct Player<S, E> {
    sampler: S,
    envelope: E,
    press_time: f64,
    held: f64,
}

impl<S: Sampler, E: Envelope> Player<S, E> {
    /// Create a player holding each note for `press_time` seconds.
    pub fn new(sampler: S, envelope: E, press_time: f64) -> Self {
        Self {
            sampler,
            envelope,
            press_time,
            held: 0.0,
        }
    }

    /// The envelope being driven.
    pub fn envelope(&self) -> &E {
        &self.envelope
    }

    /// The next sample of a note at `frequency`; `dt` is the sample period.
    pub fn sample(&mut self, t: f64, frequency: f64, dt: f64) -> f64 {
        if !self.envelope.is_pressed() {
            self.envelope.press();
            self.held = 0.0;
        }
        self.held += dt;
        if self.held > self.press_time {
            self.held = 0.0;
            self.envelope.release();
        }
        let volume = self.envelope.amplitude(dt);
        self.sampler.sample_at(t, frequency, volume)
    }
}
