//! Amplitude envelopes.
//!
//! An [`Envelope`] is advanced once per sample with the sample period `dt`
//! and yields the volume to apply to that sample. [`Adsr`] is the classic
//! attack / decay / sustain / release shape:
//!
//! ```text
//!  1 ┤   /\
//!    │  /  \______
//!  S ┤ /          \
//!  0 ┼/            \____
//!     A  D   sustain  R
//! ```
//!
//! Attack and decay always run to completion; a release during either of
//! them takes effect once the sustain level is reached.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::WavelabError;

/// Something that shapes the volume of a note over time.
pub trait Envelope {
    /// Strike the note, restarting the envelope from silence.
    fn press(&mut self);

    /// Let go of the note.
    fn release(&mut self);

    /// Whether the note is currently held.
    fn is_pressed(&self) -> bool;

    /// Volume for the next sample, then advance by `dt` seconds.
    fn amplitude(&mut self, dt: f64) -> f64;
}

/// Where an [`Adsr`] currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdsrPhase {
    /// Not sounding.
    Idle,
    /// Rising from 0 to 1.
    Attack,
    /// Falling from 1 to the sustain level.
    Decay,
    /// Holding the sustain level while pressed.
    Sustain,
    /// Falling from the sustain level to 0.
    Release,
}

/// Linear attack / decay / sustain / release envelope.
///
/// # Example
///
/// ```
/// use wavelab::envelope::{Adsr, Envelope};
///
/// let mut envelope: Adsr = "0.01,0.1,0.7,0.2".parse()?;
/// envelope.press();
/// let volume = envelope.amplitude(1.0 / 44_100.0);
/// assert_eq!(volume, 0.0);
/// # Ok::<(), wavelab::WavelabError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Adsr {
    attack: f64,
    decay: f64,
    sustain: f64,
    release: f64,
    phase: AdsrPhase,
    elapsed: f64,
    pressed: bool,
}

impl Adsr {
    /// Create an idle envelope.
    ///
    /// `attack`, `decay` and `release` are durations in seconds; `sustain`
    /// is a level in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`WavelabError::InvalidArgument`] for negative or non-finite
    /// durations, or a sustain level outside `[0, 1]`.
    pub fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Result<Self, WavelabError> {
        for (name, seconds) in [("attack", attack), ("decay", decay), ("release", release)] {
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(WavelabError::InvalidArgument(format!(
                    "{name} must be a non-negative number of seconds, got {seconds}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&sustain) {
            return Err(WavelabError::InvalidArgument(format!(
                "sustain must be a level between 0 and 1, got {sustain}"
            )));
        }

        Ok(Self {
            attack,
            decay,
            sustain,
            release,
            phase: AdsrPhase::Idle,
            elapsed: 0.0,
            pressed: false,
        })
    }

    /// The current phase.
    pub fn phase(&self) -> AdsrPhase {
        self.phase
    }

    /// The sustain level.
    pub fn sustain(&self) -> f64 {
        self.sustain
    }
}

/// Share of a phase of `length` seconds that `elapsed` covers. Zero-length
/// phases count as complete.
fn completed(elapsed: f64, length: f64) -> f64 {
    if length > 0.0 { elapsed / length } else { 1.0 }
}

impl Envelope for Adsr {
    fn press(&mut self) {
        self.phase = AdsrPhase::Attack;
        self.elapsed = 0.0;
        self.pressed = true;
    }

    fn release(&mut self) {
        self.pressed = false;
    }

    fn is_pressed(&self) -> bool {
        self.pressed
    }

    fn amplitude(&mut self, dt: f64) -> f64 {
        let volume = match self.phase {
            AdsrPhase::Idle => return 0.0,
            AdsrPhase::Attack => {
                if self.elapsed > self.attack {
                    self.elapsed = 0.0;
                    self.phase = AdsrPhase::Decay;
                    return 1.0;
                }
                completed(self.elapsed, self.attack)
            }
            AdsrPhase::Decay => {
                if self.elapsed > self.decay {
                    self.elapsed = 0.0;
                    self.phase = AdsrPhase::Sustain;
                    return self.sustain;
                }
                1.0 - (1.0 - self.sustain) * completed(self.elapsed, self.decay)
            }
            AdsrPhase::Sustain => {
                if !self.pressed {
                    self.elapsed = 0.0;
                    self.phase = AdsrPhase::Release;
                }
                return self.sustain;
            }
            AdsrPhase::Release => {
                if self.elapsed > self.release {
                    self.elapsed = 0.0;
                    self.phase = AdsrPhase::Idle;
                    return 0.0;
                }
                self.sustain * (1.0 - completed(self.elapsed, self.release))
            }
        };
        self.elapsed += dt;
        volume
    }
}

impl Display for Adsr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.attack, self.decay, self.sustain, self.release
        )
    }
}

/// Parses `ATTACK,DECAY,SUSTAIN,RELEASE`, e.g. `0.01,0.1,0.7,0.2`.
impl FromStr for Adsr {
    type Err = WavelabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            WavelabError::InvalidArgument(format!(
                "invalid envelope {value:?} (expected ATTACK,DECAY,SUSTAIN,RELEASE)"
            ))
        };
        let parts = value
            .split(',')
            .map(|part| part.trim().parse::<f64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        match parts[..] {
            [attack, decay, sustain, release] => Adsr::new(attack, decay, sustain, release),
            _ => Err(invalid()),
        }
    }
}
