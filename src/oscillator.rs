//! Oscillator helpers and note names.
//!
//! Small building blocks for per-sample functions: periodic waves evaluated
//! at a time and frequency, a few numerically forgiving arithmetic helpers,
//! conversion from note names such as `A4` or `D#4+53.5` to hertz, and
//! scale walking on top of semitone intervals.
//! [`Waveform`] bundles the periodic waves into the presets offered by the
//! `preset` command.

use std::f64::consts::PI;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::WavelabError;

/// Reference pitch of `A4`, in hertz.
pub const A4_FREQUENCY: f64 = 440.0;

/// Sine sample at time `t` (seconds) and frequency `f` (hertz).
pub fn sin(t: f64, f: f64) -> f64 {
    (2.0 * PI * f * t).sin()
}

/// Cosine sample at time `t` and frequency `f`.
pub fn cos(t: f64, f: f64) -> f64 {
    (2.0 * PI * f * t).cos()
}

/// Square wave: `+1` while the sine is non-negative, `-1` otherwise.
pub fn square(t: f64, f: f64) -> f64 {
    if sin(t, f) >= 0.0 { 1.0 } else { -1.0 }
}

/// Rising sawtooth in `[-1, 1)`.
pub fn sawtooth(t: f64, f: f64) -> f64 {
    (2.0 * f * t).rem_euclid(2.0) - 1.0
}

/// Division that never panics and never traps.
///
/// `x / 0` is `+inf` for positive `x`, `-inf` for negative `x`, and NaN
/// for zero.
pub fn safe_division(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        if numerator > 0.0 {
            f64::INFINITY
        } else if numerator < 0.0 {
            f64::NEG_INFINITY
        } else {
            f64::NAN
        }
    } else {
        numerator / denominator
    }
}

/// `sin(t, f1) / cos(t, f2)`; `f2` defaults to `f1`.
pub fn tan(t: f64, f1: f64, f2: Option<f64>) -> f64 {
    safe_division(sin(t, f1), cos(t, f2.unwrap_or(f1)))
}

/// Clamp into `[-1, 1]`, mapping NaN to `0`.
pub fn sanitize(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(-1.0, 1.0) }
}

/// Floored remainder of `a` by `b`: the result takes the sign of `b`, and
/// is `0` when `b` is zero.
pub fn modulo(a: f64, b: f64) -> f64 {
    if b == 0.0 { 0.0 } else { a - b * (a / b).floor() }
}

/// The frequency `semitones` away from `base` (fractional and negative
/// intervals allowed).
pub fn frequency_from_interval(base: f64, semitones: f64) -> f64 {
    base * 2f64.powf(semitones / 12.0)
}

/// The `degree`-th note of `scale` in the key of `base`.
///
/// `scale` lists semitone offsets from the key, e.g. `[0, 2, 4, 5, 7, 9, 11]`
/// for a major scale. Returns `None` when `degree` is past its end.
pub fn frequency_from_scale_degree(degree: usize, base: f64, scale: &[f64]) -> Option<f64> {
    scale
        .get(degree)
        .map(|&semitones| frequency_from_interval(base, semitones))
}

/// Walk `scale` over and over, moving to the next degree every `step`
/// seconds.
///
/// Returns `None` for an empty scale or a step that is not a positive
/// number.
///
/// # Example
///
/// ```
/// use wavelab::oscillator::frequency_from_repeating_scale;
///
/// let scale = [0.0, 12.0];
/// assert_eq!(frequency_from_repeating_scale(0.1, 0.5, 220.0, &scale), Some(220.0));
/// assert_eq!(frequency_from_repeating_scale(0.6, 0.5, 220.0, &scale), Some(440.0));
/// assert_eq!(frequency_from_repeating_scale(1.1, 0.5, 220.0, &scale), Some(220.0));
/// ```
pub fn frequency_from_repeating_scale(
    t: f64,
    step: f64,
    base: f64,
    scale: &[f64],
) -> Option<f64> {
    if scale.is_empty() || !step.is_finite() || step <= 0.0 {
        return None;
    }
    let degree = ((t / step).floor() as i64).rem_euclid(scale.len() as i64) as usize;
    frequency_from_scale_degree(degree, base, scale)
}

/// Semitone offset of a note name from `A` within the same octave.
fn semitones_from_a(name: &str) -> Option<i32> {
    let offset = match name {
        "C" => -9,
        "C#" | "Db" => -8,
        "D" => -7,
        "D#" | "Eb" => -6,
        "E" => -5,
        "F" => -4,
        "F#" | "Gb" => -3,
        "G" => -2,
        "G#" | "Ab" => -1,
        "A" => 0,
        "A#" | "Bb" => 1,
        "B" => 2,
        _ => return None,
    };
    Some(offset)
}

/// Convert a note name to hertz, with `A4` at 440 Hz.
///
/// The format is `<name><octave>[<cents>]`: a letter `C`..`B`, an optional
/// `#` or `b`, an integer octave, and optional signed cents (which may be
/// fractional), e.g. `A4`, `Gb6-87`, `D#4+53.5`.
///
/// # Example
///
/// ```
/// let a5 = wavelab::oscillator::note_frequency("A5").unwrap();
/// assert!((a5 - 880.0).abs() < 1e-9);
/// ```
pub fn note_frequency(note: &str) -> Result<f64, WavelabError> {
    let invalid = || WavelabError::InvalidNote(note.to_string());
    let note = note.trim();

    let name_length = match note.as_bytes().get(1) {
        Some(b'#') | Some(b'b') => 2,
        _ => 1,
    };
    let name = note.get(..name_length).ok_or_else(invalid)?;
    let semitones = semitones_from_a(name).ok_or_else(invalid)?;

    let rest = &note[name_length..];
    // The octave may itself be negative, so the cents sign is searched
    // after its first character.
    let cents_start = rest
        .get(1..)
        .and_then(|tail| tail.find(['+', '-']))
        .map(|index| index + 1);
    let (octave, cents) = match cents_start {
        Some(index) => (&rest[..index], Some(&rest[index..])),
        None => (rest, None),
    };
    let octave: i32 = octave.parse().map_err(|_| invalid())?;
    let cents: f64 = match cents {
        Some(cents) => cents.parse().map_err(|_| invalid())?,
        None => 0.0,
    };

    let exponent = f64::from(octave - 4) + f64::from(semitones) / 12.0 + cents / 1200.0;
    Ok(A4_FREQUENCY * 2f64.powf(exponent))
}

/// Built-in periodic waveforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    /// Pure sine.
    Sine,
    /// Square wave.
    Square,
    /// Rising sawtooth.
    Sawtooth,
    /// Sine over cosine, clamped into `[-1, 1]`.
    Tangent,
}

impl Waveform {
    /// Evaluate the waveform at time `t` for frequency `frequency`.
    pub fn sample(self, t: f64, frequency: f64) -> f64 {
        match self {
            Waveform::Sine => sin(t, frequency),
            Waveform::Square => square(t, frequency),
            Waveform::Sawtooth => sawtooth(t, frequency),
            Waveform::Tangent => sanitize(tan(t, frequency, None)),
        }
    }
}

impl Display for Waveform {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Tangent => "tangent",
        };
        f.write_str(name)
    }
}

impl FromStr for Waveform {
    type Err = WavelabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "sine" | "sin" => Ok(Waveform::Sine),
            "square" | "sq" => Ok(Waveform::Square),
            "sawtooth" | "saw" => Ok(Waveform::Sawtooth),
            "tangent" | "tan" => Ok(Waveform::Tangent),
            _ => Err(WavelabError::InvalidArgument(format!(
                "unknown waveform: {value} (expected sine, square, sawtooth or tangent)"
            ))),
        }
    }
}
