//! Scores: which note to play at each sample.
//!
//! A [`Score`] is asked for a frequency once per sample and keeps track of
//! how long the current note has left. [`PresetScore`] plays a fixed list
//! of [`Note`]s and then falls silent; [`ScaleRandomPlayer`] improvises on
//! a scale with a seeded random number generator.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

use crate::{
    error::WavelabError,
    oscillator::{frequency_from_interval, note_frequency},
};

/// A pitch held for a duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    /// Frequency in hertz.
    pub frequency: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl Note {
    /// A note at `frequency` hertz.
    pub fn new(frequency: f64, duration: f64) -> Self {
        Self {
            frequency,
            duration,
        }
    }

    /// A note given by name, such as `A4` or `Gb6-87`.
    ///
    /// # Errors
    ///
    /// Returns [`WavelabError::InvalidNote`] if the name cannot be parsed.
    pub fn named(name: &str, duration: f64) -> Result<Self, WavelabError> {
        Ok(Self::new(note_frequency(name)?, duration))
    }
}

/// Decides the frequency of every sample.
pub trait Score {
    /// Frequency for the next sample, then advance by `dt` seconds.
    fn next_frequency(&mut self, dt: f64) -> f64;
}

/// Plays a list of notes once, then returns `0.0` (silence).
///
/// A note is held until its remaining time drops below zero, so at a
/// sampling rate `fs` it lasts `duration * fs + 1` samples.
///
/// # Example
///
/// ```
/// use wavelab::score::{Note, PresetScore, Score};
///
/// let mut score = PresetScore::new([Note::named("A4", 0.5)?, Note::named("A5", 0.5)?]);
/// assert_eq!(score.next_frequency(0.25), 440.0);
/// # Ok::<(), wavelab::WavelabError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PresetScore {
    notes: VecDeque<Note>,
    current: f64,
    remaining: f64,
    ended: bool,
}

impl PresetScore {
    /// Queue `notes` in order.
    pub fn new(notes: impl IntoIterator<Item = Note>) -> Self {
        Self {
            notes: notes.into_iter().collect(),
            current: 0.0,
            remaining: -1.0,
            ended: false,
        }
    }

    /// Whether the last note has finished.
    pub fn is_finished(&self) -> bool {
        self.ended
    }
}

impl Score for PresetScore {
    fn next_frequency(&mut self, dt: f64) -> f64 {
        if self.remaining < 0.0 {
            match self.notes.pop_front() {
                Some(note) => {
                    self.current = note.frequency;
                    self.remaining = note.duration;
                }
                None => {
                    self.ended = true;
                    return 0.0;
                }
            }
        }
        self.remaining -= dt;
        self.current
    }
}

/// Picks random notes from a scale, each held for a random duration.
///
/// # Example
///
/// ```
/// use wavelab::score::{ScaleRandomPlayer, Score};
///
/// let pentatonic = [0.0, 2.0, 4.0, 7.0, 9.0];
/// let mut player = ScaleRandomPlayer::new(&pentatonic, 220.0, Some(7))?;
/// let frequency = player.next_frequency(1.0 / 44_100.0);
/// assert!(frequency >= 220.0 && frequency < 440.0);
/// # Ok::<(), wavelab::WavelabError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ScaleRandomPlayer {
    rng: StdRng,
    scale: Vec<f64>,
    base: f64,
    min_duration: f64,
    max_duration: f64,
    remaining: Option<f64>,
    current: f64,
}

impl ScaleRandomPlayer {
    /// Default shortest note, in seconds.
    pub const DEFAULT_MIN_DURATION: f64 = 0.04;
    /// Default longest note, in seconds.
    pub const DEFAULT_MAX_DURATION: f64 = 2.0;

    /// Improvise on `scale` (semitone offsets) in the key of `base` hertz.
    ///
    /// The same `seed` always yields the same melody; `None` seeds from the
    /// operating system.
    ///
    /// # Errors
    ///
    /// Returns [`WavelabError::InvalidArgument`] for an empty scale.
    pub fn new(scale: &[f64], base: f64, seed: Option<u64>) -> Result<Self, WavelabError> {
        if scale.is_empty() {
            return Err(WavelabError::InvalidArgument(
                "a scale needs at least one interval".to_string(),
            ));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            rng,
            scale: scale.to_vec(),
            base,
            min_duration: Self::DEFAULT_MIN_DURATION,
            max_duration: Self::DEFAULT_MAX_DURATION,
            remaining: None,
            current: base,
        })
    }

    /// Bound the duration of the notes to come.
    ///
    /// # Errors
    ///
    /// Returns [`WavelabError::InvalidArgument`] unless
    /// `0 <= min <= max` and both are finite.
    pub fn with_note_durations(mut self, min: f64, max: f64) -> Result<Self, WavelabError> {
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
            return Err(WavelabError::InvalidArgument(format!(
                "note durations must satisfy 0 <= min <= max, got {min} and {max}"
            )));
        }
        self.min_duration = min;
        self.max_duration = max;
        Ok(self)
    }

    /// Change key; applies from the next note on.
    pub fn set_base(&mut self, base: f64) {
        self.base = base;
    }
}

impl Score for ScaleRandomPlayer {
    fn next_frequency(&mut self, dt: f64) -> f64 {
        if self.remaining.is_none_or(|remaining| remaining < 0.0) {
            let duration = self.rng.gen_range(self.min_duration..=self.max_duration);
            let semitones = self.scale.choose(&mut self.rng).copied().unwrap_or(0.0);
            self.current = frequency_from_interval(self.base, semitones);
            self.remaining = Some(duration);
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= dt;
        }
        self.current
    }
}
