//! # wavelab
//!
//! Turn formulas and per-sample functions into waveform videos, watch them,
//! and keep or discard the result.
//!
//! Rendering is done by the `ffmpeg` executable (`aevalsrc` for formulas,
//! raw `f32le` input for synthesized samples, `showwaves` for the picture);
//! playback by an external player such as `mpv`. `wavelab` owns the parts
//! around them: numbered output directories, raw sample synthesis, and the
//! keep-or-discard review.
//!
//! ## Quick Start
//!
//! ### Render a formula
//!
//! ```no_run
//! use std::io::{self, BufReader};
//! use std::path::Path;
//!
//! use wavelab::{Reviewer, SystemTools, Workflow};
//!
//! let workflow = Workflow::new(SystemTools::default());
//! let mut reviewer = Reviewer::new(BufReader::new(io::stdin()), io::stdout(), io::stderr());
//! let outcome = workflow.run_formula(Path::new("."), "sin(2*PI*440*t)", &mut reviewer)?;
//! println!("{:?} {}", outcome.decision, outcome.directory.display());
//! # Ok::<(), wavelab::WavelabError>(())
//! ```
//!
//! ### Synthesize samples in Rust
//!
//! ```no_run
//! use wavelab::{FunctionSynthesizer, SynthesisParams, Synthesizer, oscillator};
//!
//! let directory = wavelab::allocate_next_directory(".")?;
//! let synthesizer = FunctionSynthesizer::new(|clock| oscillator::square(clock.t, 110.0) as f32);
//! synthesizer.synthesize(directory.path(), &SynthesisParams::new(1.5, 22_050)?)?;
//! # Ok::<(), wavelab::WavelabError>(())
//! ```
//!
//! ### Play a melody
//!
//! Closures may carry state, so a [`Score`] can pick the notes and a
//! [`Player`] shapes each one with an [`Adsr`] envelope:
//!
//! ```no_run
//! use wavelab::{
//!     Adsr, FunctionSynthesizer, Instrument, Note, Player, PresetScore, Score, SynthesisParams,
//!     Synthesizer,
//! };
//!
//! let params = SynthesisParams::new(2.0, 44_100)?;
//! let dt = 1.0 / 44_100.0;
//! let mut score = PresetScore::new([Note::named("C4", 0.5)?, Note::named("E4", 0.5)?]);
//! let mut player = Player::new(Instrument::pure(), Adsr::new(0.01, 0.1, 0.7, 0.2)?, 0.4);
//! let synthesizer = FunctionSynthesizer::new(move |clock| {
//!     let frequency = score.next_frequency(dt);
//!     player.sample(clock.t, frequency, dt) as f32
//! });
//! synthesizer.synthesize("wave004".as_ref(), &params)?;
//! # Ok::<(), wavelab::WavelabError>(())
//! ```
//!
//! ## Output layout
//!
//! ```text
//! wave001/
//!   description.txt   formula or preset description
//!   video.mp4         rendered waveform video
//!   audio.raw         f32le samples (only when kept)
//!   time_axis         f32le sample times (only when kept)
//! ```
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `probe` | Inspect rendered videos through `ffmpeg-next` and log a validation report |
//! | `full` | Enables all of the above |

pub mod config;
pub mod envelope;
pub mod error;
pub mod instrument;
pub mod metadata;
pub mod oscillator;
#[cfg(feature = "probe")]
pub mod probe;
pub mod progress;
pub mod render;
pub mod review;
pub mod score;
pub mod synth;
pub mod validation;
pub mod versioning;
pub mod waveform;
pub mod workflow;

pub use config::{RenderOptions, ToolOptions};
pub use envelope::{Adsr, Envelope};
pub use error::WavelabError;
pub use instrument::{Instrument, Player, Sampler};
pub use metadata::{ArtifactMetadata, AudioMetadata, VideoMetadata};
pub use oscillator::Waveform;
pub use progress::{ProgressCallback, ProgressInfo};
pub use render::{MediaTools, SystemTools};
pub use review::{Decision, ReviewState, Reviewer};
pub use score::{Note, PresetScore, ScaleRandomPlayer, Score};
pub use synth::{
    ExternalSynthesizer, FunctionSynthesizer, SampleClock, SynthesisOutput, SynthesisParams,
    Synthesizer,
};
pub use validation::{Finding, Severity, ValidationReport};
pub use versioning::{VersionScheme, VersionedDirectory, allocate_next_directory};
pub use waveform::{RawAudio, WaveformBin, WaveformData};
pub use workflow::{FunctionRequest, Outcome, PresetRequest, Workflow};
