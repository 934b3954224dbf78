//! The render → play → review workflows.
//!
//! Three entry points share the same shape: produce a video, show it, and
//! ask whether to keep it.
//!
//! | Entry point | Output location | Raw files | On discard |
//! |-------------|-----------------|-----------|------------|
//! | [`Workflow::run_formula`] | new `waveNNN` directory | none | whole directory removed |
//! | [`Workflow::run_function`] | the function's own directory | removed unless kept | only the video removed |
//! | [`Workflow::run_preset`] | new `waveNNN` directory | removed unless kept | whole directory removed |
//!
//! If rendering fails the workflow stops before playback and nothing is
//! cleaned up; the error names the tool that failed and a warning names the
//! directory that was left behind.

use std::{
    fs,
    io::{BufRead, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    config::{DESCRIPTION_FILE, VIDEO_FILE},
    envelope::Adsr,
    error::WavelabError,
    instrument::Player,
    oscillator::Waveform,
    progress::{NoOpProgress, ProgressCallback},
    render::MediaTools,
    review::{Decision, Reviewer},
    synth::{FunctionSynthesizer, SampleClock, SynthesisParams, Synthesizer, remove_raw_files},
    versioning::{VersionScheme, VersionedDirectory},
};

/// Where a run left its result and what the user decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The directory the run worked in.
    pub directory: PathBuf,
    /// The rendered video (absent on disk after a discard).
    pub video: PathBuf,
    /// The review decision.
    pub decision: Decision,
}

/// A per-sample function directory to synthesize, render and review.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRequest {
    /// Directory holding the user's sample function.
    pub directory: PathBuf,
    /// Duration and sampling rate.
    pub params: SynthesisParams,
    /// Keep `audio.raw` and `time_axis` after rendering.
    pub keep_raw: bool,
}

/// A built-in waveform to synthesize, render and review.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetRequest {
    /// Which waveform to generate.
    pub waveform: Waveform,
    /// Its frequency in hertz.
    pub frequency: f64,
    /// Peak amplitude, clamped into `[0, 1]`.
    pub amplitude: f64,
    /// Optional volume envelope applied to the waveform.
    pub envelope: Option<Adsr>,
    /// How long each note is held before the envelope is released and
    /// struck again. Defaults to the whole signal.
    pub press_time: Option<f64>,
    /// Duration and sampling rate.
    pub params: SynthesisParams,
    /// Keep `audio.raw` and `time_axis` after rendering.
    pub keep_raw: bool,
}

impl PresetRequest {
    /// The text stored in the description file.
    pub fn description(&self) -> String {
        let mut description = format!(
            "preset {} at {} Hz, amplitude {}, {} s at {} Hz",
            self.waveform,
            self.frequency,
            self.amplitude.clamp(0.0, 1.0),
            self.params.total_time(),
            self.params.sampling_rate()
        );
        if let Some(envelope) = &self.envelope {
            description.push_str(&format!(
                ", envelope {envelope} pressed {} s",
                self.press_time()
            ));
        }
        description
    }

    /// Note hold time in seconds.
    pub fn press_time(&self) -> f64 {
        self.press_time.unwrap_or(self.params.total_time())
    }

    fn validate(&self) -> Result<(), WavelabError> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(WavelabError::InvalidArgument(format!(
                "frequency must be a positive number of hertz, got {}",
                self.frequency
            )));
        }
        if !self.amplitude.is_finite() {
            return Err(WavelabError::InvalidArgument(format!(
                "amplitude must be a finite number, got {}",
                self.amplitude
            )));
        }
        let press_time = self.press_time();
        if !press_time.is_finite() || press_time <= 0.0 {
            return Err(WavelabError::InvalidArgument(format!(
                "press time must be a positive number of seconds, got {press_time}"
            )));
        }
        Ok(())
    }
}

/// Runs the workflows against a set of [`MediaTools`].
pub struct Workflow<T> {
    tools: T,
    scheme: VersionScheme,
    progress: Arc<dyn ProgressCallback>,
}

impl<T: MediaTools> Workflow<T> {
    /// Create a workflow using the default `waveNNN` naming scheme.
    pub fn new(tools: T) -> Self {
        Self {
            tools,
            scheme: VersionScheme::default(),
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Use a different directory naming scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: VersionScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Attach a progress callback for in-process synthesis.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// The tools this workflow drives.
    pub fn tools(&self) -> &T {
        &self.tools
    }

    /// Render `formula` into the next versioned directory under `base`,
    /// play it, and review it.
    ///
    /// On discard the whole versioned directory is removed.
    pub fn run_formula<R: BufRead, W: Write, E: Write>(
        &self,
        base: &Path,
        formula: &str,
        reviewer: &mut Reviewer<R, W, E>,
    ) -> Result<Outcome, WavelabError> {
        if formula.trim().is_empty() {
            return Err(WavelabError::InvalidArgument(
                "formula must not be empty".to_string(),
            ));
        }

        let directory = self.scheme.allocate(base)?;
        log::info!("Writing into {}", directory.path().display());
        fs::write(directory.path().join(DESCRIPTION_FILE), format!("{formula}\n"))?;

        let video = directory.path().join(VIDEO_FILE);
        self.tools
            .render_formula(formula, &video)
            .inspect_err(|_| warn_left_behind(directory.path()))?;

        self.review_versioned(directory, video, reviewer)
    }

    /// Synthesize the sample function in `request.directory`, render it,
    /// play it, and review it.
    ///
    /// Raw files are removed after a successful render unless
    /// `request.keep_raw` is set. On discard only the video is removed; the
    /// function directory and anything else in it stay.
    pub fn run_function<S: Synthesizer, R: BufRead, W: Write, E: Write>(
        &self,
        synthesizer: &S,
        request: &FunctionRequest,
        reviewer: &mut Reviewer<R, W, E>,
    ) -> Result<Outcome, WavelabError> {
        let directory = fs::canonicalize(&request.directory)?;
        log::info!("Working in {}", directory.display());

        let output = synthesizer.synthesize(&directory, &request.params)?;
        log::info!("Synthesized {} samples", output.samples);

        let video = directory.join(VIDEO_FILE);
        self.tools
            .render_raw(&output.audio, request.params.sampling_rate(), &video)
            .inspect_err(|_| warn_left_behind(&directory))?;
        if !request.keep_raw {
            remove_raw_files(&directory)?;
        }

        let decision = self.present(&video, reviewer)?;
        if decision == Decision::Discard {
            log::debug!("Removing {}", video.display());
            fs::remove_file(&video)?;
        }

        Ok(Outcome {
            directory,
            video,
            decision,
        })
    }

    /// Synthesize a built-in waveform into the next versioned directory
    /// under `base`, render it, play it, and review it.
    ///
    /// Raw files are removed after a successful render unless
    /// `request.keep_raw` is set. On discard the whole versioned directory
    /// is removed.
    ///
    /// A non-positive frequency or press time, or a non-finite amplitude,
    /// is rejected with [`WavelabError::InvalidArgument`] before anything
    /// is created.
    pub fn run_preset<R: BufRead, W: Write, E: Write>(
        &self,
        base: &Path,
        request: &PresetRequest,
        reviewer: &mut Reviewer<R, W, E>,
    ) -> Result<Outcome, WavelabError> {
        request.validate()?;

        let directory = self.scheme.allocate(base)?;
        log::info!("Writing into {}", directory.path().display());
        fs::write(
            directory.path().join(DESCRIPTION_FILE),
            format!("{}\n", request.description()),
        )?;

        let waveform = request.waveform;
        let frequency = request.frequency;
        let amplitude = request.amplitude.clamp(0.0, 1.0);
        let dt = 1.0 / f64::from(request.params.sampling_rate());
        let mut player = request
            .envelope
            .clone()
            .map(|envelope| Player::new(waveform, envelope, request.press_time()));
        let synthesizer = FunctionSynthesizer::new(move |clock: SampleClock| {
            let sample = match player.as_mut() {
                Some(player) => player.sample(clock.t, frequency, dt),
                None => waveform.sample(clock.t, frequency),
            };
            (amplitude * sample) as f32
        })
        .with_progress(Arc::clone(&self.progress))
        .with_batch_size(u64::from(request.params.sampling_rate() / 10).max(1));
        let output = synthesizer.synthesize(directory.path(), &request.params)?;

        let video = directory.path().join(VIDEO_FILE);
        self.tools
            .render_raw(&output.audio, request.params.sampling_rate(), &video)
            .inspect_err(|_| warn_left_behind(directory.path()))?;
        if !request.keep_raw {
            remove_raw_files(directory.path())?;
        }

        self.review_versioned(directory, video, reviewer)
    }

    /// Play and review a video living in a freshly allocated directory,
    /// discarding the directory if the user says no.
    fn review_versioned<R: BufRead, W: Write, E: Write>(
        &self,
        directory: VersionedDirectory,
        video: PathBuf,
        reviewer: &mut Reviewer<R, W, E>,
    ) -> Result<Outcome, WavelabError> {
        let decision = self.present(&video, reviewer)?;
        let path = directory.path().to_path_buf();
        if decision == Decision::Discard {
            directory.discard()?;
        }

        Ok(Outcome {
            directory: path,
            video,
            decision,
        })
    }

    /// Play the video, then ask. A player that fails to start or exits
    /// unsuccessfully does not prevent the review.
    fn present<R: BufRead, W: Write, E: Write>(
        &self,
        video: &Path,
        reviewer: &mut Reviewer<R, W, E>,
    ) -> Result<Decision, WavelabError> {
        if let Err(error) = self.tools.play(video) {
            log::warn!("Playback of {} failed: {error}", video.display());
        }
        reviewer.review()
    }
}

fn warn_left_behind(directory: &Path) {
    log::warn!(
        "Rendering failed; partial results left in {}",
        directory.display()
    );
}
