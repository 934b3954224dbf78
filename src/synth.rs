//! Raw sample synthesis.
//!
//! A synthesizer turns a per-sample function into two raw streams inside a
//! directory:
//!
//! - `audio.raw`: one little-endian `f32` per sample,
//! - `time_axis`: the little-endian `f32` time of each sample.
//!
//! Samples are produced for `t = 0, dt, 2·dt, ...` while `t < total_time`,
//! with `dt = 1 / sampling_rate` accumulated step by step. The function sees
//! the current time, the total time, the sample index and the sampling rate
//! through a [`SampleClock`].
//!
//! [`ExternalSynthesizer`] delegates the work to a helper program (by default
//! `python3 create_video.py`), while [`FunctionSynthesizer`] evaluates a Rust
//! closure in-process.

use std::{
    cell::RefCell,
    ffi::OsString,
    fs::{self, File},
    io::{BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
    process::Command,
    sync::Arc,
};

use crate::{
    config::{DEFAULT_SYNTHESIZER_SCRIPT, RAW_AUDIO_FILE, TIME_AXIS_FILE, ToolOptions},
    error::WavelabError,
    progress::{NoOpProgress, ProgressCallback, SynthesisProgress},
    render::run_blocking,
};

/// Duration and sampling rate of a synthesis run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisParams {
    total_time: f64,
    sampling_rate: u32,
}

impl SynthesisParams {
    /// Validate and bundle synthesis parameters.
    ///
    /// # Errors
    ///
    /// Returns [`WavelabError::InvalidArgument`] unless `total_time` is a
    /// finite positive number and `sampling_rate` is non-zero.
    pub fn new(total_time: f64, sampling_rate: u32) -> Result<Self, WavelabError> {
        if !total_time.is_finite() || total_time <= 0.0 {
            return Err(WavelabError::InvalidArgument(format!(
                "total time must be a positive number of seconds, got {total_time}"
            )));
        }
        if sampling_rate == 0 {
            return Err(WavelabError::InvalidArgument(
                "sampling frequency must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            total_time,
            sampling_rate,
        })
    }

    /// Total signal length in seconds.
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Samples per second.
    pub fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    /// Number of samples the loop is expected to produce.
    ///
    /// Accumulated floating point steps may yield one sample more or less.
    pub fn expected_samples(&self) -> u64 {
        (self.total_time * f64::from(self.sampling_rate)).ceil() as u64
    }
}

/// What a sample function sees for each sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleClock {
    /// Current time in seconds.
    pub t: f64,
    /// Total signal length in seconds.
    pub total_time: f64,
    /// Index of the current sample.
    pub n: u64,
    /// Samples per second.
    pub sampling_rate: u32,
}

/// Files produced by a synthesis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOutput {
    /// Path of `audio.raw`.
    pub audio: PathBuf,
    /// Path of `time_axis`, when the synthesizer wrote one.
    pub time_axis: Option<PathBuf>,
    /// Number of samples in `audio.raw`.
    pub samples: u64,
}

impl SynthesisOutput {
    /// Describe the raw files present in `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`WavelabError::MissingArtifact`] if `audio.raw` is absent.
    pub fn collect(directory: &Path) -> Result<Self, WavelabError> {
        let audio = directory.join(RAW_AUDIO_FILE);
        let length = match fs::metadata(&audio) {
            Ok(metadata) => metadata.len(),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Err(WavelabError::MissingArtifact(audio));
            }
            Err(error) => return Err(error.into()),
        };
        let time_axis = Some(directory.join(TIME_AXIS_FILE)).filter(|path| path.is_file());

        Ok(Self {
            audio,
            time_axis,
            samples: length / 4,
        })
    }
}

/// Something that can fill a directory with `audio.raw` (and optionally
/// `time_axis`).
pub trait Synthesizer {
    /// Produce the raw streams inside `directory`.
    fn synthesize(
        &self,
        directory: &Path,
        params: &SynthesisParams,
    ) -> Result<SynthesisOutput, WavelabError>;
}

/// Runs an external helper as `<program> <args..> <dir> <total_time> <rate>`.
///
/// The helper runs with `<dir>` as its working directory and is expected to
/// evaluate the per-sample function found there.
#[derive(Debug, Clone)]
pub struct ExternalSynthesizer {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalSynthesizer {
    /// Create a synthesizer from a program and its leading arguments.
    ///
    /// The arguments are passed verbatim. The helper is started inside the
    /// function directory, so relative paths among them resolve there.
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Build from the synthesizer entry of [`ToolOptions`].
    ///
    /// When the options still name the default script and it exists in the
    /// current directory, it is made absolute so the helper finds it from
    /// inside the function directory.
    pub fn from_options(options: &ToolOptions) -> Self {
        let mut synthesizer =
            Self::new(options.synthesizer.clone(), options.synthesizer_args.clone());
        if options.synthesizer_args == [OsString::from(DEFAULT_SYNTHESIZER_SCRIPT)] {
            if let Ok(script) = fs::canonicalize(DEFAULT_SYNTHESIZER_SCRIPT) {
                synthesizer.args = vec![script.into_os_string()];
            }
        }
        synthesizer
    }

    /// The program that will be run.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// The full argument list for a run.
    pub fn arguments(&self, directory: &Path, params: &SynthesisParams) -> Vec<OsString> {
        let mut args = self.args.clone();
        args.push(directory.as_os_str().to_owned());
        args.push(params.total_time().to_string().into());
        args.push(params.sampling_rate().to_string().into());
        args
    }
}

impl Synthesizer for ExternalSynthesizer {
    fn synthesize(
        &self,
        directory: &Path,
        params: &SynthesisParams,
    ) -> Result<SynthesisOutput, WavelabError> {
        log::info!(
            "Synthesizing {}s at {} Hz with {} in {}",
            params.total_time(),
            params.sampling_rate(),
            self.program.display(),
            directory.display()
        );

        let mut command = Command::new(&self.program);
        command
            .args(self.arguments(directory, params))
            .current_dir(directory);
        run_blocking(command)?;

        SynthesisOutput::collect(directory)
    }
}

/// Evaluates a Rust closure for every sample, in-process.
///
/// The closure may keep state between samples, such as an
/// [`Envelope`](crate::envelope::Envelope) or a [`Score`](crate::score::Score).
/// That state carries over if the same synthesizer is run again.
///
/// # Example
///
/// ```no_run
/// use wavelab::{FunctionSynthesizer, SynthesisParams, Synthesizer, oscillator};
///
/// let synthesizer = FunctionSynthesizer::new(|clock| {
///     let fade = 1.0 - clock.t / clock.total_time;
///     (fade * oscillator::sin(clock.t, 220.0)) as f32
/// });
/// let output = synthesizer.synthesize("wave003".as_ref(), &SynthesisParams::new(3.0, 8000)?)?;
/// println!("wrote {} samples", output.samples);
/// # Ok::<(), wavelab::WavelabError>(())
/// ```
pub struct FunctionSynthesizer<F> {
    function: RefCell<F>,
    progress: Arc<dyn ProgressCallback>,
    batch_size: u64,
    write_time_axis: bool,
}

impl<F: FnMut(SampleClock) -> f32> FunctionSynthesizer<F> {
    /// Wrap a sample function.
    ///
    /// Defaults: no progress callback, a report every 1000 samples, and a
    /// time axis written next to the audio.
    pub fn new(function: F) -> Self {
        Self {
            function: RefCell::new(function),
            progress: Arc::new(NoOpProgress),
            batch_size: 1000,
            write_time_axis: true,
        }
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Report progress every `size` samples. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Choose whether `time_axis` is written.
    #[must_use]
    pub fn with_time_axis(mut self, enabled: bool) -> Self {
        self.write_time_axis = enabled;
        self
    }
}

impl<F: FnMut(SampleClock) -> f32> Synthesizer for FunctionSynthesizer<F> {
    fn synthesize(
        &self,
        directory: &Path,
        params: &SynthesisParams,
    ) -> Result<SynthesisOutput, WavelabError> {
        log::debug!(
            "Synthesizing {}s at {} Hz in-process into {}",
            params.total_time(),
            params.sampling_rate(),
            directory.display()
        );

        let audio_path = directory.join(RAW_AUDIO_FILE);
        let mut audio = BufWriter::new(File::create(&audio_path)?);
        let time_axis_path = directory.join(TIME_AXIS_FILE);
        let mut time_axis = if self.write_time_axis {
            Some(BufWriter::new(File::create(&time_axis_path)?))
        } else {
            None
        };

        let mut progress =
            SynthesisProgress::start(Arc::clone(&self.progress), params, self.batch_size);

        let mut function = self.function.borrow_mut();
        let dt = 1.0 / f64::from(params.sampling_rate());
        let mut clock = SampleClock {
            t: 0.0,
            total_time: params.total_time(),
            n: 0,
            sampling_rate: params.sampling_rate(),
        };
        while clock.t < clock.total_time {
            let sample = (*function)(clock);
            audio.write_all(&sample.to_le_bytes())?;
            if let Some(writer) = time_axis.as_mut() {
                writer.write_all(&(clock.t as f32).to_le_bytes())?;
            }
            progress.sample_written(clock.t);
            clock.n += 1;
            clock.t += dt;
        }
        progress.finish((clock.t - dt).max(0.0));

        audio.flush()?;
        if let Some(mut writer) = time_axis {
            writer.flush()?;
        }

        Ok(SynthesisOutput {
            audio: audio_path,
            time_axis: self.write_time_axis.then_some(time_axis_path),
            samples: clock.n,
        })
    }
}

/// Read a raw little-endian `f32` stream.
///
/// # Errors
///
/// Returns [`WavelabError::InvalidRawData`] if the file length is not a
/// multiple of four bytes.
pub fn read_f32_file<P: AsRef<Path>>(path: P) -> Result<Vec<f32>, WavelabError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    if bytes.len() % 4 != 0 {
        return Err(WavelabError::InvalidRawData {
            path: path.to_path_buf(),
            length: bytes.len() as u64,
        });
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Delete `audio.raw` and `time_axis` from `directory`, ignoring files that
/// are already gone.
pub fn remove_raw_files(directory: &Path) -> Result<(), WavelabError> {
    for name in [RAW_AUDIO_FILE, TIME_AXIS_FILE] {
        let path = directory.join(name);
        match fs::remove_file(&path) {
            Ok(()) => log::debug!("Removed {}", path.display()),
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(error) => return Err(error.into()),
        }
    }
    Ok(())
}
