//! Render, play and review workflow integration tests.
//!
//! `FakeTools` stands in for ffmpeg and the player: rendering writes a small
//! placeholder video and every call is recorded.

use std::{
    cell::RefCell,
    fs,
    io::Cursor,
    path::Path,
    sync::{Arc, Mutex},
};

use wavelab::{
    Adsr, Decision, FunctionRequest, FunctionSynthesizer, MediaTools, PresetRequest, ProgressCallback,
    ProgressInfo, Reviewer, SynthesisParams, WavelabError, Waveform, Workflow,
    review::PROMPT,
};

#[derive(Default)]
struct FakeTools {
    fail_render: bool,
    fail_play: bool,
    calls: RefCell<Vec<String>>,
}

impl FakeTools {
    fn failing_render() -> Self {
        Self {
            fail_render: true,
            ..Self::default()
        }
    }

    fn failing_play() -> Self {
        Self {
            fail_play: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn render(&self, output: &Path) -> Result<(), WavelabError> {
        if self.fail_render {
            return Err(WavelabError::ToolLaunch {
                tool: "ffmpeg".to_string(),
                reason: "No such file or directory".to_string(),
            });
        }
        fs::write(output, b"fake video")?;
        Ok(())
    }
}

impl MediaTools for FakeTools {
    fn render_formula(&self, formula: &str, output: &Path) -> Result<(), WavelabError> {
        self.calls.borrow_mut().push(format!("formula {formula}"));
        self.render(output)
    }

    fn render_raw(
        &self,
        raw_audio: &Path,
        sampling_rate: u32,
        output: &Path,
    ) -> Result<(), WavelabError> {
        assert!(raw_audio.is_file(), "raw audio must exist while rendering");
        self.calls.borrow_mut().push(format!("raw {sampling_rate}"));
        self.render(output)
    }

    fn play(&self, video: &Path) -> Result<(), WavelabError> {
        assert!(video.is_file(), "video must exist before playback");
        self.calls.borrow_mut().push("play".to_string());
        if self.fail_play {
            return Err(WavelabError::ToolLaunch {
                tool: "mpv".to_string(),
                reason: "No such file or directory".to_string(),
            });
        }
        Ok(())
    }
}

/// Run `action` with a reviewer fed `answers`; returns its result and the
/// text written as prompts.
fn with_reviewer<T>(
    answers: &str,
    action: impl FnOnce(&mut Reviewer<Cursor<&[u8]>, &mut Vec<u8>, &mut Vec<u8>>) -> T,
) -> (T, String) {
    let mut prompt = Vec::new();
    let mut errors = Vec::new();
    let result = {
        let mut reviewer = Reviewer::new(Cursor::new(answers.as_bytes()), &mut prompt, &mut errors);
        action(&mut reviewer)
    };
    (result, String::from_utf8(prompt).expect("prompt output is UTF-8"))
}

fn sine_synthesizer() -> FunctionSynthesizer<impl FnMut(wavelab::SampleClock) -> f32> {
    FunctionSynthesizer::new(|clock| wavelab::oscillator::sin(clock.t, 5.0) as f32)
}

// ── Formula entry ──────────────────────────────────────────────────

#[test]
fn formula_commit_keeps_directory() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let workflow = Workflow::new(FakeTools::default());

    let (result, prompt) = with_reviewer("y\n", |reviewer| {
        workflow.run_formula(temporary_directory.path(), "sin(2*PI*440*t)", reviewer)
    });
    let outcome = result.expect("formula run failed");

    let directory = temporary_directory.path().join("wave001");
    assert_eq!(outcome.decision, Decision::Commit);
    assert_eq!(outcome.directory, directory);
    assert_eq!(outcome.video, directory.join("video.mp4"));
    assert!(outcome.video.is_file());
    assert_eq!(
        fs::read_to_string(directory.join("description.txt")).unwrap(),
        "sin(2*PI*440*t)\n"
    );
    assert_eq!(prompt, PROMPT);
    assert_eq!(
        workflow.tools().calls(),
        ["formula sin(2*PI*440*t)", "play"]
    );
}

#[test]
fn formula_discard_removes_directory() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let workflow = Workflow::new(FakeTools::default());

    let (result, _) = with_reviewer("n\n", |reviewer| {
        workflow.run_formula(temporary_directory.path(), "cos(t)", reviewer)
    });
    let outcome = result.expect("formula run failed");

    assert_eq!(outcome.decision, Decision::Discard);
    assert!(!outcome.directory.exists());

    // The discarded ordinal is free again.
    let (result, _) = with_reviewer("\n", |reviewer| {
        workflow.run_formula(temporary_directory.path(), "cos(t)", reviewer)
    });
    assert_eq!(
        result.unwrap().directory,
        temporary_directory.path().join("wave001")
    );
}

#[test]
fn formula_runs_get_consecutive_directories() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let workflow = Workflow::new(FakeTools::default());

    for expected in ["wave001", "wave002"] {
        let (result, _) = with_reviewer("y\n", |reviewer| {
            workflow.run_formula(temporary_directory.path(), "t", reviewer)
        });
        assert_eq!(
            result.unwrap().directory,
            temporary_directory.path().join(expected)
        );
    }
}

#[test]
fn empty_formula_has_no_side_effects() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let workflow = Workflow::new(FakeTools::default());

    let (result, prompt) = with_reviewer("y\n", |reviewer| {
        workflow.run_formula(temporary_directory.path(), "  ", reviewer)
    });

    assert!(matches!(result, Err(WavelabError::InvalidArgument(_))));
    assert!(prompt.is_empty());
    assert_eq!(
        fs::read_dir(temporary_directory.path()).unwrap().count(),
        0
    );
    assert!(workflow.tools().calls().is_empty());
}

#[test]
fn failed_render_never_reaches_the_prompt() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let workflow = Workflow::new(FakeTools::failing_render());

    let (result, prompt) = with_reviewer("n\n", |reviewer| {
        workflow.run_formula(temporary_directory.path(), "sin(t)", reviewer)
    });

    let error = result.expect_err("render failure should propagate");
    assert!(
        error.to_string().contains("ffmpeg"),
        "Error message should name the tool: {error}",
    );
    assert!(prompt.is_empty());
    assert_eq!(workflow.tools().calls(), ["formula sin(t)"]);

    // The directory is left behind for inspection.
    let directory = temporary_directory.path().join("wave001");
    assert!(directory.join("description.txt").is_file());
    assert!(!directory.join("video.mp4").exists());
}

#[test]
fn failed_playback_still_reviews() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let workflow = Workflow::new(FakeTools::failing_play());

    let (result, prompt) = with_reviewer("n\n", |reviewer| {
        workflow.run_formula(temporary_directory.path(), "sin(t)", reviewer)
    });

    assert_eq!(result.unwrap().decision, Decision::Discard);
    assert_eq!(prompt, PROMPT);
    assert!(!temporary_directory.path().join("wave001").exists());
}

#[test]
fn closed_input_keeps_everything() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let workflow = Workflow::new(FakeTools::default());

    let (result, _) = with_reviewer("", |reviewer| {
        workflow.run_formula(temporary_directory.path(), "sin(t)", reviewer)
    });

    assert!(matches!(result, Err(WavelabError::InputClosed)));
    assert!(
        temporary_directory
            .path()
            .join("wave001")
            .join("video.mp4")
            .is_file()
    );
}

// ── Function entry ─────────────────────────────────────────────────

fn function_directory(base: &Path) -> std::path::PathBuf {
    let directory = base.join("my_function");
    fs::create_dir(&directory).unwrap();
    fs::write(directory.join("function.py"), "def f(t, T, n, fs):\n    return 0\n").unwrap();
    directory
}

#[test]
fn function_discard_removes_only_the_video() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let directory = function_directory(temporary_directory.path());
    let workflow = Workflow::new(FakeTools::default());
    let request = FunctionRequest {
        directory: directory.clone(),
        params: SynthesisParams::new(0.5, 128).unwrap(),
        keep_raw: false,
    };

    let (result, _) = with_reviewer("n\n", |reviewer| {
        workflow.run_function(&sine_synthesizer(), &request, reviewer)
    });
    let outcome = result.expect("function run failed");

    assert_eq!(outcome.decision, Decision::Discard);
    assert!(outcome.directory.is_absolute());
    assert!(directory.is_dir());
    assert!(directory.join("function.py").is_file());
    assert!(!directory.join("video.mp4").exists());
    assert!(!directory.join("audio.raw").exists());
    assert!(!directory.join("time_axis").exists());
    assert_eq!(workflow.tools().calls(), ["raw 128", "play"]);
}

#[test]
fn function_keep_raw_preserves_raw_files() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let directory = function_directory(temporary_directory.path());
    let workflow = Workflow::new(FakeTools::default());
    let request = FunctionRequest {
        directory: directory.clone(),
        params: SynthesisParams::new(0.5, 128).unwrap(),
        keep_raw: true,
    };

    let (result, _) = with_reviewer("y\n", |reviewer| {
        workflow.run_function(&sine_synthesizer(), &request, reviewer)
    });

    assert_eq!(result.unwrap().decision, Decision::Commit);
    assert!(directory.join("video.mp4").is_file());
    assert_eq!(fs::metadata(directory.join("audio.raw")).unwrap().len(), 4 * 64);
    assert_eq!(fs::metadata(directory.join("time_axis")).unwrap().len(), 4 * 64);
}

#[test]
fn function_render_failure_keeps_raw_files() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let directory = function_directory(temporary_directory.path());
    let workflow = Workflow::new(FakeTools::failing_render());
    let request = FunctionRequest {
        directory: directory.clone(),
        params: SynthesisParams::new(0.1, 100).unwrap(),
        keep_raw: false,
    };

    let (result, prompt) = with_reviewer("y\n", |reviewer| {
        workflow.run_function(&sine_synthesizer(), &request, reviewer)
    });

    assert!(matches!(result, Err(WavelabError::ToolLaunch { .. })));
    assert!(prompt.is_empty());
    assert!(directory.join("audio.raw").is_file());
}

#[test]
fn function_missing_directory_is_an_error() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let workflow = Workflow::new(FakeTools::default());
    let request = FunctionRequest {
        directory: temporary_directory.path().join("absent"),
        params: SynthesisParams::new(1.0, 100).unwrap(),
        keep_raw: false,
    };

    let (result, _) = with_reviewer("y\n", |reviewer| {
        workflow.run_function(&sine_synthesizer(), &request, reviewer)
    });

    assert!(matches!(result, Err(WavelabError::IoError(_))));
    assert!(workflow.tools().calls().is_empty());
}

#[cfg(unix)]
#[test]
fn external_synthesizer_without_output_stops_before_render() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let directory = function_directory(temporary_directory.path());
    let workflow = Workflow::new(FakeTools::default());
    let synthesizer = wavelab::ExternalSynthesizer::new("sh", ["-c", "exit 0", "sh"]);
    let request = FunctionRequest {
        directory,
        params: SynthesisParams::new(1.0, 100).unwrap(),
        keep_raw: false,
    };

    let (result, _) = with_reviewer("y\n", |reviewer| {
        workflow.run_function(&synthesizer, &request, reviewer)
    });

    assert!(matches!(result, Err(WavelabError::MissingArtifact(_))));
    assert!(workflow.tools().calls().is_empty());
}

// ── Preset entry ───────────────────────────────────────────────────

struct CountingProgress {
    reports: Mutex<Vec<u64>>,
}

impl ProgressCallback for CountingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.reports.lock().unwrap().push(info.samples_written);
    }
}

fn preset(waveform: Waveform, keep_raw: bool) -> PresetRequest {
    PresetRequest {
        waveform,
        frequency: 10.0,
        amplitude: 0.5,
        envelope: None,
        press_time: None,
        params: SynthesisParams::new(1.0, 256).unwrap(),
        keep_raw,
    }
}

#[test]
fn preset_commit_writes_description_and_video() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let progress = Arc::new(CountingProgress {
        reports: Mutex::new(Vec::new()),
    });
    let workflow = Workflow::new(FakeTools::default()).with_progress(progress.clone());
    let request = preset(Waveform::Square, false);

    let (result, _) = with_reviewer("y\n", |reviewer| {
        workflow.run_preset(temporary_directory.path(), &request, reviewer)
    });
    let outcome = result.expect("preset run failed");

    let directory = temporary_directory.path().join("wave001");
    assert_eq!(outcome.directory, directory);
    assert!(directory.join("video.mp4").is_file());
    assert!(!directory.join("audio.raw").exists());
    assert_eq!(
        fs::read_to_string(directory.join("description.txt")).unwrap(),
        format!("{}\n", request.description())
    );
    assert_eq!(workflow.tools().calls(), ["raw 256", "play"]);

    let reports = progress.reports.lock().unwrap();
    assert!(!reports.is_empty());
    assert_eq!(reports.last().copied(), Some(256));
}

#[test]
fn preset_keep_raw_samples_are_scaled() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let workflow = Workflow::new(FakeTools::default());

    let (result, _) = with_reviewer("y\n", |reviewer| {
        workflow.run_preset(temporary_directory.path(), &preset(Waveform::Square, true), reviewer)
    });
    let outcome = result.unwrap();

    let samples = wavelab::synth::read_f32_file(outcome.directory.join("audio.raw")).unwrap();
    assert_eq!(samples.len(), 256);
    assert!(samples.iter().all(|&sample| sample == 0.5 || sample == -0.5));
}

#[test]
fn preset_discard_removes_directory() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let workflow = Workflow::new(FakeTools::default());

    let (result, _) = with_reviewer("N\n", |reviewer| {
        workflow.run_preset(temporary_directory.path(), &preset(Waveform::Sine, true), reviewer)
    });

    assert_eq!(result.unwrap().decision, Decision::Discard);
    assert!(!temporary_directory.path().join("wave001").exists());
}

#[test]
fn preset_rejects_bad_frequency_before_allocating() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let workflow = Workflow::new(FakeTools::default());
    let mut request = preset(Waveform::Sine, false);
    request.frequency = 0.0;

    let (result, _) = with_reviewer("y\n", |reviewer| {
        workflow.run_preset(temporary_directory.path(), &request, reviewer)
    });

    assert!(matches!(result, Err(WavelabError::InvalidArgument(_))));
    assert_eq!(
        fs::read_dir(temporary_directory.path()).unwrap().count(),
        0
    );
}

#[test]
fn preset_rejects_non_finite_amplitude_before_allocating() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let workflow = Workflow::new(FakeTools::default());

    for amplitude in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let mut request = preset(Waveform::Sine, true);
        request.amplitude = amplitude;

        let (result, _) = with_reviewer("y\n", |reviewer| {
            workflow.run_preset(temporary_directory.path(), &request, reviewer)
        });

        let error = result.expect_err("non-finite amplitude should be rejected");
        assert!(matches!(error, WavelabError::InvalidArgument(_)));
        assert!(error.to_string().contains("amplitude"), "{error}");
    }
    assert_eq!(
        fs::read_dir(temporary_directory.path()).unwrap().count(),
        0
    );
    assert!(workflow.tools().calls().is_empty());
}

#[test]
fn preset_rejects_bad_press_time() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let workflow = Workflow::new(FakeTools::default());
    let mut request = preset(Waveform::Sine, false);
    request.envelope = Some(Adsr::new(0.1, 0.1, 0.5, 0.1).unwrap());
    request.press_time = Some(0.0);

    let (result, _) = with_reviewer("y\n", |reviewer| {
        workflow.run_preset(temporary_directory.path(), &request, reviewer)
    });

    assert!(matches!(result, Err(WavelabError::InvalidArgument(_))));
    assert!(!temporary_directory.path().join("wave001").exists());
}

#[test]
fn preset_envelope_shapes_the_samples() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let workflow = Workflow::new(FakeTools::default());
    let mut request = preset(Waveform::Square, true);
    request.envelope = Some(Adsr::new(0.25, 0.25, 0.5, 0.25).unwrap());

    let (result, _) = with_reviewer("y\n", |reviewer| {
        workflow.run_preset(temporary_directory.path(), &request, reviewer)
    });
    let outcome = result.expect("preset run failed");

    let samples = wavelab::synth::read_f32_file(outcome.directory.join("audio.raw")).unwrap();
    assert_eq!(samples.len(), 256);
    // Attack starts from silence, sustain holds half the amplitude.
    assert_eq!(samples[0], 0.0);
    assert_eq!(samples[200].abs(), 0.25);
    assert!(samples.iter().all(|sample| sample.abs() <= 0.5));

    let description = fs::read_to_string(outcome.directory.join("description.txt")).unwrap();
    assert!(
        description.contains("envelope 0.25,0.25,0.5,0.25 pressed 1 s"),
        "{description}"
    );
}
