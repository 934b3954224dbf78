//! Raw sample synthesis integration tests.

use std::{fs, path::Path};

use wavelab::{
    FunctionSynthesizer, SynthesisOutput, SynthesisParams, Synthesizer, WavelabError,
    synth::{read_f32_file, remove_raw_files},
};

#[test]
fn writes_four_bytes_per_sample() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let synthesizer = FunctionSynthesizer::new(|clock| clock.n as f32);

    // 1/64 is exact in binary, so the loop runs exactly 2 * 64 times.
    let params = SynthesisParams::new(2.0, 64).unwrap();
    let output = synthesizer
        .synthesize(temporary_directory.path(), &params)
        .expect("Synthesis failed");

    assert_eq!(output.samples, 128);
    assert_eq!(fs::metadata(&output.audio).unwrap().len(), 4 * 128);

    let samples = read_f32_file(&output.audio).unwrap();
    assert_eq!(samples[0], 0.0);
    assert_eq!(samples[127], 127.0);
}

#[test]
fn time_axis_matches_sample_times() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let synthesizer = FunctionSynthesizer::new(|_| 0.0);

    let output = synthesizer
        .synthesize(temporary_directory.path(), &SynthesisParams::new(0.5, 8).unwrap())
        .unwrap();

    let time_axis = output.time_axis.expect("time axis should be written");
    let times = read_f32_file(time_axis).unwrap();
    assert_eq!(times, [0.0, 0.125, 0.25, 0.375]);
}

#[test]
fn time_axis_can_be_disabled() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let synthesizer = FunctionSynthesizer::new(|_| 0.0).with_time_axis(false);

    let output = synthesizer
        .synthesize(temporary_directory.path(), &SynthesisParams::new(0.5, 8).unwrap())
        .unwrap();

    assert!(output.time_axis.is_none());
    assert!(!temporary_directory.path().join("time_axis").exists());
}

#[test]
fn clock_exposes_total_time_and_rate() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let synthesizer = FunctionSynthesizer::new(|clock| {
        assert_eq!(clock.total_time, 0.25);
        assert_eq!(clock.sampling_rate, 16);
        (clock.t / clock.total_time) as f32
    });

    let output = synthesizer
        .synthesize(temporary_directory.path(), &SynthesisParams::new(0.25, 16).unwrap())
        .unwrap();

    let samples = read_f32_file(output.audio).unwrap();
    assert_eq!(samples, [0.0, 0.25, 0.5, 0.75]);
}

#[test]
fn params_are_validated() {
    for (total_time, rate) in [(0.0, 44_100), (-1.0, 44_100), (f64::NAN, 44_100), (1.0, 0)] {
        let result = SynthesisParams::new(total_time, rate);
        assert!(
            matches!(result, Err(WavelabError::InvalidArgument(_))),
            "{total_time} s at {rate} Hz should be rejected",
        );
    }
}

#[test]
fn collect_requires_audio_raw() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");

    let result = SynthesisOutput::collect(temporary_directory.path());
    assert!(matches!(result, Err(WavelabError::MissingArtifact(_))));

    fs::write(temporary_directory.path().join("audio.raw"), [0_u8; 12]).unwrap();
    let output = SynthesisOutput::collect(temporary_directory.path()).unwrap();
    assert_eq!(output.samples, 3);
    assert!(output.time_axis.is_none());
}

#[test]
fn truncated_raw_file_is_rejected() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temporary_directory.path().join("audio.raw");
    fs::write(&path, [0_u8; 6]).unwrap();

    let error = read_f32_file(&path).unwrap_err();
    assert!(matches!(error, WavelabError::InvalidRawData { length: 6, .. }));
    assert!(
        error.to_string().contains("not a multiple of 4"),
        "Error message should explain the length: {error}",
    );
}

#[test]
fn remove_raw_files_tolerates_missing_files() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(temporary_directory.path().join("audio.raw"), [0_u8; 4]).unwrap();
    fs::write(temporary_directory.path().join("function.py"), "").unwrap();

    remove_raw_files(temporary_directory.path()).expect("Removal failed");
    remove_raw_files(temporary_directory.path()).expect("Second removal failed");

    assert!(!temporary_directory.path().join("audio.raw").exists());
    assert!(temporary_directory.path().join("function.py").exists());
}

#[cfg(unix)]
#[test]
fn external_synthesizer_runs_inside_the_directory() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    // $1 is the directory, $2 the total time, $3 the sampling rate.
    let script = "printf 'abcdefgh' > audio.raw && echo \"$2 $3\" > arguments";
    let synthesizer = wavelab::ExternalSynthesizer::new("sh", ["-c", script, "sh"]);

    let output = synthesizer
        .synthesize(temporary_directory.path(), &SynthesisParams::new(1.5, 8000).unwrap())
        .expect("External synthesis failed");

    assert_eq!(output.samples, 2);
    assert_eq!(
        fs::read_to_string(temporary_directory.path().join("arguments")).unwrap(),
        "1.5 8000\n"
    );
}

#[cfg(unix)]
#[test]
fn external_synthesizer_failure_names_the_tool() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let synthesizer = wavelab::ExternalSynthesizer::new("sh", ["-c", "exit 3", "sh"]);

    let error = synthesizer
        .synthesize(temporary_directory.path(), &SynthesisParams::new(1.0, 100).unwrap())
        .unwrap_err();

    assert!(matches!(error, WavelabError::ToolFailed { .. }));
    assert!(error.to_string().contains("sh"), "{error}");
}

#[test]
fn missing_synthesizer_program_is_a_launch_error() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let synthesizer =
        wavelab::ExternalSynthesizer::new("wavelab-no-such-program", Vec::<String>::new());

    let result =
        synthesizer.synthesize(temporary_directory.path(), &SynthesisParams::new(1.0, 100).unwrap());
    assert!(matches!(result, Err(WavelabError::ToolLaunch { .. })));
}

#[test]
fn external_synthesizer_passes_arguments_verbatim() {
    // Cargo.toml exists in the directory tests run from.
    let synthesizer = wavelab::ExternalSynthesizer::new("sh", ["-c", "Cargo.toml"]);
    let params = SynthesisParams::new(2.0, 100).unwrap();

    let arguments = synthesizer.arguments(Path::new("wave001"), &params);

    assert_eq!(arguments, ["-c", "Cargo.toml", "wave001", "2", "100"]);
}

#[test]
fn custom_synthesizer_arguments_are_not_resolved() {
    let options = wavelab::ToolOptions::new().with_synthesizer("python3", ["Cargo.toml"]);
    let synthesizer = wavelab::ExternalSynthesizer::from_options(&options);
    let params = SynthesisParams::new(1.0, 8).unwrap();

    let arguments = synthesizer.arguments(Path::new("f"), &params);

    assert_eq!(arguments[0], "Cargo.toml");
}

#[test]
fn stateful_functions_keep_state_between_samples() {
    use wavelab::{Adsr, Instrument, Note, Player, PresetScore, Score};

    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let dt = 1.0 / 64.0;
    let mut score = PresetScore::new([Note::new(4.0, 0.25), Note::new(8.0, 0.25)]);
    let mut player = Player::new(Instrument::pure(), Adsr::new(0.0, 0.0, 1.0, 0.0).unwrap(), 1.0);
    let synthesizer = FunctionSynthesizer::new(move |clock| {
        let frequency = score.next_frequency(dt);
        player.sample(clock.t, frequency, dt) as f32
    });

    let output = synthesizer
        .synthesize(temporary_directory.path(), &SynthesisParams::new(1.0, 64).unwrap())
        .expect("Synthesis failed");
    let samples = read_f32_file(&output.audio).unwrap();

    assert_eq!(samples.len(), 64);
    // Both notes together last 2 * (0.25 * 64 + 1) samples; silence follows.
    assert!(samples[..34].iter().any(|sample| sample.abs() > 0.5));
    assert!(samples[34..].iter().all(|&sample| sample == 0.0));
}
