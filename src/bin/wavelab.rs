use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use wavelab::{
    Decision, ExternalSynthesizer, FunctionRequest, Outcome, PresetRequest, ProgressCallback,
    ProgressInfo, RawAudio, RenderOptions, Reviewer, SynthesisParams, SystemTools, ToolOptions,
    Waveform, Workflow, envelope::Adsr, oscillator,
};

const CLI_AFTER_HELP: &str = "Examples:\n  wavelab formula 'sin(2*PI*440*t)*exp(-t)'\n  wavelab function wave002 10 44100\n  wavelab function wave002 10 44100 keep\n  wavelab preset square 3 44100 --note A3\n  wavelab stats wave002 --bins 20\n  wavelab completions zsh > _wavelab";

#[derive(Debug, Parser)]
#[command(
    name = "wavelab",
    version,
    about = "Render formulas and sample functions into waveform videos, then keep or discard them",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// ffmpeg executable used for rendering.
    #[arg(long, global = true)]
    ffmpeg: Option<PathBuf>,

    /// Media player used for review (must block until closed).
    #[arg(long, global = true)]
    player: Option<PathBuf>,

    /// Extra argument for the player (repeatable).
    #[arg(long = "player-arg", global = true)]
    player_args: Vec<String>,

    /// Program that evaluates a sample function directory.
    #[arg(long, global = true)]
    synth: Option<PathBuf>,

    /// Leading argument for the synthesizer (repeatable, replaces the default script).
    /// Passed verbatim; relative paths resolve inside the function directory.
    #[arg(long = "synth-arg", global = true)]
    synth_args: Vec<String>,

    /// Video size as WIDTHxHEIGHT.
    #[arg(long, global = true)]
    size: Option<String>,

    /// showwaves drawing mode (point, line, p2p, cline).
    #[arg(long, global = true)]
    mode: Option<String>,

    /// Video frame rate.
    #[arg(long, global = true)]
    fps: Option<u32>,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render an ffmpeg expression into the next waveNNN directory.
    #[command(
        about = "Render a formula",
        after_help = "Examples:\n  wavelab formula 'sin(2*PI*440*t)'\n  wavelab formula '0.5*sin(2*PI*220*t)+0.5*sin(2*PI*330*t)' --duration 4"
    )]
    Formula {
        /// Expression in t (seconds), e.g. sin(2*PI*440*t).
        formula: String,
        /// Seconds of audio to generate.
        #[arg(long)]
        duration: Option<f64>,
        /// Sampling rate used to evaluate the formula.
        #[arg(long)]
        sample_rate: Option<u32>,
    },

    /// Synthesize a sample function directory, render and review it.
    #[command(
        about = "Render a sample function directory",
        after_help = "Examples:\n  wavelab function wave002 10 44100\n  wavelab function wave002 10 44100 keep"
    )]
    Function {
        /// Directory containing the sample function.
        directory: PathBuf,
        /// Total signal length in seconds.
        total_time: f64,
        /// Sampling frequency in hertz.
        sampling_frequency: u32,
        /// Any value keeps audio.raw and time_axis after rendering.
        keep: Option<String>,
    },

    /// Synthesize a built-in waveform into the next waveNNN directory.
    #[command(
        about = "Render a built-in waveform",
        after_help = "Examples:\n  wavelab preset sine 2 44100 --frequency 330\n  wavelab preset sawtooth 3 22050 --note D#3 --amplitude 0.5 --keep\n  wavelab preset sine 4 44100 --note C4 --adsr 0.05,0.2,0.6,0.5 --press-time 1"
    )]
    Preset {
        /// Waveform: sine | square | sawtooth | tangent.
        waveform: String,
        /// Total signal length in seconds.
        total_time: f64,
        /// Sampling frequency in hertz.
        sampling_frequency: u32,
        /// Frequency in hertz (default 440).
        #[arg(long, conflicts_with = "note")]
        frequency: Option<f64>,
        /// Note name such as A4, Gb3 or D#4+25.
        #[arg(long)]
        note: Option<String>,
        /// Peak amplitude between 0 and 1.
        #[arg(long, default_value_t = 1.0)]
        amplitude: f64,
        /// Volume envelope as ATTACK,DECAY,SUSTAIN,RELEASE (seconds, level, seconds).
        #[arg(long, value_name = "A,D,S,R")]
        adsr: Option<String>,
        /// Seconds each note is held before the envelope is released and struck again.
        #[arg(long, requires = "adsr")]
        press_time: Option<f64>,
        /// Keep audio.raw and time_axis after rendering.
        #[arg(long)]
        keep: bool,
    },

    /// Summarize the raw samples kept in a directory.
    #[command(
        about = "Summarize raw samples",
        after_help = "Examples:\n  wavelab stats wave002\n  wavelab stats wave002 --bins 200 --out bins.csv"
    )]
    Stats {
        /// Directory containing audio.raw (and optionally time_axis).
        directory: PathBuf,
        /// Number of bins.
        #[arg(long, default_value_t = 40)]
        bins: usize,
        /// Sampling rate, when no time_axis is available.
        #[arg(long)]
        sample_rate: Option<u32>,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
        /// Write all bins as CSV to this file.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Allow overwriting the CSV file.
        #[arg(long)]
        overwrite: bool,
    },

    #[cfg(feature = "probe")]
    /// Inspect a rendered video.
    #[command(about = "Print rendered video metadata and validation report")]
    Probe {
        /// Rendered video path.
        input: PathBuf,
        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_size(value: &str) -> Option<(u32, u32)> {
    let (width, height) = value.trim().split_once(['x', 'X'])?;
    let width = width.parse::<u32>().ok().filter(|&w| w > 0)?;
    let height = height.parse::<u32>().ok().filter(|&h| h > 0)?;
    Some((width, height))
}

fn parse_log_level(value: &str) -> Option<&'static str> {
    match value.to_ascii_lowercase().as_str() {
        "quiet" => Some("quiet"),
        "panic" => Some("panic"),
        "fatal" => Some("fatal"),
        "error" => Some("error"),
        "warning" | "warn" => Some("warning"),
        "info" => Some("info"),
        "verbose" => Some("verbose"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        _ => None,
    }
}

fn parse_mode(value: &str) -> Option<&'static str> {
    match value.to_ascii_lowercase().as_str() {
        "point" => Some("point"),
        "line" => Some("line"),
        "p2p" => Some("p2p"),
        "cline" => Some("cline"),
        _ => None,
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn ensure_writable_path(path: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() {
        if overwrite {
            eprintln!(
                "{} {}",
                "warning:".yellow().bold(),
                format!("overwriting {}", path.display()).yellow()
            );
        } else {
            return Err(format!(
                "output already exists: {} (use --overwrite to replace)",
                path.display()
            )
            .into());
        }
    }
    Ok(())
}

fn build_options(
    global: &GlobalOptions,
) -> Result<(RenderOptions, ToolOptions), Box<dyn std::error::Error>> {
    let mut render = RenderOptions::new();
    let mut tools = ToolOptions::new();

    if let Some(size) = &global.size {
        let (width, height) = parse_size(size).ok_or(format!("unsupported --size: {size}"))?;
        render = render.with_size(width, height);
    }
    if let Some(mode) = &global.mode {
        let parsed = parse_mode(mode).ok_or(format!("unsupported --mode: {mode}"))?;
        render = render.with_mode(parsed);
    }
    if let Some(fps) = global.fps {
        render = render.with_frames_per_second(fps);
    }
    if let Some(level) = &global.log_level {
        let parsed = parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?;
        render = render.with_log_level(parsed);
        #[cfg(feature = "probe")]
        wavelab::probe::set_library_log_level(parsed)?;
    }

    if let Some(ffmpeg) = &global.ffmpeg {
        tools = tools.with_ffmpeg(ffmpeg);
    }
    if let Some(player) = &global.player {
        tools = tools.with_player(player);
    }
    if !global.player_args.is_empty() {
        tools = tools.with_player_args(global.player_args.iter());
    }
    // Either flag replaces the default `python3 create_video.py` pair.
    if global.synth.is_some() || !global.synth_args.is_empty() {
        let program = global
            .synth
            .clone()
            .unwrap_or_else(|| tools.synthesizer.clone());
        tools = tools.with_synthesizer(program, global.synth_args.iter());
    }

    Ok((render, tools))
}

/// Drives an indicatif bar from synthesis progress.
struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.green} synthesizing {bar:40.cyan/blue} {percent:>3}% {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_length(info.samples_expected);
        self.bar
            .set_position(info.samples_written.min(info.samples_expected));
        self.bar
            .set_message(format!("{:.2}s / {:.2}s", info.signal_time, info.total_time));
        if info.finished {
            self.bar.finish();
        }
    }
}

fn stdin_reviewer() -> Reviewer<io::StdinLock<'static>, io::Stdout, io::Stderr> {
    Reviewer::new(io::stdin().lock(), io::stdout(), io::stderr())
}

fn report_outcome(outcome: &Outcome) {
    match outcome.decision {
        Decision::Commit => println!(
            "{} {}",
            "success:".green().bold(),
            format!("kept {}", outcome.video.display()).green()
        ),
        Decision::Discard => println!(
            "{} {}",
            "discarded:".yellow().bold(),
            outcome.video.display()
        ),
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (render, tools) = build_options(&cli.global)?;

    match cli.command {
        Commands::Formula {
            formula,
            duration,
            sample_rate,
        } => {
            let mut render = render;
            if let Some(seconds) = duration {
                if !seconds.is_finite() || seconds <= 0.0 {
                    return Err("--duration must be a positive number of seconds".into());
                }
                render = render.with_formula_duration(seconds);
            }
            if let Some(rate) = sample_rate {
                render = render.with_formula_sample_rate(rate);
            }

            let workflow = Workflow::new(SystemTools::new(render, tools));
            let outcome =
                workflow.run_formula(Path::new("."), &formula, &mut stdin_reviewer())?;
            report_outcome(&outcome);
        }
        Commands::Function {
            directory,
            total_time,
            sampling_frequency,
            keep,
        } => {
            let synthesizer = ExternalSynthesizer::from_options(&tools);
            let request = FunctionRequest {
                directory,
                params: SynthesisParams::new(total_time, sampling_frequency)?,
                keep_raw: keep.is_some(),
            };

            let workflow = Workflow::new(SystemTools::new(render, tools));
            let outcome = workflow.run_function(&synthesizer, &request, &mut stdin_reviewer())?;
            report_outcome(&outcome);
        }
        Commands::Preset {
            waveform,
            total_time,
            sampling_frequency,
            frequency,
            note,
            amplitude,
            adsr,
            press_time,
            keep,
        } => {
            let waveform: Waveform = waveform.parse()?;
            let envelope = adsr.as_deref().map(str::parse::<Adsr>).transpose()?;
            let frequency = match (frequency, note) {
                (Some(hertz), _) => hertz,
                (None, Some(note)) => oscillator::note_frequency(&note)?,
                (None, None) => oscillator::A4_FREQUENCY,
            };
            let request = PresetRequest {
                waveform,
                frequency,
                amplitude,
                envelope,
                press_time,
                params: SynthesisParams::new(total_time, sampling_frequency)?,
                keep_raw: keep,
            };

            let workflow = Workflow::new(SystemTools::new(render, tools))
                .with_progress(Arc::new(TerminalProgress::new()?));
            let outcome = workflow.run_preset(Path::new("."), &request, &mut stdin_reviewer())?;
            report_outcome(&outcome);
        }
        Commands::Stats {
            directory,
            bins,
            sample_rate,
            json,
            out,
            overwrite,
        } => {
            if bins == 0 {
                return Err("--bins must be greater than 0".into());
            }
            let raw = RawAudio::load(&directory)?;
            let summary = raw.summarize_with_rate(bins, sample_rate);

            if let Some(path) = out {
                ensure_writable_path(&path, overwrite)?;
                let mut file = io::BufWriter::new(fs::File::create(&path)?);
                writeln!(file, "index,min,max,rms")?;
                for (index, bin) in summary.bins.iter().enumerate() {
                    writeln!(file, "{index},{},{},{}", bin.min, bin.max, bin.rms)?;
                }
                file.flush()?;
                println!("{} {}", "saved".green().bold(), path.display());
            } else if json {
                let payload = json!({
                    "total_samples": summary.total_samples,
                    "non_finite_samples": summary.non_finite_samples,
                    "sample_rate": summary.sample_rate,
                    "duration_seconds": summary.duration.map(|d| d.as_secs_f64()),
                    "bins": summary.bins.iter().map(|bin| json!({
                        "min": bin.min,
                        "max": bin.max,
                        "rms": bin.rms,
                    })).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print!("samples={}", summary.total_samples);
                if let Some(rate) = summary.sample_rate {
                    print!(" rate={rate}Hz");
                }
                if let Some(duration) = summary.duration {
                    print!(" duration={:.3}s", duration.as_secs_f64());
                }
                println!();
                if summary.non_finite_samples > 0 {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        format!("{} non-finite samples skipped", summary.non_finite_samples)
                            .yellow()
                    );
                }
                for (index, bin) in summary.bins.iter().enumerate() {
                    println!(
                        "{index:>4} min={:+.4} max={:+.4} rms={:.4}",
                        bin.min, bin.max, bin.rms
                    );
                }
            }
        }
        #[cfg(feature = "probe")]
        Commands::Probe { input, json } => {
            use wavelab::validation::{Severity, validate_render};

            let metadata = wavelab::probe::probe_video(&input)?;
            let report = validate_render(&metadata, &render);
            if json {
                let payload = json!({
                    "format": metadata.format,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "video": metadata.video.as_ref().map(|video| json!({
                        "width": video.width,
                        "height": video.height,
                        "fps": video.frames_per_second,
                        "codec": video.codec,
                    })),
                    "audio": metadata.audio.as_ref().map(|audio| json!({
                        "sample_rate": audio.sample_rate,
                        "channels": audio.channels,
                        "codec": audio.codec,
                    })),
                    "valid": report.is_valid(),
                    "warnings": report.messages(Severity::Warning).collect::<Vec<_>>(),
                    "errors": report.messages(Severity::Error).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print!("{report}");
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "wavelab", &mut io::stdout());
        }
    }

    Ok(())
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            // Usage problems exit with 1; --help and --version exit cleanly.
            let code = if error.use_stderr() { 1 } else { 0 };
            let _ = error.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.global.verbose);

    if let Err(error) = run(cli) {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
