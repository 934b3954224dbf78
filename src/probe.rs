//! In-process inspection of rendered videos.
//!
//! Available with the `probe` feature. [`probe_video`] opens a rendered file
//! through `ffmpeg-next`, reads stream parameters, and closes it again. The
//! result feeds [`validate_render`](crate::validation::validate_render)
//! right after every render.
//!
//! # Example
//!
//! ```no_run
//! let metadata = wavelab::probe::probe_video("wave001/video.mp4")?;
//! println!("{:?} {}", metadata.duration, metadata.format);
//! # Ok::<(), wavelab::WavelabError>(())
//! ```

use std::{path::Path, time::Duration};

use ffmpeg_next::{codec::context::Context as CodecContext, media::Type, util::log::Level};

use crate::{
    error::WavelabError,
    metadata::{ArtifactMetadata, AudioMetadata, VideoMetadata},
};

/// Set the verbosity of the FFmpeg libraries used for probing.
///
/// Accepts the names ffmpeg's `-loglevel` takes (`quiet`, `panic`, `fatal`,
/// `error`, `warning`, `info`, `verbose`, `debug`, `trace`).
pub fn set_library_log_level(level: &str) -> Result<(), WavelabError> {
    let level = match level.to_ascii_lowercase().as_str() {
        "quiet" => Level::Quiet,
        "panic" => Level::Panic,
        "fatal" => Level::Fatal,
        "error" => Level::Error,
        "warning" | "warn" => Level::Warning,
        "info" => Level::Info,
        "verbose" => Level::Verbose,
        "debug" => Level::Debug,
        "trace" => Level::Trace,
        other => {
            return Err(WavelabError::InvalidArgument(format!(
                "unsupported log level: {other}"
            )));
        }
    };
    ffmpeg_next::util::log::set_level(level);
    Ok(())
}

fn frames_per_second(stream: &ffmpeg_next::Stream) -> f64 {
    [stream.avg_frame_rate(), stream.rate()]
        .into_iter()
        .find(|rate| rate.denominator() != 0 && rate.numerator() != 0)
        .map_or(0.0, |rate| {
            f64::from(rate.numerator()) / f64::from(rate.denominator())
        })
}

/// Open `path`, read its stream parameters, and close it.
///
/// # Errors
///
/// Returns [`WavelabError::FileOpen`] if FFmpeg cannot open the file, and
/// [`WavelabError::FfmpegError`] if the libraries fail to initialise or to
/// build a decoder for one of its streams.
pub fn probe_video<P: AsRef<Path>>(path: P) -> Result<ArtifactMetadata, WavelabError> {
    let path = path.as_ref();
    ffmpeg_next::init()?;
    log::debug!("Probing {}", path.display());

    let input_context =
        ffmpeg_next::format::input(&path).map_err(|error| WavelabError::FileOpen {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;

    let duration_microseconds = input_context.duration();
    let duration = if duration_microseconds > 0 {
        Duration::from_micros(duration_microseconds as u64)
    } else {
        Duration::ZERO
    };
    let format = input_context.format().name().to_string();

    let video = match input_context.streams().best(Type::Video) {
        Some(stream) => {
            let decoder = CodecContext::from_parameters(stream.parameters())?
                .decoder()
                .video()?;
            Some(VideoMetadata {
                width: decoder.width(),
                height: decoder.height(),
                frames_per_second: frames_per_second(&stream),
                codec: decoder
                    .codec()
                    .map_or_else(|| "unknown".to_string(), |codec| codec.name().to_string()),
            })
        }
        None => None,
    };

    let audio = match input_context.streams().best(Type::Audio) {
        Some(stream) => {
            let decoder = CodecContext::from_parameters(stream.parameters())?
                .decoder()
                .audio()?;
            Some(AudioMetadata {
                sample_rate: decoder.rate(),
                channels: decoder.channels(),
                codec: decoder
                    .codec()
                    .map_or_else(|| "unknown".to_string(), |codec| codec.name().to_string()),
            })
        }
        None => None,
    };

    Ok(ArtifactMetadata {
        video,
        audio,
        duration,
        format,
    })
}
