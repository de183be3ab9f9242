// SPDX-License-Identifier: MPL-2.0
//! FFmpeg initialization and container probing.

use crate::error::{Error, Result};
use std::path::Path;
use std::sync::Once;

/// Static flag to ensure FFmpeg is initialized only once.
static FFMPEG_INIT: Once = Once::new();

/// Initialize FFmpeg with an appropriate log level.
///
/// Safe to call multiple times - initialization happens once thanks to
/// `std::sync::Once`. The av_log level is lowered to ERROR so container
/// chatter does not flood stderr during playback.
pub fn init_ffmpeg() -> Result<()> {
    let mut init_result: Result<()> = Ok(());

    FFMPEG_INIT.call_once(|| {
        if let Err(e) = ffmpeg_next::init() {
            init_result = Err(Error::Open(format!("FFmpeg initialization failed: {e}")));
            return;
        }

        // SAFETY: av_log_set_level is thread-safe and only affects logging
        unsafe {
            ffmpeg_next::ffi::av_log_set_level(ffmpeg_next::ffi::AV_LOG_ERROR);
        }
    });

    init_result
}

/// Audio stream parameters relevant to sink negotiation and position math.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioParams {
    /// Sample rate of the source stream in Hz.
    pub sample_rate: u32,
    /// Channel count of the source stream.
    pub channels: u16,
}

/// Container metadata gathered when a file is opened.
#[derive(Debug, Clone)]
pub struct MediaProbe {
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// Duration in seconds (0.0 when the container does not report one).
    pub duration_secs: f64,
    /// Average frames per second.
    pub fps: f64,
    /// Audio parameters, absent when the file has no usable audio stream.
    pub audio: Option<AudioParams>,
}

/// Probe a container without decoding any frames.
///
/// Validates that the file opens and carries a video stream; an audio
/// stream whose decoder cannot be opened is reported as absent so the
/// session demotes to video-only.
pub fn probe<P: AsRef<Path>>(path: P) -> Result<MediaProbe> {
    init_ffmpeg()?;

    let ictx = ffmpeg_next::format::input(&path)
        .map_err(|e| Error::Open(format!("failed to open container: {e}")))?;

    let video_stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .ok_or(Error::NoVideoStream)?;

    let decoder_ctx =
        ffmpeg_next::codec::context::Context::from_parameters(video_stream.parameters())
            .map_err(|e| Error::DecoderInit(format!("video codec context: {e}")))?;
    let decoder = decoder_ctx
        .decoder()
        .video()
        .map_err(|e| Error::DecoderInit(format!("video decoder: {e}")))?;

    let width = decoder.width();
    let height = decoder.height();
    if width == 0 || height == 0 {
        return Err(Error::Open(format!(
            "invalid video dimensions: {width}x{height}"
        )));
    }

    // Prefer the video stream's own duration; fall back to the container.
    let duration_secs = if video_stream.duration() > 0 {
        let tb = video_stream.time_base();
        video_stream.duration() as f64 * f64::from(tb.numerator()) / f64::from(tb.denominator())
    } else if ictx.duration() > 0 {
        ictx.duration() as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE)
    } else {
        0.0
    };

    let fps = {
        let rate = video_stream.avg_frame_rate();
        if rate.denominator() > 0 {
            f64::from(rate.numerator()) / f64::from(rate.denominator())
        } else {
            0.0
        }
    };

    let audio = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Audio)
        .and_then(|stream| {
            let ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
                .ok()?;
            let audio_decoder = ctx.decoder().audio().ok()?;
            Some(AudioParams {
                sample_rate: audio_decoder.rate(),
                channels: audio_decoder.channels(),
            })
        });

    Ok(MediaProbe {
        width,
        height,
        duration_secs,
        fps,
        audio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        assert!(init_ffmpeg().is_ok());
        assert!(init_ffmpeg().is_ok());
    }

    #[test]
    fn probe_fails_for_nonexistent_file() {
        let result = probe("/nonexistent/video.mp4");
        assert!(result.is_err());
    }

    #[test]
    fn probe_fails_for_garbage_data() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("garbage.mp4");
        std::fs::write(&path, b"not a real container").unwrap();

        let result = probe(&path);
        assert!(result.is_err());
    }

    #[test]
    fn probe_reports_metadata_for_sample() {
        let path = "tests/data/sample.mp4";
        if !std::path::Path::new(path).exists() {
            return;
        }

        let info = probe(path).unwrap();
        assert!(info.width > 0);
        assert!(info.height > 0);
        assert!(info.duration_secs > 0.0);
    }
}
