// SPDX-License-Identifier: MPL-2.0
//! Codec facade over the FFmpeg demuxer and per-stream decoders.
//!
//! A [`MediaSource`] owns the opened container and both decoder contexts.
//! It is created on the decode thread and never leaves it; all methods
//! are synchronous and single-threaded per opened container.

use crate::error::{Error, Result};
use crate::media::ffmpeg::init_ffmpeg;
use crate::player::tempo::TempoParams;
use std::path::Path;

/// Which elementary stream a demuxed packet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Video,
    Audio,
}

/// Converts a raw stream timestamp to seconds.
///
/// Prefers the frame's own PTS, falls back to the best-effort timestamp,
/// and finally to 0.0 when the stream carries neither.
pub fn timestamp_to_secs(pts: Option<i64>, best_effort: Option<i64>, time_base: f64) -> f64 {
    match pts.or(best_effort) {
        Some(ts) => ts as f64 * time_base,
        None => 0.0,
    }
}

/// An opened container with its video decoder and optional audio decoder.
pub struct MediaSource {
    input: ffmpeg_next::format::context::Input,
    video_index: usize,
    audio_index: Option<usize>,
    video_decoder: ffmpeg_next::decoder::Video,
    audio_decoder: Option<ffmpeg_next::decoder::Audio>,
    video_time_base: f64,
    audio_time_base: f64,
    audio_time_base_rational: (i32, i32),
    duration_secs: f64,
}

impl MediaSource {
    /// Opens a container and allocates decoder contexts for its streams.
    ///
    /// A missing or unopenable audio decoder demotes the session to
    /// video-only; a missing video stream is an error.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        init_ffmpeg()?;

        let input = ffmpeg_next::format::input(&path)
            .map_err(|e| Error::Open(format!("failed to open container: {e}")))?;

        let video_stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or(Error::NoVideoStream)?;
        let video_index = video_stream.index();
        let video_tb = video_stream.time_base();
        let video_time_base = f64::from(video_tb.numerator()) / f64::from(video_tb.denominator());

        let duration_secs = if video_stream.duration() > 0 {
            video_stream.duration() as f64 * video_time_base
        } else if input.duration() > 0 {
            input.duration() as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE)
        } else {
            0.0
        };

        let video_decoder =
            ffmpeg_next::codec::context::Context::from_parameters(video_stream.parameters())
                .map_err(|e| Error::DecoderInit(format!("video codec context: {e}")))?
                .decoder()
                .video()
                .map_err(|e| Error::DecoderInit(format!("video decoder: {e}")))?;

        let mut audio_index = None;
        let mut audio_decoder = None;
        let mut audio_time_base = 0.0;
        let mut audio_time_base_rational = (0, 1);
        if let Some(audio_stream) = input.streams().best(ffmpeg_next::media::Type::Audio) {
            let decoded = ffmpeg_next::codec::context::Context::from_parameters(
                audio_stream.parameters(),
            )
            .ok()
            .and_then(|ctx| ctx.decoder().audio().ok());

            match decoded {
                Some(decoder) => {
                    let tb = audio_stream.time_base();
                    audio_time_base = f64::from(tb.numerator()) / f64::from(tb.denominator());
                    audio_time_base_rational = (tb.numerator(), tb.denominator());
                    audio_index = Some(audio_stream.index());
                    audio_decoder = Some(decoder);
                }
                None => {
                    log::warn!("audio decoder unavailable, continuing with video only");
                }
            }
        }

        Ok(Self {
            input,
            video_index,
            audio_index,
            video_decoder,
            audio_decoder,
            video_time_base,
            audio_time_base,
            audio_time_base_rational,
            duration_secs,
        })
    }

    /// Reads the next packet belonging to the video or audio stream.
    ///
    /// Packets from other streams (subtitles, data) are skipped. Returns
    /// `None` at end of stream.
    pub fn read_packet(&mut self) -> Option<(StreamKind, ffmpeg_next::Packet)> {
        loop {
            let (index, packet) = {
                let mut packets = self.input.packets();
                let (stream, packet) = packets.next()?;
                (stream.index(), packet)
            };

            if index == self.video_index {
                return Some((StreamKind::Video, packet));
            }
            if Some(index) == self.audio_index {
                return Some((StreamKind::Audio, packet));
            }
        }
    }

    /// Seeks the demuxer to `target_secs`.
    ///
    /// First asks for the keyframe at or before the target so the decoder
    /// can run forward to it; if the demuxer rejects that, retries with an
    /// unconstrained range.
    pub fn seek_to(&mut self, target_secs: f64) -> Result<()> {
        let ts = (target_secs * f64::from(ffmpeg_next::ffi::AV_TIME_BASE)) as i64;

        if self.input.seek(ts, ..ts).is_ok() {
            return Ok(());
        }
        self.input
            .seek(ts, ..)
            .map_err(|e| Error::SeekFailed(format!("target {target_secs:.3}s: {e}")))
    }

    /// Flushes both decoder contexts, discarding buffered frames.
    pub fn flush_decoders(&mut self) {
        self.video_decoder.flush();
        if let Some(decoder) = self.audio_decoder.as_mut() {
            decoder.flush();
        }
    }

    /// PTS of a decoded video frame in seconds.
    pub fn video_frame_secs(&self, frame: &ffmpeg_next::frame::Video) -> f64 {
        timestamp_to_secs(frame.pts(), frame.timestamp(), self.video_time_base)
    }

    /// PTS of a decoded audio frame in seconds.
    pub fn audio_frame_secs(&self, frame: &ffmpeg_next::frame::Audio) -> f64 {
        timestamp_to_secs(frame.pts(), frame.timestamp(), self.audio_time_base)
    }

    pub fn video_decoder_mut(&mut self) -> &mut ffmpeg_next::decoder::Video {
        &mut self.video_decoder
    }

    pub fn audio_decoder_mut(&mut self) -> Option<&mut ffmpeg_next::decoder::Audio> {
        self.audio_decoder.as_mut()
    }

    pub fn audio_decoder(&self) -> Option<&ffmpeg_next::decoder::Audio> {
        self.audio_decoder.as_ref()
    }

    /// Buffer-source parameters for the tempo pipeline.
    pub fn tempo_params(&self) -> Option<TempoParams> {
        self.audio_decoder
            .as_ref()
            .map(|decoder| TempoParams::from_decoder(decoder, self.audio_time_base_rational))
    }

    pub fn has_audio(&self) -> bool {
        self.audio_decoder.is_some()
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }
}
