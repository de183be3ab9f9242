// SPDX-License-Identifier: MPL-2.0
//! Error types for the playback engine.
//!
//! Fatal conditions surface only from `open`; everything that happens on
//! the decode path is logged and recovered, so the variants here map to
//! the places where a caller can actually observe a failure.

use std::fmt;

#[derive(Debug, Clone)]
pub enum Error {
    /// The container could not be opened or its stream info is unreadable.
    Open(String),

    /// The file was opened but contains no video stream.
    NoVideoStream,

    /// A decoder context could not be created or opened.
    DecoderInit(String),

    /// The software scaler could not be constructed, including the
    /// fast-bilinear fallback.
    ScalerInit(String),

    /// The audio tempo filter graph could not be built.
    FilterInit(String),

    /// No audio output device configuration could be negotiated.
    AudioDevice(String),

    /// The demuxer rejected a seek even with relaxed flags.
    SeekFailed(String),

    /// A transport operation was issued without an open container.
    NotOpen,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Open(msg) => write!(f, "failed to open media: {msg}"),
            Error::NoVideoStream => write!(f, "no video stream found"),
            Error::DecoderInit(msg) => write!(f, "decoder init failed: {msg}"),
            Error::ScalerInit(msg) => write!(f, "scaler init failed: {msg}"),
            Error::FilterInit(msg) => write!(f, "audio filter init failed: {msg}"),
            Error::AudioDevice(msg) => write!(f, "audio device error: {msg}"),
            Error::SeekFailed(msg) => write!(f, "seek failed: {msg}"),
            Error::NotOpen => write!(f, "no media is open"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ffmpeg_next::Error> for Error {
    fn from(err: ffmpeg_next::Error) -> Self {
        Error::Open(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_open_error() {
        let err = Error::Open("bad header".to_string());
        assert_eq!(format!("{}", err), "failed to open media: bad header");
    }

    #[test]
    fn display_formats_no_video_stream() {
        assert_eq!(format!("{}", Error::NoVideoStream), "no video stream found");
    }

    #[test]
    fn display_formats_not_open() {
        assert_eq!(format!("{}", Error::NotOpen), "no media is open");
    }

    #[test]
    fn from_ffmpeg_error_produces_open_variant() {
        let err: Error = ffmpeg_next::Error::InvalidData.into();
        match err {
            Error::Open(message) => assert!(!message.is_empty()),
            _ => panic!("expected Open variant"),
        }
    }

    #[test]
    fn seek_failed_carries_message() {
        let err = Error::SeekFailed("timestamp out of range".into());
        assert!(format!("{}", err).contains("timestamp out of range"));
    }
}
