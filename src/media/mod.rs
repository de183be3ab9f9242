// SPDX-License-Identifier: MPL-2.0
//! Media access: FFmpeg initialization, container probing, and the
//! codec facade used by the decode thread.

pub mod ffmpeg;
pub mod source;

pub use ffmpeg::{init_ffmpeg, probe, AudioParams, MediaProbe};
pub use source::{timestamp_to_secs, MediaSource, StreamKind};
