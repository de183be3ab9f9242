// SPDX-License-Identifier: MPL-2.0
//! The playback engine: decode worker, presentation clock, queues,
//! scaler, tempo pipeline, audio sink, and the transport controller
//! that ties them together.

pub mod clock;
mod decode;
pub mod engine;
pub mod events;
pub mod queue;
pub mod scale;
pub mod shared;
pub mod sink;
pub mod tempo;

pub use clock::PlaybackClock;
pub use engine::PlayerEngine;
pub use events::{EventHub, PlayerEvent};
pub use queue::{AudioChunk, AudioQueue, FrameQueue, VideoFrame};
pub use scale::{FrameScaler, ScalerKey, ScalingQuality};
pub use shared::SharedState;
pub use sink::{AudioSink, SinkDriver};
pub use tempo::{decompose_rate, TempoParams, TempoPipeline};
