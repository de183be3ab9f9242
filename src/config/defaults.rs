// SPDX-License-Identifier: MPL-2.0
//! Centralized default values for the playback engine.
//!
//! This module is the single source of truth for the engine's tunables.
//! Constants are organized by category.
//!
//! # Categories
//!
//! - **Queues**: video frame queue capacity and audio batching
//! - **Timing**: decode-loop poll intervals and pacing bounds
//! - **Audio**: sink tick, buffering, and sample-rate negotiation
//! - **Tempo**: atempo stage bounds for rate decomposition

// ==========================================================================
// Queue Defaults
// ==========================================================================

/// Hard cap on the video frame queue. On overflow the oldest frame is
/// dropped so a slow consumer cannot grow memory without bound.
pub const VIDEO_QUEUE_CAP: usize = 10;

/// Maximum number of decoded audio frames accumulated before they are fed
/// through the tempo pipeline as one batch.
pub const AUDIO_BATCH_MAX: usize = 8;

// ==========================================================================
// Timing Defaults
// ==========================================================================

/// Sleep between flag checks while the engine is paused (milliseconds).
pub const PAUSE_POLL_MS: u64 = 10;

/// Sleep between flag checks after end of stream (milliseconds).
pub const EOS_POLL_MS: u64 = 20;

/// Upper bound on a single presentation-clock sleep (milliseconds).
/// Bounds the latency between a control flag being raised and observed.
pub const MAX_FRAME_WAIT_MS: u64 = 200;

// ==========================================================================
// Audio Defaults
// ==========================================================================

/// Interval of the audio sink drain tick (milliseconds).
pub const SINK_TICK_MS: u64 = 15;

/// Size of the device-side sample buffer, in seconds of stereo audio.
/// Samples beyond this are dropped; the device buffer provides smoothing.
pub const SINK_BUFFER_SECS: usize = 1;

/// Output channel count delivered to the audio device.
pub const AUDIO_OUT_CHANNELS: u16 = 2;

/// Sample rates tried when the device rejects the codec's native rate.
pub const FALLBACK_SAMPLE_RATES: [u32; 2] = [48_000, 44_100];

// ==========================================================================
// Tempo Defaults
// ==========================================================================

/// Default playback rate.
pub const DEFAULT_RATE: f64 = 1.0;

/// Lowest tempo ratio a single atempo stage accepts.
pub const ATEMPO_STAGE_MIN: f64 = 0.5;

/// Highest tempo ratio a single atempo stage accepts.
pub const ATEMPO_STAGE_MAX: f64 = 2.0;

/// Residual ratios within this distance of 1.0 are treated as identity.
pub const TEMPO_IDENTITY_EPSILON: f64 = 0.01;

// ==========================================================================
// Compile-time Validation
// ==========================================================================

const _: () = {
    assert!(VIDEO_QUEUE_CAP >= 1);
    assert!(AUDIO_BATCH_MAX >= 1);
    assert!(PAUSE_POLL_MS > 0);
    assert!(EOS_POLL_MS > 0);
    assert!(MAX_FRAME_WAIT_MS >= PAUSE_POLL_MS);
    assert!(SINK_TICK_MS > 0);
    assert!(SINK_BUFFER_SECS >= 1);
    assert!(AUDIO_OUT_CHANNELS > 0);
    assert!(ATEMPO_STAGE_MIN < 1.0);
    assert!(ATEMPO_STAGE_MAX > 1.0);
    assert!(TEMPO_IDENTITY_EPSILON > 0.0);
    assert!(DEFAULT_RATE > 0.0);
};
