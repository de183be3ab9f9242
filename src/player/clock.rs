// SPDX-License-Identifier: MPL-2.0
//! Presentation clock for video frame pacing.
//!
//! The clock is a monotonic wall-clock timer anchored to the PTS of the
//! first video frame after play-start or seek. Accumulated pause time is
//! subtracted from the elapsed reading, and the target instant of a frame
//! scales inversely with the playback rate. The struct is fully lock-free:
//! the decode thread anchors and reads it, the controller records pause
//! and resume transitions.

use crate::config::MAX_FRAME_WAIT_MS;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Reference instant for converting `Instant` to/from atomic milliseconds.
static REFERENCE_INSTANT: OnceLock<Instant> = OnceLock::new();

/// Milliseconds since the process-wide reference instant.
fn now_ms() -> u64 {
    let reference = REFERENCE_INSTANT.get_or_init(Instant::now);
    reference.elapsed().as_millis() as u64
}

/// Wall-clock reference for scheduling video frames.
#[derive(Debug)]
pub struct PlaybackClock {
    /// Whether an anchor frame has been presented since the last reset.
    started: AtomicBool,

    /// Timer start as milliseconds since `REFERENCE_INSTANT`.
    timer_start_ms: AtomicU64,

    /// PTS anchoring the clock, f64 bits.
    start_pts_bits: AtomicU64,

    /// Total paused wall-clock time accumulated since the anchor.
    total_paused_ms: AtomicU64,

    /// Timer reading at the moment of the current pause; 0 when not
    /// paused or when pause was recorded before the anchor.
    pause_start_ms: AtomicU64,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
            timer_start_ms: AtomicU64::new(0),
            start_pts_bits: AtomicU64::new(0f64.to_bits()),
            total_paused_ms: AtomicU64::new(0),
            pause_start_ms: AtomicU64::new(0),
        }
    }

    /// Anchors the clock at `pts` and restarts the timer.
    pub fn anchor(&self, pts: f64) {
        self.start_pts_bits.store(pts.to_bits(), Ordering::SeqCst);
        self.timer_start_ms.store(now_ms(), Ordering::SeqCst);
        self.total_paused_ms.store(0, Ordering::SeqCst);
        self.pause_start_ms.store(0, Ordering::SeqCst);
        self.started.store(true, Ordering::SeqCst);
    }

    /// Clears the anchor; the next presented frame re-anchors the clock.
    pub fn reset(&self) {
        self.started.store(false, Ordering::SeqCst);
        self.total_paused_ms.store(0, Ordering::SeqCst);
        self.pause_start_ms.store(0, Ordering::SeqCst);
    }

    #[must_use]
    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// The PTS the clock is anchored on.
    #[must_use]
    pub fn start_pts(&self) -> f64 {
        f64::from_bits(self.start_pts_bits.load(Ordering::SeqCst))
    }

    /// Raw timer reading, without pause compensation.
    fn elapsed_raw_ms(&self) -> u64 {
        if !self.started() {
            return 0;
        }
        now_ms().saturating_sub(self.timer_start_ms.load(Ordering::SeqCst))
    }

    /// Records the start of a pause. A pause before the anchor exists is
    /// not recorded; there is nothing to compensate yet.
    pub fn mark_pause(&self) {
        let at = if self.started() {
            self.elapsed_raw_ms()
        } else {
            0
        };
        self.pause_start_ms.store(at, Ordering::SeqCst);
    }

    /// Folds the pending pause into the accumulated total.
    pub fn resume(&self) {
        let pause_start = self.pause_start_ms.swap(0, Ordering::SeqCst);
        if pause_start > 0 {
            let paused = self.elapsed_raw_ms().saturating_sub(pause_start);
            self.total_paused_ms.fetch_add(paused, Ordering::SeqCst);
        }
    }

    /// How long to sleep before presenting a frame with PTS `pts` at the
    /// given playback rate.
    ///
    /// ```text
    /// elapsed = timer - (pending pause | accumulated pauses)
    /// target  = (pts - start_pts) * 1000 / rate
    /// wait    = clamp(target - elapsed, 0, MAX_FRAME_WAIT_MS)
    /// ```
    ///
    /// The upper clamp keeps the decode loop responsive: flags raised by
    /// the controller are observed at most one clamp interval later.
    #[must_use]
    pub fn wait_for(&self, pts: f64, rate: f64) -> Duration {
        if !self.started() || rate <= 0.0 {
            return Duration::ZERO;
        }

        let raw = self.elapsed_raw_ms() as i64;
        let pause_start = self.pause_start_ms.load(Ordering::SeqCst) as i64;
        // During a pause the reading is frozen at the pause start; once
        // resumed, accumulated pauses are subtracted instead.
        let elapsed = if pause_start > 0 {
            pause_start
        } else {
            raw - self.total_paused_ms.load(Ordering::SeqCst) as i64
        };

        let target = ((pts - self.start_pts()) * 1000.0 / rate) as i64;
        let wait = (target - elapsed).clamp(0, MAX_FRAME_WAIT_MS as i64);
        Duration::from_millis(wait as u64)
    }
}
