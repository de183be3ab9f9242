// SPDX-License-Identifier: MPL-2.0
//! Atomic control and position state shared between the transport
//! controller and the decode thread.
//!
//! Every signal here is idempotent latest-wins, so plain atomics replace
//! a command queue: the controller stores flags and payload fields, and
//! the decode loop observes them at its loop boundaries. Floating-point
//! fields are stored as `u64` bit patterns for atomic access.

use crate::config::DEFAULT_RATE;
use crate::player::scale::ScalingQuality;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};

/// Sentinel meaning "no audio chunk enqueued since the last flush".
const AUDIO_ANCHOR_UNSET: f64 = -1.0;

/// Shared playback state.
///
/// The controller writes transport flags from any thread; the decode
/// loop reads all of them and writes only position-related fields.
#[derive(Debug)]
pub struct SharedState {
    stop_requested: AtomicBool,
    paused: AtomicBool,
    playing: AtomicBool,
    finished: AtomicBool,
    seek_requested: AtomicBool,
    sws_needs_reset: AtomicBool,
    audio_filter_needs_reset: AtomicBool,

    /// Playback rate as f64 bits.
    rate_bits: AtomicU64,
    /// Seek target in seconds as f64 bits.
    seek_target_bits: AtomicU64,
    /// Target render size; 0 means "use source dimensions".
    render_width: AtomicU32,
    render_height: AtomicU32,
    /// Scaling quality as its discriminant.
    scaling_quality: AtomicU8,

    /// PTS of the first audio chunk since the last anchor, f64 bits.
    audio_base_pts_bits: AtomicU64,
    /// Running count of per-channel samples the sink has accepted.
    audio_samples_written: AtomicU64,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            seek_requested: AtomicBool::new(false),
            sws_needs_reset: AtomicBool::new(false),
            audio_filter_needs_reset: AtomicBool::new(false),
            rate_bits: AtomicU64::new(DEFAULT_RATE.to_bits()),
            seek_target_bits: AtomicU64::new(0f64.to_bits()),
            render_width: AtomicU32::new(0),
            render_height: AtomicU32::new(0),
            scaling_quality: AtomicU8::new(ScalingQuality::default() as u8),
            audio_base_pts_bits: AtomicU64::new(AUDIO_ANCHOR_UNSET.to_bits()),
            audio_samples_written: AtomicU64::new(0),
        }
    }

    /// Resets every field to its post-open default.
    pub fn reset(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.playing.store(false, Ordering::SeqCst);
        self.finished.store(false, Ordering::SeqCst);
        self.seek_requested.store(false, Ordering::SeqCst);
        self.sws_needs_reset.store(false, Ordering::SeqCst);
        self.audio_filter_needs_reset.store(false, Ordering::SeqCst);
        self.seek_target_bits.store(0f64.to_bits(), Ordering::SeqCst);
        self.reset_audio_anchor();
    }

    // ---- transport flags ----

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn set_stop_requested(&self, value: bool) {
        self.stop_requested.store(value, Ordering::SeqCst);
    }

    pub fn paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, value: bool) {
        self.paused.store(value, Ordering::SeqCst);
    }

    pub fn playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn set_playing(&self, value: bool) {
        self.playing.store(value, Ordering::SeqCst);
    }

    pub fn finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn set_finished(&self, value: bool) {
        self.finished.store(value, Ordering::SeqCst);
    }

    // ---- seek ----

    pub fn request_seek(&self, target_secs: f64) {
        self.seek_target_bits
            .store(target_secs.to_bits(), Ordering::SeqCst);
        self.seek_requested.store(true, Ordering::SeqCst);
    }

    /// Consumes a pending seek request, returning its target.
    pub fn take_seek_request(&self) -> Option<f64> {
        if self.seek_requested.swap(false, Ordering::SeqCst) {
            Some(f64::from_bits(self.seek_target_bits.load(Ordering::SeqCst)))
        } else {
            None
        }
    }

    // ---- reconfiguration triggers ----

    pub fn raise_sws_reset(&self) {
        self.sws_needs_reset.store(true, Ordering::SeqCst);
    }

    pub fn take_sws_reset(&self) -> bool {
        self.sws_needs_reset.swap(false, Ordering::SeqCst)
    }

    pub fn raise_audio_filter_reset(&self) {
        self.audio_filter_needs_reset.store(true, Ordering::SeqCst);
    }

    pub fn take_audio_filter_reset(&self) -> bool {
        self.audio_filter_needs_reset.swap(false, Ordering::SeqCst)
    }

    // ---- rate / render configuration ----

    pub fn rate(&self) -> f64 {
        f64::from_bits(self.rate_bits.load(Ordering::SeqCst))
    }

    pub fn set_rate(&self, rate: f64) {
        self.rate_bits.store(rate.to_bits(), Ordering::SeqCst);
    }

    /// Target render size, falling back to the given source dimensions
    /// when unset.
    pub fn render_size_or(&self, src_width: u32, src_height: u32) -> (u32, u32) {
        let w = self.render_width.load(Ordering::SeqCst);
        let h = self.render_height.load(Ordering::SeqCst);
        if w == 0 || h == 0 {
            (src_width, src_height)
        } else {
            (w, h)
        }
    }

    pub fn set_render_size(&self, width: u32, height: u32) {
        self.render_width.store(width, Ordering::SeqCst);
        self.render_height.store(height, Ordering::SeqCst);
    }

    pub fn scaling_quality(&self) -> ScalingQuality {
        ScalingQuality::from_u8(self.scaling_quality.load(Ordering::SeqCst))
    }

    pub fn set_scaling_quality(&self, quality: ScalingQuality) {
        self.scaling_quality.store(quality as u8, Ordering::SeqCst);
    }

    // ---- audio position tracking ----

    /// PTS anchoring the audio stream, or `None` until the first chunk
    /// since the last flush has been enqueued.
    pub fn audio_anchor(&self) -> Option<f64> {
        let pts = f64::from_bits(self.audio_base_pts_bits.load(Ordering::SeqCst));
        if pts < 0.0 {
            None
        } else {
            Some(pts)
        }
    }

    /// Records `pts` as the audio anchor if none is set.
    pub fn anchor_audio_if_unset(&self, pts: f64) {
        let unset = AUDIO_ANCHOR_UNSET.to_bits();
        let _ = self.audio_base_pts_bits.compare_exchange(
            unset,
            pts.to_bits(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Clears the audio anchor and the written-sample counter.
    pub fn reset_audio_anchor(&self) {
        self.audio_base_pts_bits
            .store(AUDIO_ANCHOR_UNSET.to_bits(), Ordering::SeqCst);
        self.audio_samples_written.store(0, Ordering::SeqCst);
    }

    pub fn audio_samples_written(&self) -> u64 {
        self.audio_samples_written.load(Ordering::SeqCst)
    }

    pub fn add_audio_samples_written(&self, samples: u64) {
        self.audio_samples_written
            .fetch_add(samples, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_idle() {
        let state = SharedState::new();
        assert!(!state.stop_requested());
        assert!(!state.paused());
        assert!(!state.playing());
        assert!(!state.finished());
        assert!((state.rate() - 1.0).abs() < f64::EPSILON);
        assert!(state.audio_anchor().is_none());
        assert_eq!(state.audio_samples_written(), 0);
    }

    #[test]
    fn rate_round_trips_through_bits() {
        let state = SharedState::new();
        state.set_rate(0.25);
        assert!((state.rate() - 0.25).abs() < f64::EPSILON);
        state.set_rate(4.0);
        assert!((state.rate() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn seek_request_is_consumed_once() {
        let state = SharedState::new();
        state.request_seek(12.5);

        let target = state.take_seek_request();
        assert!((target.unwrap() - 12.5).abs() < f64::EPSILON);
        assert!(state.take_seek_request().is_none());
    }

    #[test]
    fn repeated_reset_flags_collapse_to_one_observation() {
        let state = SharedState::new();
        state.raise_sws_reset();
        state.raise_sws_reset();

        assert!(state.take_sws_reset());
        assert!(!state.take_sws_reset());
    }

    #[test]
    fn render_size_zero_means_source_dimensions() {
        let state = SharedState::new();
        assert_eq!(state.render_size_or(1920, 1080), (1920, 1080));

        state.set_render_size(640, 360);
        assert_eq!(state.render_size_or(1920, 1080), (640, 360));
    }

    #[test]
    fn audio_anchor_sets_only_once() {
        let state = SharedState::new();
        assert!(state.audio_anchor().is_none());

        state.anchor_audio_if_unset(2.5);
        state.anchor_audio_if_unset(9.0);
        assert!((state.audio_anchor().unwrap() - 2.5).abs() < f64::EPSILON);

        state.reset_audio_anchor();
        assert!(state.audio_anchor().is_none());
    }

    #[test]
    fn anchor_can_be_zero_seconds() {
        let state = SharedState::new();
        state.anchor_audio_if_unset(0.0);
        assert_eq!(state.audio_anchor(), Some(0.0));
    }

    #[test]
    fn sample_counter_accumulates() {
        let state = SharedState::new();
        state.add_audio_samples_written(1024);
        state.add_audio_samples_written(512);
        assert_eq!(state.audio_samples_written(), 1536);

        state.reset_audio_anchor();
        assert_eq!(state.audio_samples_written(), 0);
    }
}
