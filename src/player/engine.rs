// SPDX-License-Identifier: MPL-2.0
//! The externally visible playback engine.
//!
//! [`PlayerEngine`] owns the shared control state, the decode worker,
//! and the audio sink. Transport operations may be called from any
//! thread except the decode loop itself; each one stores flags or
//! payload fields that the worker observes at its next loop boundary.

use crate::error::{Error, Result};
use crate::media::{probe, MediaProbe};
use crate::player::clock::PlaybackClock;
use crate::player::decode::{self, DecodeContext};
use crate::player::events::{EventHub, PlayerEvent};
use crate::player::queue::{AudioQueue, FrameQueue};
use crate::player::scale::ScalingQuality;
use crate::player::shared::SharedState;
use crate::player::sink::{AudioSink, SinkDriver};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

/// One opened container and the resources serving it.
struct Session {
    path: PathBuf,
    info: MediaProbe,
    worker: Option<JoinHandle<()>>,
    sink: Option<AudioSink>,
    driver: Option<SinkDriver>,
}

/// Local video playback engine.
///
/// Decodes a container's video and audio streams, schedules frames
/// against a wall-clock reference, and drives the audio device. Frames
/// and position updates reach consumers through [`PlayerEvent`]s.
pub struct PlayerEngine {
    shared: Arc<SharedState>,
    clock: Arc<PlaybackClock>,
    video_queue: Arc<FrameQueue>,
    audio_queue: Arc<AudioQueue>,
    events: EventHub,
    session: Option<Session>,
}

impl Default for PlayerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SharedState::new()),
            clock: Arc::new(PlaybackClock::new()),
            video_queue: Arc::new(FrameQueue::default()),
            audio_queue: Arc::new(AudioQueue::new()),
            events: EventHub::new(),
            session: None,
        }
    }

    /// Registers an event subscriber.
    #[must_use]
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// Opens a container, closing any current session first.
    ///
    /// On failure no partial state is retained; the engine stays closed.
    pub fn open<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.stop();

        let info = probe(&path)?;
        self.session = Some(Session {
            path: path.as_ref().to_path_buf(),
            info,
            worker: None,
            sink: None,
            driver: None,
        });
        Ok(())
    }

    /// Whether a container is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Metadata of the open container.
    #[must_use]
    pub fn metadata(&self) -> Option<&MediaProbe> {
        self.session.as_ref().map(|s| &s.info)
    }

    /// Duration in seconds, 0.0 when nothing is open or unknown.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.info.duration_secs)
    }

    /// Starts playback, or resumes it when already started.
    ///
    /// The first call spawns the decode worker and opens the audio sink;
    /// later calls clear the pause flag and fold the paused interval
    /// into the presentation clock.
    pub fn play(&mut self) -> Result<()> {
        if self.session.is_none() {
            return Err(Error::NotOpen);
        }

        let worker_running = self
            .session
            .as_ref()
            .is_some_and(|s| s.worker.is_some());

        if worker_running {
            self.clock.resume();
            self.shared.set_paused(false);
            if let Some(sink) = self.session.as_ref().and_then(|s| s.sink.as_ref()) {
                sink.resume();
            }
            self.events.emit(PlayerEvent::PlayingChanged(true));
            return Ok(());
        }

        self.shared.set_stop_requested(false);
        self.shared.set_paused(false);
        self.shared.set_finished(false);
        self.shared.set_playing(true);

        self.open_sink();
        self.spawn_worker();
        self.events.emit(PlayerEvent::PlayingChanged(true));
        Ok(())
    }

    /// Pauses playback at the current position.
    pub fn pause(&mut self) {
        let worker_running = self
            .session
            .as_ref()
            .is_some_and(|s| s.worker.is_some());
        if !worker_running || self.shared.paused() {
            return;
        }

        self.clock.mark_pause();
        self.shared.set_paused(true);
        if let Some(sink) = self.session.as_ref().and_then(|s| s.sink.as_ref()) {
            sink.suspend();
        }
        self.events.emit(PlayerEvent::PlayingChanged(false));
    }

    /// Stops playback and tears down the session.
    ///
    /// Joins the decode worker synchronously; afterwards the engine is
    /// externally indistinguishable from one that never opened a file.
    pub fn stop(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        self.shared.set_stop_requested(true);
        self.shared.set_paused(false);
        self.shared.set_playing(false);

        if let Some(worker) = session.worker.take() {
            let _ = worker.join();
        }
        if let Some(mut driver) = session.driver.take() {
            driver.stop();
        }
        session.sink = None;

        self.video_queue.clear();
        self.audio_queue.clear();
        self.shared.reset();
        self.clock.reset();
        self.events.emit(PlayerEvent::PlayingChanged(false));
    }

    /// Requests a seek to `target_secs` (clamped to the duration).
    ///
    /// Queues are cleared immediately, the audio anchor resets, and the
    /// worker performs the demuxer seek plus decoder flush at its next
    /// loop boundary. Seeking clears `finished` and resumes playback.
    pub fn seek(&mut self, target_secs: f64) -> Result<()> {
        let Some(session) = self.session.as_ref() else {
            return Err(Error::NotOpen);
        };

        let duration = session.info.duration_secs;
        let target = if duration > 0.0 {
            target_secs.clamp(0.0, duration)
        } else {
            target_secs.max(0.0)
        };

        self.video_queue.clear();
        self.audio_queue.clear();
        self.shared.reset_audio_anchor();
        if let Some(sink) = session.sink.as_ref() {
            sink.clear();
            sink.resume();
        }

        self.shared.set_finished(false);
        self.shared.request_seek(target);
        self.shared.set_paused(false);
        self.events.emit(PlayerEvent::PlayingChanged(true));
        Ok(())
    }

    /// Jumps `delta_secs` relative to the current position (negative
    /// values rewind). The destination is clamped to `[0, duration]`.
    pub fn forward(&mut self, delta_secs: f64) -> Result<()> {
        if self.session.is_none() {
            return Err(Error::NotOpen);
        }
        let target = self.current_position() + delta_secs;
        self.seek(target)
    }

    /// Best-effort current position in seconds.
    ///
    /// Prefers the newest queued video frame, then the audio anchor plus
    /// played samples converted through the playback rate, then the
    /// clock anchor.
    #[must_use]
    pub fn current_position(&self) -> f64 {
        if let Some(pts) = self.video_queue.tail_pts() {
            return pts;
        }

        if let (Some(base), Some(audio)) = (
            self.shared.audio_anchor(),
            self.session.as_ref().and_then(|s| s.info.audio),
        ) {
            // The sink consumes samples at the codec rate in wall time,
            // so media position advances `rate` times faster.
            let played = self.shared.audio_samples_written() as f64
                / f64::from(audio.sample_rate);
            return base + played * self.shared.rate();
        }

        if self.clock.started() {
            self.clock.start_pts()
        } else {
            0.0
        }
    }

    /// Changes the playback rate, keeping the current position.
    ///
    /// Non-positive rates are ignored. The tempo pipeline rebuild and
    /// the resulting audio re-anchor happen on the decode thread.
    pub fn set_rate(&mut self, rate: f64) {
        if rate <= 0.0 || !rate.is_finite() {
            log::warn!("ignoring non-positive playback rate {rate}");
            return;
        }

        let position = self.current_position();
        self.shared.set_rate(rate);
        if self.clock.started() {
            self.clock.anchor(position);
        }

        self.audio_queue.clear();
        if let Some(sink) = self.session.as_ref().and_then(|s| s.sink.as_ref()) {
            sink.clear();
        }
        self.shared.reset_audio_anchor();
        self.shared.raise_audio_filter_reset();
    }

    /// Current playback rate.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.shared.rate()
    }

    /// Sets the render target size in pixels. Zero dimensions are
    /// ignored; the scaler rebuilds at the next frame boundary.
    pub fn set_render_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.shared.set_render_size(width, height);
        self.shared.raise_sws_reset();
    }

    /// Selects the scaling quality; takes effect at the next frame.
    pub fn set_scaling_quality(&mut self, quality: ScalingQuality) {
        self.shared.set_scaling_quality(quality);
        self.shared.raise_sws_reset();
    }

    #[must_use]
    pub fn scaling_quality(&self) -> ScalingQuality {
        self.shared.scaling_quality()
    }

    /// Whether the engine is actively playing (worker running and not
    /// paused).
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.shared.playing() && !self.shared.paused()
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.shared.playing() && self.shared.paused()
    }

    /// Whether the end of the stream has been reached.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.shared.finished()
    }

    /// Opens the audio sink for the session, demoting to silent playback
    /// when the device refuses every candidate rate.
    fn open_sink(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(audio) = session.info.audio else {
            return;
        };

        match AudioSink::open(audio.sample_rate) {
            Ok(sink) => {
                let driver = SinkDriver::start(
                    Arc::clone(&self.shared),
                    Arc::clone(&self.audio_queue),
                    sink.buffer(),
                    sink.channels(),
                );
                session.sink = Some(sink);
                session.driver = Some(driver);
            }
            Err(e) => {
                log::warn!("audio disabled for this session: {e}");
            }
        }
    }

    fn spawn_worker(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let ctx = DecodeContext {
            path: session.path.clone(),
            shared: Arc::clone(&self.shared),
            clock: Arc::clone(&self.clock),
            video_queue: Arc::clone(&self.video_queue),
            audio_queue: Arc::clone(&self.audio_queue),
            events: self.events.clone(),
        };
        session.worker = Some(std::thread::spawn(move || decode::run(ctx)));
    }
}

impl Drop for PlayerEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
