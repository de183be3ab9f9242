// SPDX-License-Identifier: MPL-2.0
//! Playback events delivered to subscribers.
//!
//! Events fire from the decode thread (frames, positions, end of stream)
//! and from the transport controller (playing state). Consumers receive
//! them on a channel and marshal to their own UI thread; the engine never
//! blocks on a subscriber.

use crate::player::queue::VideoFrame;
use std::sync::{Arc, Mutex};

/// Events emitted by the playback engine.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// A scaled frame is ready at the current render size.
    FrameReady(VideoFrame),

    /// The video PTS in seconds, emitted after pacing.
    PositionChanged(f64),

    /// End of stream was reached.
    Finished,

    /// The logical paused/playing state changed.
    PlayingChanged(bool),
}

/// Fan-out hub for [`PlayerEvent`]s.
///
/// Cloning the hub shares the subscriber list; receivers whose channel
/// has been dropped are pruned on the next emit.
#[derive(Debug, Clone, Default)]
pub struct EventHub {
    subscribers: Arc<Mutex<Vec<crossbeam_channel::Sender<PlayerEvent>>>>,
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber and returns its receiving end.
    #[must_use]
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<PlayerEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers
            .lock()
            .expect("subscriber list poisoned")
            .push(tx);
        rx
    }

    /// Delivers an event to every live subscriber.
    pub fn emit(&self, event: PlayerEvent) {
        let mut subscribers = self.subscribers.lock().expect("subscriber list poisoned");
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber list poisoned")
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_receives_events_in_order() {
        let hub = EventHub::new();
        let rx = hub.subscribe();

        hub.emit(PlayerEvent::PlayingChanged(true));
        hub.emit(PlayerEvent::PositionChanged(1.5));
        hub.emit(PlayerEvent::Finished);

        assert!(matches!(rx.recv().unwrap(), PlayerEvent::PlayingChanged(true)));
        match rx.recv().unwrap() {
            PlayerEvent::PositionChanged(p) => assert!((p - 1.5).abs() < f64::EPSILON),
            other => panic!("expected PositionChanged, got {other:?}"),
        }
        assert!(matches!(rx.recv().unwrap(), PlayerEvent::Finished));
    }

    #[test]
    fn multiple_subscribers_each_get_a_copy() {
        let hub = EventHub::new();
        let rx1 = hub.subscribe();
        let rx2 = hub.subscribe();

        hub.emit(PlayerEvent::Finished);

        assert!(matches!(rx1.recv().unwrap(), PlayerEvent::Finished));
        assert!(matches!(rx2.recv().unwrap(), PlayerEvent::Finished));
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let hub = EventHub::new();
        let rx = hub.subscribe();
        drop(rx);

        hub.emit(PlayerEvent::Finished);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn clones_share_the_subscriber_list() {
        let hub = EventHub::new();
        let clone = hub.clone();
        let rx = clone.subscribe();

        hub.emit(PlayerEvent::PlayingChanged(false));
        assert!(matches!(
            rx.recv().unwrap(),
            PlayerEvent::PlayingChanged(false)
        ));
    }
}
