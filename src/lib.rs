// SPDX-License-Identifier: MPL-2.0
//! `marquee` is a local video playback engine built on FFmpeg.
//!
//! It opens a container file, decodes its video and audio streams on a
//! dedicated worker thread, scales video to a caller-chosen render size,
//! applies tempo-preserving rate changes to audio, paces frames against
//! a wall-clock presentation reference, and drives the audio output
//! device. Consumers subscribe to [`PlayerEvent`]s for frames and
//! position updates; GUI surfaces, file browsing, and input handling
//! live outside this crate.
//!
//! ```no_run
//! use marquee::{PlayerEngine, PlayerEvent};
//!
//! let mut engine = PlayerEngine::new();
//! let events = engine.subscribe();
//! engine.open("movie.mp4")?;
//! engine.play()?;
//!
//! while let Ok(event) = events.recv() {
//!     match event {
//!         PlayerEvent::FrameReady(_frame) => { /* upload to the surface */ }
//!         PlayerEvent::PositionChanged(_secs) => { /* move the slider */ }
//!         PlayerEvent::Finished => break,
//!         PlayerEvent::PlayingChanged(_) => {}
//!     }
//! }
//! # Ok::<(), marquee::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod media;
pub mod player;

pub use error::{Error, Result};
pub use media::{AudioParams, MediaProbe};
pub use player::{PlayerEngine, PlayerEvent, ScalingQuality, VideoFrame};
