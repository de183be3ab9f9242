// SPDX-License-Identifier: MPL-2.0
//! The decode worker.
//!
//! A single dedicated thread owns the container, both decoder contexts,
//! the scaler, and the tempo pipeline. The transport controller never
//! touches any of them; it raises atomic flags that the loop observes at
//! its boundaries. The loop never exits on a data-path error, only on
//! `stop_requested`.

use crate::config::{AUDIO_BATCH_MAX, EOS_POLL_MS, PAUSE_POLL_MS};
use crate::media::{MediaSource, StreamKind};
use crate::player::clock::PlaybackClock;
use crate::player::events::{EventHub, PlayerEvent};
use crate::player::queue::{AudioChunk, AudioQueue, FrameQueue};
use crate::player::scale::{FrameScaler, ScalerKey};
use crate::player::shared::SharedState;
use crate::player::tempo::{TempoParams, TempoPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Everything the worker thread needs, moved in at spawn.
pub(crate) struct DecodeContext {
    pub path: PathBuf,
    pub shared: Arc<SharedState>,
    pub clock: Arc<PlaybackClock>,
    pub video_queue: Arc<FrameQueue>,
    pub audio_queue: Arc<AudioQueue>,
    pub events: EventHub,
}

/// Entry point of the decode thread.
pub(crate) fn run(ctx: DecodeContext) {
    let DecodeContext {
        path,
        shared,
        clock,
        video_queue,
        audio_queue,
        events,
    } = ctx;

    let mut source = match MediaSource::open(&path) {
        Ok(source) => source,
        Err(e) => {
            log::error!("decode thread could not open {}: {e}", path.display());
            return;
        }
    };

    let tempo_params = source.tempo_params();

    let mut scaler: Option<FrameScaler> = None;
    let mut tempo: Option<TempoPipeline> = None;
    // Latched on build failure; audio stays silent until the next rebuild
    // trigger (seek or rate change) clears it.
    let mut tempo_failed = false;
    // Decoded audio frames awaiting a batched run through the filter.
    let mut batch: Vec<(ffmpeg_next::frame::Audio, f64)> = Vec::with_capacity(AUDIO_BATCH_MAX);
    let mut last_audio_pts = 0.0_f64;

    loop {
        if shared.stop_requested() {
            break;
        }

        if shared.paused() {
            thread::sleep(Duration::from_millis(PAUSE_POLL_MS));
            continue;
        }

        if let Some(target) = shared.take_seek_request() {
            feed_audio_batch(
                &mut batch,
                &mut tempo,
                &mut tempo_failed,
                tempo_params.as_ref(),
                shared.rate(),
                &audio_queue,
                &shared,
                &mut last_audio_pts,
            );

            match source.seek_to(target) {
                Ok(()) => {
                    source.flush_decoders();
                    video_queue.clear();
                    audio_queue.clear();
                    tempo_failed = false;
                    tempo = rebuild_tempo(tempo_params.as_ref(), shared.rate(), &mut tempo_failed);
                    shared.reset_audio_anchor();
                    clock.reset();
                }
                Err(e) => {
                    log::warn!("seek ignored, keeping current position: {e}");
                }
            }
            continue;
        }

        if shared.take_audio_filter_reset() {
            tempo_failed = false;
            tempo = rebuild_tempo(tempo_params.as_ref(), shared.rate(), &mut tempo_failed);
        }

        let Some((kind, packet)) = source.read_packet() else {
            // End of stream: run out the audio path, then park.
            feed_audio_batch(
                &mut batch,
                &mut tempo,
                &mut tempo_failed,
                tempo_params.as_ref(),
                shared.rate(),
                &audio_queue,
                &shared,
                &mut last_audio_pts,
            );
            if let Some(t) = tempo.as_mut() {
                if t.flush().is_ok() {
                    for data in t.pull() {
                        audio_queue.push(AudioChunk {
                            data,
                            pts_secs: last_audio_pts,
                        });
                        shared.anchor_audio_if_unset(last_audio_pts);
                    }
                }
            }
            // A flushed graph accepts no more input; the next seek
            // rebuilds it.
            tempo = None;

            if !shared.finished() {
                shared.set_finished(true);
                shared.set_paused(true);
                events.emit(PlayerEvent::PlayingChanged(false));
                events.emit(PlayerEvent::Finished);
            }
            thread::sleep(Duration::from_millis(EOS_POLL_MS));
            continue;
        };

        match kind {
            StreamKind::Audio => {
                receive_audio_frames(&mut source, &packet, &mut batch);
                if batch.len() >= AUDIO_BATCH_MAX {
                    feed_audio_batch(
                        &mut batch,
                        &mut tempo,
                        &mut tempo_failed,
                        tempo_params.as_ref(),
                        shared.rate(),
                        &audio_queue,
                        &shared,
                        &mut last_audio_pts,
                    );
                }
            }
            StreamKind::Video => {
                if let Err(e) = source.video_decoder_mut().send_packet(&packet) {
                    log::debug!("video packet rejected: {e}");
                    continue;
                }

                let mut frame = ffmpeg_next::frame::Video::empty();
                loop {
                    if source.video_decoder_mut().receive_frame(&mut frame).is_err() {
                        break;
                    }
                    let pts = source.video_frame_secs(&frame);

                    let (dst_width, dst_height) =
                        shared.render_size_or(frame.width(), frame.height());
                    let key = ScalerKey {
                        src_width: frame.width(),
                        src_height: frame.height(),
                        src_format: frame.format(),
                        dst_width,
                        dst_height,
                        quality: shared.scaling_quality(),
                    };

                    if shared.take_sws_reset() || scaler.as_ref().is_none_or(|s| !s.matches(&key))
                    {
                        scaler = match FrameScaler::build(key) {
                            Ok(s) => Some(s),
                            Err(e) => {
                                log::warn!("scaler unavailable, dropping frames: {e}");
                                None
                            }
                        };
                    }
                    let Some(active) = scaler.as_mut() else {
                        continue;
                    };

                    let image = match active.scale(&frame, pts) {
                        Ok(image) => image,
                        Err(e) => {
                            log::warn!("frame dropped: {e}");
                            continue;
                        }
                    };

                    // The first frame after play-start or seek anchors
                    // the presentation clock.
                    if !clock.started() {
                        clock.anchor(pts);
                    }
                    let wait = clock.wait_for(pts, shared.rate());
                    if wait > Duration::ZERO {
                        thread::sleep(wait);
                    }

                    video_queue.push(image.clone());
                    events.emit(PlayerEvent::FrameReady(image));
                    events.emit(PlayerEvent::PositionChanged(pts));
                }
            }
        }
    }

    // Drain whatever audio is still pending before tearing down.
    feed_audio_batch(
        &mut batch,
        &mut tempo,
        &mut tempo_failed,
        tempo_params.as_ref(),
        shared.rate(),
        &audio_queue,
        &shared,
        &mut last_audio_pts,
    );
}

/// Sends one packet to the audio decoder and collects its frames with
/// their timestamps.
fn receive_audio_frames(
    source: &mut MediaSource,
    packet: &ffmpeg_next::Packet,
    batch: &mut Vec<(ffmpeg_next::frame::Audio, f64)>,
) {
    {
        let Some(decoder) = source.audio_decoder_mut() else {
            return;
        };
        if let Err(e) = decoder.send_packet(packet) {
            log::debug!("audio packet rejected: {e}");
            return;
        }
    }

    let mut frame = ffmpeg_next::frame::Audio::empty();
    loop {
        let received = match source.audio_decoder_mut() {
            Some(decoder) => decoder.receive_frame(&mut frame).is_ok(),
            None => false,
        };
        if !received {
            break;
        }
        let pts = source.audio_frame_secs(&frame);
        batch.push((
            std::mem::replace(&mut frame, ffmpeg_next::frame::Audio::empty()),
            pts,
        ));
    }
}

fn rebuild_tempo(
    params: Option<&TempoParams>,
    rate: f64,
    failed: &mut bool,
) -> Option<TempoPipeline> {
    let params = params?;
    match TempoPipeline::new(params, rate) {
        Ok(pipeline) => Some(pipeline),
        Err(e) => {
            log::warn!("audio filter unavailable, audio muted until next rebuild: {e}");
            *failed = true;
            None
        }
    }
}

/// Runs the pending batch through the tempo pipeline and enqueues the
/// resulting chunks. The first chunk after a (re)build anchors
/// `audio_base_pts`.
#[allow(clippy::too_many_arguments)]
fn feed_audio_batch(
    batch: &mut Vec<(ffmpeg_next::frame::Audio, f64)>,
    tempo: &mut Option<TempoPipeline>,
    tempo_failed: &mut bool,
    params: Option<&TempoParams>,
    rate: f64,
    audio_queue: &AudioQueue,
    shared: &SharedState,
    last_audio_pts: &mut f64,
) {
    if batch.is_empty() {
        return;
    }
    if *tempo_failed {
        batch.clear();
        return;
    }
    if tempo.is_none() {
        *tempo = rebuild_tempo(params, rate, tempo_failed);
    }
    let Some(pipeline) = tempo.as_mut() else {
        batch.clear();
        return;
    };

    for (frame, pts) in batch.drain(..) {
        *last_audio_pts = pts;
        if let Err(e) = pipeline.push(&frame) {
            log::debug!("audio frame dropped: {e}");
            continue;
        }
        for data in pipeline.pull() {
            audio_queue.push(AudioChunk {
                data,
                pts_secs: pts,
            });
            shared.anchor_audio_if_unset(pts);
        }
    }
}
