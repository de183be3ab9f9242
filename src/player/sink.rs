// SPDX-License-Identifier: MPL-2.0
//! Audio output using cpal, plus the periodic queue-drain driver.
//!
//! The sink owns a device stream whose callback pulls 16-bit samples out
//! of a shared buffer; the driver is a small thread that ticks every few
//! milliseconds, moves queued chunks into that buffer, and tracks how
//! many samples the device side has accepted. The audio queue is a
//! short-lived handoff, not a backpressure signal: starvation produces a
//! gap, never a stalled decoder.

use crate::config::{
    AUDIO_OUT_CHANNELS, FALLBACK_SAMPLE_RATES, SINK_BUFFER_SECS, SINK_TICK_MS,
};
use crate::error::{Error, Result};
use crate::player::queue::AudioQueue;
use crate::player::shared::SharedState;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Sample-rate candidates for device negotiation, preferred rate first.
#[must_use]
pub fn negotiation_rates(preferred: u32) -> Vec<u32> {
    let mut rates = vec![preferred];
    for rate in FALLBACK_SAMPLE_RATES {
        if !rates.contains(&rate) {
            rates.push(rate);
        }
    }
    rates
}

/// Sample buffer shared between the driver thread and the device callback.
#[derive(Debug)]
pub struct SinkBuffer {
    samples: Mutex<Vec<i16>>,
    suspended: AtomicBool,
    capacity: usize,
}

impl SinkBuffer {
    #[must_use]
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        let capacity = sample_rate as usize * channels as usize * SINK_BUFFER_SECS;
        Self {
            samples: Mutex::new(Vec::with_capacity(capacity)),
            suspended: AtomicBool::new(false),
            capacity,
        }
    }

    /// Appends s16 little-endian bytes, returning how many bytes were
    /// accepted. Bytes beyond the capacity are dropped.
    pub fn queue_bytes(&self, bytes: &[u8]) -> usize {
        let mut samples = self.samples.lock().expect("sink buffer poisoned");
        let available = self.capacity.saturating_sub(samples.len());
        let accepted_samples = (bytes.len() / 2).min(available);

        for pair in bytes[..accepted_samples * 2].chunks_exact(2) {
            samples.push(i16::from_le_bytes([pair[0], pair[1]]));
        }

        accepted_samples * 2
    }

    /// Moves up to `out.len()` samples into `out`, zero-filling the rest.
    /// Consumes nothing while suspended.
    fn fill(&self, out: &mut [i16]) {
        if self.is_suspended() {
            out.fill(0);
            return;
        }

        // Runs inside the device callback; a poisoned lock degrades to
        // silence rather than taking the audio thread down.
        let Ok(mut samples) = self.samples.lock() else {
            out.fill(0);
            return;
        };
        let take = out.len().min(samples.len());
        out[..take].copy_from_slice(&samples[..take]);
        out[take..].fill(0);
        samples.drain(..take);
    }

    pub fn clear(&self) {
        self.samples.lock().expect("sink buffer poisoned").clear();
    }

    pub fn set_suspended(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.lock().expect("sink buffer poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An open audio device accepting 16-bit signed stereo PCM.
pub struct AudioSink {
    buffer: Arc<SinkBuffer>,
    sample_rate: u32,
    channels: u16,
    /// Kept alive to maintain playback.
    _stream: cpal::Stream,
}

impl AudioSink {
    /// Opens the default output device, negotiating the sample rate:
    /// codec rate first, then the common fallbacks. Fails only when no
    /// candidate rate can be opened.
    pub fn open(preferred_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioDevice("no output device found".into()))?;

        let supported = device
            .default_output_config()
            .map_err(|e| Error::AudioDevice(format!("no default output config: {e}")))?;
        let sample_format = supported.sample_format();

        let mut last_err = None;
        for rate in negotiation_rates(preferred_rate) {
            let buffer = Arc::new(SinkBuffer::new(rate, AUDIO_OUT_CHANNELS));
            let config = cpal::StreamConfig {
                channels: AUDIO_OUT_CHANNELS,
                sample_rate: cpal::SampleRate(rate),
                buffer_size: cpal::BufferSize::Default,
            };

            let built = match sample_format {
                cpal::SampleFormat::F32 => {
                    Self::build_stream::<f32>(&device, &config, Arc::clone(&buffer))
                }
                cpal::SampleFormat::I16 => {
                    Self::build_stream::<i16>(&device, &config, Arc::clone(&buffer))
                }
                cpal::SampleFormat::U16 => {
                    Self::build_stream::<u16>(&device, &config, Arc::clone(&buffer))
                }
                other => Err(Error::AudioDevice(format!(
                    "unsupported device sample format {other:?}"
                ))),
            };

            match built {
                Ok(stream) => {
                    stream
                        .play()
                        .map_err(|e| Error::AudioDevice(format!("stream start: {e}")))?;
                    if rate != preferred_rate {
                        log::warn!("audio device rejected {preferred_rate} Hz, using {rate} Hz");
                    }
                    return Ok(Self {
                        buffer,
                        sample_rate: rate,
                        channels: AUDIO_OUT_CHANNELS,
                        _stream: stream,
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::AudioDevice("no negotiable sample rate".into())))
    }

    fn build_stream<T: cpal::SizedSample + cpal::FromSample<i16>>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        buffer: Arc<SinkBuffer>,
    ) -> Result<cpal::Stream> {
        let mut staging: Vec<i16> = Vec::new();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    staging.resize(data.len(), 0);
                    buffer.fill(&mut staging);
                    for (out, sample) in data.iter_mut().zip(staging.iter()) {
                        *out = T::from_sample(*sample);
                    }
                },
                |err| {
                    log::error!("audio output error: {err}");
                },
                None,
            )
            .map_err(|e| Error::AudioDevice(format!("stream build: {e}")))
    }

    /// Shared buffer handle for the drain driver.
    #[must_use]
    pub fn buffer(&self) -> Arc<SinkBuffer> {
        Arc::clone(&self.buffer)
    }

    pub fn suspend(&self) {
        self.buffer.set_suspended(true);
    }

    pub fn resume(&self) {
        self.buffer.set_suspended(false);
    }

    /// Discards buffered samples without changing the suspend state.
    /// Used on seek and rate change to drop stale audio.
    pub fn clear(&self) {
        self.buffer.clear();
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// Periodic task that drains the audio queue into the sink buffer.
pub struct SinkDriver {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl SinkDriver {
    /// Starts the drain thread.
    ///
    /// Each tick, unless playback is paused, every queued chunk is moved
    /// into the device buffer and the per-channel sample counter advances
    /// by what the buffer accepted.
    #[must_use]
    pub fn start(
        shared: Arc<SharedState>,
        queue: Arc<AudioQueue>,
        buffer: Arc<SinkBuffer>,
        channels: u16,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let bytes_per_frame = 2 * usize::from(channels.max(1));
            while !stop_flag.load(Ordering::SeqCst) {
                if !shared.paused() {
                    let chunks = queue.drain_all();
                    if !chunks.is_empty() {
                        let mut all = Vec::with_capacity(
                            chunks.iter().map(|c| c.data.len()).sum(),
                        );
                        for chunk in &chunks {
                            all.extend_from_slice(&chunk.data);
                        }

                        let accepted = buffer.queue_bytes(&all);
                        shared.add_audio_samples_written(
                            (accepted / bytes_per_frame) as u64,
                        );
                    }
                }
                thread::sleep(Duration::from_millis(SINK_TICK_MS));
            }
        });

        Self {
            handle: Some(handle),
            stop,
        }
    }

    /// Stops the drain thread and waits for it to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SinkDriver {
    fn drop(&mut self) {
        self.stop();
    }
}
