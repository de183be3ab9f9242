// SPDX-License-Identifier: MPL-2.0
//! Tempo-preserving audio rate conversion.
//!
//! Decoded audio runs through an FFmpeg filter graph shaped
//! `abuffer -> atempo stages -> aformat -> abuffersink`. Each atempo
//! stage accepts a ratio in [0.5, 2.0]; an arbitrary positive rate is
//! decomposed into a chain whose product matches it, so playback speed
//! changes without shifting pitch. The sink conforms the output to
//! 16-bit signed stereo at the stream's original sample rate.

use crate::config::{ATEMPO_STAGE_MAX, ATEMPO_STAGE_MIN, TEMPO_IDENTITY_EPSILON};
use crate::error::{Error, Result};

/// Decomposes a playback rate into per-stage atempo ratios.
///
/// An empty result means the rate is close enough to 1.0 that a
/// pass-through stage suffices.
#[must_use]
pub fn decompose_rate(rate: f64) -> Vec<f64> {
    let mut stages = Vec::new();
    let mut remainder = rate;

    while remainder > ATEMPO_STAGE_MAX {
        stages.push(ATEMPO_STAGE_MAX);
        remainder /= ATEMPO_STAGE_MAX;
    }
    while remainder < ATEMPO_STAGE_MIN {
        stages.push(ATEMPO_STAGE_MIN);
        remainder /= ATEMPO_STAGE_MIN;
    }
    if (remainder - 1.0).abs() > TEMPO_IDENTITY_EPSILON {
        stages.push(remainder);
    }

    stages
}

/// Renders the filter chain description for `rate`.
///
/// The chain always ends with a format-conforming stage that pins the
/// output to s16 stereo at `sample_rate`.
#[must_use]
pub fn filter_chain_spec(rate: f64, sample_rate: u32) -> String {
    let stages = decompose_rate(rate);

    let tempo = if stages.is_empty() {
        "anull".to_string()
    } else {
        stages
            .iter()
            .map(|s| format!("atempo={s:.6}"))
            .collect::<Vec<_>>()
            .join(",")
    };

    format!(
        "{tempo},aformat=sample_fmts=s16:channel_layouts=stereo:sample_rates={sample_rate}"
    )
}

/// Source-stream parameters the buffer source needs.
///
/// Captured from the audio decoder so the pipeline can be rebuilt (and
/// unit-tested) without holding the decoder itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoParams {
    pub sample_rate: u32,
    /// FFmpeg sample format name, e.g. `fltp` or `s16`.
    pub sample_format: String,
    /// Channel layout bitmask.
    pub channel_layout_bits: u64,
    /// Stream time base as numerator/denominator.
    pub time_base: (i32, i32),
}

impl TempoParams {
    /// Captures parameters from an opened audio decoder and its stream's
    /// time base.
    #[must_use]
    pub fn from_decoder(decoder: &ffmpeg_next::decoder::Audio, time_base: (i32, i32)) -> Self {
        let layout = decoder.channel_layout();
        let layout_bits = if layout.bits() == 0 {
            ffmpeg_next::ChannelLayout::default(i32::from(decoder.channels())).bits()
        } else {
            layout.bits()
        };

        let time_base = if time_base.0 > 0 && time_base.1 > 0 {
            time_base
        } else {
            (1, decoder.rate() as i32)
        };

        Self {
            sample_rate: decoder.rate(),
            sample_format: decoder.format().name().to_string(),
            channel_layout_bits: layout_bits,
            time_base,
        }
    }
}

/// A configured tempo filter graph.
///
/// Owned exclusively by the decode thread; rebuilt on every rate change.
pub struct TempoPipeline {
    graph: ffmpeg_next::filter::Graph,
    sample_rate: u32,
}

impl TempoPipeline {
    /// Builds the graph for the given source parameters and rate.
    pub fn new(params: &TempoParams, rate: f64) -> Result<Self> {
        if rate <= 0.0 {
            return Err(Error::FilterInit(format!("non-positive rate {rate}")));
        }

        let mut graph = ffmpeg_next::filter::Graph::new();

        let src_args = format!(
            "time_base={}/{}:sample_rate={}:sample_fmt={}:channel_layout=0x{:x}",
            params.time_base.0,
            params.time_base.1,
            params.sample_rate,
            params.sample_format,
            params.channel_layout_bits,
        );

        let abuffer = ffmpeg_next::filter::find("abuffer")
            .ok_or_else(|| Error::FilterInit("abuffer filter unavailable".into()))?;
        graph
            .add(&abuffer, "in", &src_args)
            .map_err(|e| Error::FilterInit(format!("abuffer: {e}")))?;

        let abuffersink = ffmpeg_next::filter::find("abuffersink")
            .ok_or_else(|| Error::FilterInit("abuffersink filter unavailable".into()))?;
        graph
            .add(&abuffersink, "out", "")
            .map_err(|e| Error::FilterInit(format!("abuffersink: {e}")))?;

        {
            let mut sink = graph.get("out").expect("sink was just added");
            sink.set_sample_format(ffmpeg_next::format::Sample::I16(
                ffmpeg_next::format::sample::Type::Packed,
            ));
            sink.set_channel_layout(ffmpeg_next::ChannelLayout::STEREO);
            sink.set_sample_rate(params.sample_rate);
        }

        let spec = filter_chain_spec(rate, params.sample_rate);
        graph
            .output("in", 0)
            .map_err(|e| Error::FilterInit(format!("graph output: {e}")))?
            .input("out", 0)
            .map_err(|e| Error::FilterInit(format!("graph input: {e}")))?
            .parse(&spec)
            .map_err(|e| Error::FilterInit(format!("parse '{spec}': {e}")))?;
        graph
            .validate()
            .map_err(|e| Error::FilterInit(format!("validate '{spec}': {e}")))?;

        Ok(Self {
            graph,
            sample_rate: params.sample_rate,
        })
    }

    /// Output sample rate (equals the source stream's rate).
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Feeds one decoded frame into the graph.
    pub fn push(&mut self, frame: &ffmpeg_next::frame::Audio) -> Result<()> {
        self.graph
            .get("in")
            .expect("graph holds an 'in' node")
            .source()
            .add(frame)
            .map_err(|e| Error::FilterInit(format!("filter push: {e}")))
    }

    /// Signals end of input so buffered samples can drain.
    pub fn flush(&mut self) -> Result<()> {
        self.graph
            .get("in")
            .expect("graph holds an 'in' node")
            .source()
            .flush()
            .map_err(|e| Error::FilterInit(format!("filter flush: {e}")))
    }

    /// Pulls every available output chunk as raw s16 stereo bytes.
    #[must_use]
    pub fn pull(&mut self) -> Vec<Vec<u8>> {
        let mut chunks = Vec::new();
        let mut filtered = ffmpeg_next::frame::Audio::empty();

        while self
            .graph
            .get("out")
            .expect("graph holds an 'out' node")
            .sink()
            .frame(&mut filtered)
            .is_ok()
        {
            // Packed s16 stereo: 4 bytes per sample frame in plane 0.
            let bytes = filtered.samples() * 4;
            if bytes > 0 {
                chunks.push(filtered.data(0)[..bytes].to_vec());
            }
        }

        chunks
    }
}
