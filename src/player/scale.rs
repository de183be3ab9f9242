// SPDX-License-Identifier: MPL-2.0
//! Software scaling of decoded video frames to presentation RGB24.
//!
//! The scaler context is keyed by source dimensions/pixel format, target
//! dimensions, and the selected algorithm; it is rebuilt on the decode
//! thread whenever any key component changes or an external call raises
//! the reset flag. Construction falls back to fast-bilinear when the
//! requested algorithm is rejected.

use crate::error::{Error, Result};
use crate::player::queue::VideoFrame;
use std::sync::Arc;

/// Quality/speed tradeoff for the software scaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ScalingQuality {
    FastBilinear = 0,
    Bilinear = 1,
    Bicubic = 2,
    #[default]
    Lanczos = 3,
}

impl ScalingQuality {
    /// Decodes the atomic representation; unknown values fall back to
    /// the default.
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::FastBilinear,
            1 => Self::Bilinear,
            2 => Self::Bicubic,
            3 => Self::Lanczos,
            _ => Self::default(),
        }
    }

    fn flags(self) -> ffmpeg_next::software::scaling::Flags {
        use ffmpeg_next::software::scaling::Flags;
        match self {
            Self::FastBilinear => Flags::FAST_BILINEAR,
            Self::Bilinear => Flags::BILINEAR,
            Self::Bicubic => Flags::BICUBIC,
            Self::Lanczos => Flags::LANCZOS,
        }
    }
}

/// Everything that forces a scaler rebuild when it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalerKey {
    pub src_width: u32,
    pub src_height: u32,
    pub src_format: ffmpeg_next::format::Pixel,
    pub dst_width: u32,
    pub dst_height: u32,
    pub quality: ScalingQuality,
}

/// A reusable scaling context producing packed RGB24 images.
pub struct FrameScaler {
    context: ffmpeg_next::software::scaling::Context,
    key: ScalerKey,
}

impl FrameScaler {
    /// Builds a scaler for `key`, falling back to fast-bilinear if the
    /// requested algorithm is rejected for this format combination.
    pub fn build(key: ScalerKey) -> Result<Self> {
        let context = Self::get_context(&key, key.quality).or_else(|err| {
            if key.quality == ScalingQuality::FastBilinear {
                return Err(err);
            }
            log::warn!(
                "scaler rejected {:?} ({err}), falling back to fast-bilinear",
                key.quality
            );
            Self::get_context(&key, ScalingQuality::FastBilinear)
        })?;

        Ok(Self { context, key })
    }

    fn get_context(
        key: &ScalerKey,
        quality: ScalingQuality,
    ) -> Result<ffmpeg_next::software::scaling::Context> {
        ffmpeg_next::software::scaling::Context::get(
            key.src_format,
            key.src_width,
            key.src_height,
            ffmpeg_next::format::Pixel::RGB24,
            key.dst_width,
            key.dst_height,
            quality.flags(),
        )
        .map_err(|e| {
            Error::ScalerInit(format!(
                "{}x{} {:?} -> {}x{} RGB24: {e}",
                key.src_width, key.src_height, key.src_format, key.dst_width, key.dst_height
            ))
        })
    }

    /// Whether this scaler already covers `key`.
    #[must_use]
    pub fn matches(&self, key: &ScalerKey) -> bool {
        self.key == *key
    }

    /// Scales a decoded frame into a packed RGB24 image.
    pub fn scale(&mut self, frame: &ffmpeg_next::frame::Video, pts_secs: f64) -> Result<VideoFrame> {
        let mut rgb = ffmpeg_next::frame::Video::empty();
        self.context
            .run(frame, &mut rgb)
            .map_err(|e| Error::ScalerInit(format!("scaling failed: {e}")))?;

        let width = rgb.width();
        let height = rgb.height();
        let src_stride = rgb.stride(0);
        let row_bytes = width as usize * 3;
        let data = rgb.data(0);

        // Repack row by row; libswscale pads lines to alignment.
        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for y in 0..height as usize {
            let start = y * src_stride;
            pixels.extend_from_slice(&data[start..start + row_bytes]);
        }

        Ok(VideoFrame {
            data: Arc::new(pixels),
            width,
            height,
            stride: row_bytes,
            pts_secs,
        })
    }
}
