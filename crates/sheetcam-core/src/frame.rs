//! Dense 8-bit frames as produced by a camera device.

use crate::{CoreError, GrayImage, GrayImageView};
use serde::{Deserialize, Serialize};

/// Channel layout of a [`Frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// One luma byte per pixel.
    Gray8,
    /// Interleaved `R, G, B` bytes per pixel.
    Rgb8,
}

impl PixelFormat {
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 => 3,
        }
    }
}

/// A `height × width × channels` pixel grid, row-major and interleaved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: usize,
    height: usize,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap an existing buffer. The buffer length must match the dimensions.
    pub fn new(
        width: usize,
        height: usize,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<Self, CoreError> {
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(format.channels()))
            .ok_or(CoreError::InvalidDimensions { width, height })?;
        if data.len() != expected {
            return Err(CoreError::BufferSize {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Frame filled with a single value in every channel.
    pub fn filled(width: usize, height: usize, format: PixelFormat, value: u8) -> Self {
        Self {
            width,
            height,
            format,
            data: vec![value; width * height * format.channels()],
        }
    }

    pub fn from_gray(img: GrayImage) -> Self {
        Self {
            width: img.width,
            height: img.height,
            format: PixelFormat::Gray8,
            data: img.data,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// True when either dimension is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Channel values of one pixel.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> &[u8] {
        let c = self.channels();
        let start = (y * self.width + x) * c;
        &self.data[start..start + c]
    }

    /// Luma conversion (integer BT.601 weights). Grey frames are copied as-is.
    pub fn to_gray(&self) -> GrayImage {
        let data = match self.format {
            PixelFormat::Gray8 => self.data.clone(),
            PixelFormat::Rgb8 => self
                .data
                .chunks_exact(3)
                .map(|p| luma(p[0], p[1], p[2]))
                .collect(),
        };
        GrayImage {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Borrow the pixel data as a grey view when the frame is single-channel.
    pub fn gray_view(&self) -> Option<GrayImageView<'_>> {
        match self.format {
            PixelFormat::Gray8 => Some(GrayImageView {
                width: self.width,
                height: self.height,
                data: &self.data,
            }),
            PixelFormat::Rgb8 => None,
        }
    }
}

#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32 + 128) >> 8) as u8
}
