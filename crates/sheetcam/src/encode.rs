//! Image encoding and decoding at the service boundary.
//!
//! Frames leave the service as standard PNG or JPEG files produced by the
//! `image` crate's encoders and enter it from any format `image` decodes.

use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use serde::{Deserialize, Serialize};
use sheetcam_core::{CoreError, Frame, PixelFormat};

#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("cannot encode an empty image")]
    EmptyImage,
    #[error("JPEG quality must be in 1..=100, got {0}")]
    InvalidQuality(u8),
    #[error("image of {width}x{height} pixels is too large to encode")]
    TooLarge { width: usize, height: usize },
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Frame(#[from] CoreError),
}

/// Output file format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg {
        /// 1..=100.
        quality: u8,
    },
}

impl ImageFormat {
    pub const DEFAULT_JPEG_QUALITY: u8 = 90;

    pub fn jpeg() -> Self {
        Self::Jpeg {
            quality: Self::DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
        }
    }
}

/// An encoded image file held in memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Encode `frame` as a PNG or JPEG file.
pub fn encode(frame: &Frame, format: ImageFormat) -> Result<EncodedImage, EncodeError> {
    if frame.is_empty() {
        return Err(EncodeError::EmptyImage);
    }
    let too_large = || EncodeError::TooLarge {
        width: frame.width(),
        height: frame.height(),
    };
    let width = u32::try_from(frame.width()).map_err(|_| too_large())?;
    let height = u32::try_from(frame.height()).map_err(|_| too_large())?;
    let color = match frame.format() {
        PixelFormat::Gray8 => ExtendedColorType::L8,
        PixelFormat::Rgb8 => ExtendedColorType::Rgb8,
    };

    let mut bytes = Vec::new();
    match format {
        ImageFormat::Png => {
            PngEncoder::new(&mut bytes).write_image(frame.data(), width, height, color)?;
        }
        ImageFormat::Jpeg { quality } => {
            if !(1..=100).contains(&quality) {
                return Err(EncodeError::InvalidQuality(quality));
            }
            JpegEncoder::new_with_quality(&mut bytes, quality)
                .write_image(frame.data(), width, height, color)?;
        }
    }
    log::debug!(
        "encoded {width}x{height} frame as {} ({} bytes)",
        format.mime_type(),
        bytes.len()
    );

    Ok(EncodedImage {
        bytes,
        format,
        width,
        height,
    })
}

fn frame_from_dynamic(img: DynamicImage) -> Result<Frame, EncodeError> {
    let frame = if img.color().has_color() {
        let rgb = img.to_rgb8();
        let (w, h) = rgb.dimensions();
        Frame::new(w as usize, h as usize, PixelFormat::Rgb8, rgb.into_raw())?
    } else {
        let gray = img.to_luma8();
        let (w, h) = gray.dimensions();
        Frame::new(w as usize, h as usize, PixelFormat::Gray8, gray.into_raw())?
    };
    Ok(frame)
}

/// Decode an encoded image file. Colour images become `Rgb8`, grey ones
/// `Gray8`; alpha is dropped.
pub fn frame_from_bytes(bytes: &[u8]) -> Result<Frame, EncodeError> {
    frame_from_dynamic(image::load_from_memory(bytes)?)
}

pub fn load_frame(path: impl AsRef<Path>) -> Result<Frame, EncodeError> {
    frame_from_dynamic(image::open(path)?)
}

/// Write `frame` to `path`, with the file format taken from `format`.
pub fn save_frame(frame: &Frame, format: ImageFormat, path: impl AsRef<Path>) -> Result<(), EncodeError> {
    let encoded = encode(frame, format)?;
    std::fs::write(path, encoded.bytes)?;
    Ok(())
}

/// Decode base64 image data, with or without a `data:image/...;base64,`
/// prefix.
pub fn decode_base64_image(data: &str) -> Result<Vec<u8>, EncodeError> {
    let data = data.trim();
    let payload = match data.strip_prefix("data:image") {
        Some(rest) => rest.split_once(',').map_or("", |(_, p)| p),
        None => data,
    };
    Ok(general_purpose::STANDARD.decode(payload)?)
}

/// Basic facts about an uploaded encoded image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Channels as stored in the file (alpha included).
    pub channels: u8,
    /// Size of the encoded file.
    pub size_bytes: usize,
}

pub fn image_info(bytes: &[u8]) -> Result<ImageInfo, EncodeError> {
    let img = image::load_from_memory(bytes)?;
    Ok(ImageInfo {
        width: img.width(),
        height: img.height(),
        channels: img.color().channel_count(),
        size_bytes: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(w: usize, h: usize) -> Frame {
        let mut data = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                let v = if (x / 4 + y / 4) % 2 == 0 { 30 } else { 220 };
                data.extend_from_slice(&[v, v / 2, 255 - v]);
            }
        }
        Frame::new(w, h, PixelFormat::Rgb8, data).unwrap()
    }

    #[test]
    fn png_is_lossless() {
        let frame = checker(16, 12);
        let png = encode(&frame, ImageFormat::Png).unwrap();
        assert_eq!(png.mime_type(), "image/png");
        assert_eq!(&png.bytes[1..4], b"PNG");
        assert_eq!(frame_from_bytes(&png.bytes).unwrap(), frame);
    }

    #[test]
    fn grey_png_stays_grey() {
        let frame = Frame::filled(5, 3, PixelFormat::Gray8, 77);
        let png = encode(&frame, ImageFormat::Png).unwrap();
        let back = frame_from_bytes(&png.bytes).unwrap();
        assert_eq!(back.format(), PixelFormat::Gray8);
        assert_eq!(back, frame);
    }

    #[test]
    fn jpeg_has_soi_marker_and_dimensions() {
        let jpg = encode(&checker(32, 16), ImageFormat::jpeg()).unwrap();
        assert_eq!(&jpg.bytes[..2], &[0xFF, 0xD8]);
        assert_eq!((jpg.width, jpg.height), (32, 16));
        let info = image_info(&jpg.bytes).unwrap();
        assert_eq!((info.width, info.height, info.channels), (32, 16, 3));
        assert_eq!(info.size_bytes, jpg.bytes.len());
    }

    #[test]
    fn rejects_bad_quality_and_empty_frames() {
        let frame = checker(4, 4);
        assert!(matches!(
            encode(&frame, ImageFormat::Jpeg { quality: 0 }),
            Err(EncodeError::InvalidQuality(0))
        ));
        let empty = Frame::filled(0, 4, PixelFormat::Gray8, 0);
        assert!(matches!(encode(&empty, ImageFormat::Png), Err(EncodeError::EmptyImage)));
    }

    #[test]
    fn base64_data_url_prefix_is_stripped() {
        let png = encode(&checker(4, 4), ImageFormat::Png).unwrap();
        let b64 = general_purpose::STANDARD.encode(&png.bytes);
        let url = format!("data:image/png;base64,{b64}");
        assert_eq!(decode_base64_image(&url).unwrap(), png.bytes);
        assert_eq!(decode_base64_image(&b64).unwrap(), png.bytes);
        assert!(decode_base64_image("not base64!").is_err());
    }

    #[test]
    fn format_serializes_with_kind_tag() {
        let json = serde_json::to_string(&ImageFormat::Jpeg { quality: 80 }).unwrap();
        assert_eq!(json, r#"{"kind":"jpeg","quality":80}"#);
        let png: ImageFormat = serde_json::from_str(r#"{"kind":"png"}"#).unwrap();
        assert_eq!(png, ImageFormat::Png);
    }
}
