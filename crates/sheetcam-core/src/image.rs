//! Grey images and bilinear sampling.
//!
//! Sampling functions take *pixel-centre* coordinates: integer `(x, y)` reads
//! pixel `(x, y)` exactly. Callers working in continuous image coordinates
//! (pixel `(i, j)` covering `[i, i+1) × [j, j+1)`) subtract `0.5` first.

use crate::Frame;

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0)
    }

    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

impl From<GrayImage> for Frame {
    fn from(img: GrayImage) -> Self {
        Frame::from_gray(img)
    }
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}

#[inline]
pub fn sample_bilinear_u8(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    sample_bilinear(src, x, y).round().clamp(0.0, 255.0) as u8
}

/// Bilinear sample of every channel of `src` into `out` (`out.len() == channels`).
///
/// Out-of-frame neighbours read as black.
#[inline]
pub fn sample_bilinear_frame(src: &Frame, x: f32, y: f32, out: &mut [u8]) {
    let c = src.channels();
    let w = src.width() as i32;
    let h = src.height() as i32;
    let data = src.data();

    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let at = |px: i32, py: i32, ch: usize| -> f32 {
        if px < 0 || py < 0 || px >= w || py >= h {
            return 0.0;
        }
        data[(py as usize * w as usize + px as usize) * c + ch] as f32
    };

    for (ch, slot) in out.iter_mut().enumerate().take(c) {
        let p00 = at(x0, y0, ch);
        let p10 = at(x0 + 1, y0, ch);
        let p01 = at(x0, y0 + 1, ch);
        let p11 = at(x0 + 1, y0 + 1, ch);
        let a = p00 + fx * (p10 - p00);
        let b = p01 + fx * (p11 - p01);
        *slot = (a + fy * (b - a)).round().clamp(0.0, 255.0) as u8;
    }
}
