use crate::CaptureError;
use sheetcam_core::{Frame, PixelFormat};

#[inline]
fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Convert packed YUYV (BT.601, limited range) to an RGB frame.
///
/// `stride` is the length of one source row in bytes (at least `2 * width`).
pub fn yuyv_to_rgb(data: &[u8], width: usize, height: usize, stride: usize) -> Result<Frame, CaptureError> {
    let row_bytes = width * 2;
    let stride = stride.max(row_bytes);
    let needed = if height == 0 {
        0
    } else {
        stride * (height - 1) + row_bytes
    };
    if data.len() < needed || width % 2 != 0 {
        return Err(CaptureError::Read(format!(
            "YUYV buffer of {} bytes does not hold {width}x{height} (stride {stride})",
            data.len()
        )));
    }

    let mut rgb = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row = &data[y * stride..y * stride + row_bytes];
        for px in row.chunks_exact(4) {
            let d = px[1] as i32 - 128;
            let e = px[3] as i32 - 128;
            for luma in [px[0], px[2]] {
                let c = 298 * (luma as i32 - 16);
                rgb.push(clamp_u8((c + 409 * e + 128) >> 8));
                rgb.push(clamp_u8((c - 100 * d - 208 * e + 128) >> 8));
                rgb.push(clamp_u8((c + 516 * d + 128) >> 8));
            }
        }
    }
    Ok(Frame::new(width, height, PixelFormat::Rgb8, rgb)?)
}
