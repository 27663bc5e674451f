//! Intensity remapping: percentile auto-contrast and gamma.

use crate::{ensure_non_empty, PostProcessError};
use sheetcam_core::{histogram, Frame};

/// Stretch intensities so that `clip_percent` of the pixels (half at each
/// end of the grey histogram) saturate, then rescale the rest to `[0, 255]`.
///
/// The same linear map is applied to every channel. Images whose clipped
/// range is empty (for example a single flat intensity) are returned as-is.
pub fn auto_brightness_contrast(frame: &Frame, clip_percent: f32) -> Result<Frame, PostProcessError> {
    ensure_non_empty(frame, "auto_brightness_contrast")?;
    if !clip_percent.is_finite() || !(0.0..100.0).contains(&clip_percent) {
        return Err(PostProcessError::InvalidClipPercent(clip_percent));
    }

    let gray = frame.to_gray();
    let hist = histogram(&gray.view());
    let total = (gray.width * gray.height) as f64;
    let clip = clip_percent as f64 / 100.0 * total / 2.0;

    let mut cum = [0f64; 256];
    let mut acc = 0f64;
    for (c, &h) in cum.iter_mut().zip(hist.iter()) {
        acc += h as f64;
        *c = acc;
    }

    let lo = cum.iter().position(|&c| c > clip).unwrap_or(0);
    let hi = cum.iter().position(|&c| c >= total - clip).unwrap_or(255);
    if hi <= lo {
        log::debug!("auto contrast: flat histogram (lo={lo}, hi={hi}), identity");
        return Ok(frame.clone());
    }

    let scale = 255.0 / (hi - lo) as f32;
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate() {
        *slot = ((v as f32 - lo as f32) * scale).round().clamp(0.0, 255.0) as u8;
    }
    log::debug!("auto contrast: lo={lo} hi={hi} scale={scale:.3}");
    Ok(apply_lut(frame, &lut))
}

/// Power-law remap `v ↦ 255 · (v / 255)^(1 / gamma)`.
///
/// `gamma > 1` brightens mid-tones; `gamma == 1` returns an exact copy.
pub fn gamma_adjust(frame: &Frame, gamma: f32) -> Result<Frame, PostProcessError> {
    ensure_non_empty(frame, "gamma_adjust")?;
    if !gamma.is_finite() || gamma <= 0.0 {
        return Err(PostProcessError::InvalidGamma(gamma));
    }
    if gamma == 1.0 {
        return Ok(frame.clone());
    }

    let inv = 1.0 / gamma as f64;
    let mut lut = [0u8; 256];
    for (v, slot) in lut.iter_mut().enumerate() {
        *slot = (255.0 * (v as f64 / 255.0).powf(inv)).round().clamp(0.0, 255.0) as u8;
    }
    Ok(apply_lut(frame, &lut))
}

fn apply_lut(frame: &Frame, lut: &[u8; 256]) -> Frame {
    let mut out = frame.clone();
    for v in out.data_mut() {
        *v = lut[*v as usize];
    }
    out
}
