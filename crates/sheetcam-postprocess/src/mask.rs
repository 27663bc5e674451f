//! Ink masks and compositing.

use crate::{ensure_non_empty, PostProcessError};
use serde::{Deserialize, Serialize};
use sheetcam_core::{adaptive_mean_dark, global_dark, histogram, otsu_threshold_from_histogram};
use sheetcam_core::{Frame, GrayImage};

/// Foreground value in masks.
const FG: u8 = 255;

/// Thresholding strategy for [`compute_mask`]. Foreground is darker than the
/// threshold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaskPolicy {
    /// Fixed threshold: foreground when `v < threshold`.
    Global { threshold: u8 },
    /// Otsu threshold of the whole image.
    Otsu,
    /// Foreground when `v + offset` is below the `(2r+1)²` local mean.
    Adaptive { radius: usize, offset: f32 },
}

impl Default for MaskPolicy {
    fn default() -> Self {
        Self::Adaptive {
            radius: 15,
            offset: 10.0,
        }
    }
}

/// Binary mask of `frame` (255 = foreground, 0 = background).
pub fn compute_mask(frame: &Frame, policy: &MaskPolicy) -> Result<GrayImage, PostProcessError> {
    ensure_non_empty(frame, "compute_mask")?;
    let gray = frame.to_gray();
    let view = gray.view();

    let fg = match *policy {
        MaskPolicy::Global { threshold } => global_dark(&view, threshold),
        MaskPolicy::Otsu => {
            let t = otsu_threshold_from_histogram(&histogram(&view));
            log::debug!("mask otsu threshold {t}");
            global_dark(&view, t)
        }
        MaskPolicy::Adaptive { radius, offset } => adaptive_mean_dark(&view, radius, offset),
    };

    Ok(GrayImage {
        width: gray.width,
        height: gray.height,
        data: fg.into_iter().map(|d| if d { FG } else { 0 }).collect(),
    })
}

/// Keep `base` where `mask` is set and paint everything else white.
pub fn combine(base: &Frame, mask: &GrayImage) -> Result<Frame, PostProcessError> {
    ensure_non_empty(base, "combine")?;
    if mask.width != base.width() || mask.height != base.height() {
        return Err(PostProcessError::DimensionMismatch {
            width: base.width(),
            height: base.height(),
            mask_width: mask.width,
            mask_height: mask.height,
        });
    }

    let c = base.channels();
    let mut out = base.clone();
    for (px, &m) in out.data_mut().chunks_exact_mut(c).zip(&mask.data) {
        if m == 0 {
            px.fill(255);
        }
    }
    Ok(out)
}
