use crate::{build_correspondence, CornerTable, CorrespondenceSet, RectifyError};
use serde::{Deserialize, Serialize};
use sheetcam_aruco::MarkerDetection;
use sheetcam_core::{homography_from_4pt, warp_perspective, Frame, Homography};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Homographies whose singular value ratio falls below this are treated as
/// singular.
const MIN_CONDITIONING: f64 = 1e-12;

/// Configuration for [`Rectifier`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifierParams {
    /// Side of the square output image, in pixels.
    pub output_size: u32,
    pub corner_table: CornerTable,
    /// Minimum distance between any two source points.
    pub min_point_separation_px: f32,
    /// Minimum |sin| of the angle at every source quad corner.
    pub min_corner_sine: f32,
}

impl Default for RectifierParams {
    fn default() -> Self {
        Self {
            output_size: 800,
            corner_table: CornerTable::default(),
            min_point_separation_px: 2.0,
            min_corner_sine: 0.05,
        }
    }
}

/// Square top-down view of the sheet.
#[derive(Clone, Debug)]
pub struct RectifiedImage {
    /// `S × S` pixels, same pixel format as the source frame.
    pub image: Frame,
    pub h_img_from_rect: Homography,
    pub h_rect_from_img: Homography,
}

/// Warps frames so the marker-framed sheet fills an axis-aligned square.
#[derive(Clone, Debug, Default)]
pub struct Rectifier {
    params: RectifierParams,
}

impl Rectifier {
    pub fn new(params: RectifierParams) -> Result<Self, RectifyError> {
        if params.output_size == 0 {
            return Err(RectifyError::InvalidOutputSize);
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &RectifierParams {
        &self.params
    }

    /// Correspondences for `detection` at the configured output size.
    pub fn correspondence(&self, detection: &MarkerDetection) -> Result<CorrespondenceSet, RectifyError> {
        build_correspondence(detection, &self.params.corner_table, self.params.output_size)
    }

    /// Validate `set` and solve for the rectified-to-image homography.
    pub fn homography(&self, set: &CorrespondenceSet) -> Result<Homography, RectifyError> {
        if set.output_size == 0 {
            return Err(RectifyError::InvalidOutputSize);
        }
        set.check_geometry(self.params.min_point_separation_px, self.params.min_corner_sine)?;

        let h = homography_from_4pt(&set.dst, &set.src)
            .ok_or_else(|| RectifyError::degenerate("homography solve failed"))?;
        if !h.is_finite() {
            return Err(RectifyError::degenerate("homography is not finite"));
        }
        let cond = h.conditioning();
        if cond < MIN_CONDITIONING {
            return Err(RectifyError::degenerate(format!(
                "homography is near-singular (conditioning {cond:.3e})"
            )));
        }
        Ok(h)
    }

    /// Warp `frame` into an `S × S` image, `S = set.output_size`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame, set), fields(size = set.output_size))
    )]
    pub fn rectify(&self, frame: &Frame, set: &CorrespondenceSet) -> Result<RectifiedImage, RectifyError> {
        if frame.is_empty() {
            return Err(RectifyError::EmptyImage);
        }
        let h_img_from_rect = self.homography(set)?;
        let h_rect_from_img = h_img_from_rect
            .inverse()
            .ok_or_else(|| RectifyError::degenerate("homography not invertible"))?;

        let s = set.output_size as usize;
        let image = warp_perspective(frame, &h_img_from_rect, s, s);
        log::debug!(
            "rectified {}x{} frame into {s}x{s}",
            frame.width(),
            frame.height()
        );

        Ok(RectifiedImage {
            image,
            h_img_from_rect,
            h_rect_from_img,
        })
    }

    /// Correspondence plus warp in one step.
    pub fn rectify_detection(
        &self,
        frame: &Frame,
        detection: &MarkerDetection,
    ) -> Result<RectifiedImage, RectifyError> {
        let set = self.correspondence(detection)?;
        self.rectify(frame, &set)
    }
}
