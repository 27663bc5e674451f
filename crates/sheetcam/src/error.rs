use sheetcam_aruco::DetectError;
use sheetcam_capture::CaptureError;
use sheetcam_core::CoreError;
use sheetcam_postprocess::PostProcessError;
use sheetcam_rectify::RectifyError;

use crate::EncodeError;

/// Any failure of a [`crate::VisionService`] operation.
#[derive(thiserror::Error, Debug)]
pub enum SheetcamError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Detect(#[from] DetectError),
    #[error(transparent)]
    Rectify(#[from] RectifyError),
    #[error(transparent)]
    PostProcess(#[from] PostProcessError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Frame(#[from] CoreError),
}

impl SheetcamError {
    /// `true` when retrying with a later frame may succeed.
    ///
    /// Missing markers, bad geometry and an empty frame slot are expected in
    /// normal operation. A device that cannot be opened or an empty image
    /// reaching the post-processor is not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Capture(e) => matches!(
                e,
                CaptureError::NoFrameAvailable | CaptureError::Timeout
            ),
            Self::Rectify(e) => matches!(
                e,
                RectifyError::InsufficientMarkers { .. } | RectifyError::DegenerateGeometry { .. }
            ),
            _ => false,
        }
    }

    /// Ids the frame was missing, for [`RectifyError::InsufficientMarkers`].
    pub fn missing_markers(&self) -> Option<&[u32]> {
        match self {
            Self::Rectify(RectifyError::InsufficientMarkers { missing }) => Some(missing),
            _ => None,
        }
    }
}
