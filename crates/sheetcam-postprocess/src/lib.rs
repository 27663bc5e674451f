//! Post-processing of rectified sheet images.
//!
//! All operations are pure functions of their inputs: the same frame and
//! parameters always give the same output. They only fail on zero-sized
//! frames ([`PostProcessError::EmptyImage`]) or invalid parameters.

mod error;
mod levels;
mod mask;
mod pipeline;

pub use error::PostProcessError;
pub use levels::{auto_brightness_contrast, gamma_adjust};
pub use mask::{combine, compute_mask, MaskPolicy};
pub use pipeline::{PostProcessOutput, PostProcessParams, PostProcessor};

use sheetcam_core::Frame;

fn ensure_non_empty(frame: &Frame, op: &str) -> Result<(), PostProcessError> {
    if frame.is_empty() {
        log::error!(
            "{op}: empty {}x{} image reached the post-processor",
            frame.width(),
            frame.height()
        );
        return Err(PostProcessError::EmptyImage);
    }
    Ok(())
}
