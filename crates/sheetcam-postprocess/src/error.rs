/// Errors returned by post-processing steps.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PostProcessError {
    #[error("image has zero width or height")]
    EmptyImage,
    #[error("gamma must be finite and positive, got {0}")]
    InvalidGamma(f32),
    #[error("clip percentage must be in [0, 100), got {0}")]
    InvalidClipPercent(f32),
    #[error("mask is {mask_width}x{mask_height} but image is {width}x{height}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        mask_width: usize,
        mask_height: usize,
    },
}
