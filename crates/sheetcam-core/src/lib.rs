//! Core types and utilities for the sheetcam rectification pipeline.
//!
//! This crate is intentionally small and purely numeric. It owns the frame
//! and grey image types, bilinear sampling, 4-point homographies with the
//! matching perspective warp, and the thresholding primitives shared by the
//! marker detector and the post-processor. It does *not* depend on any
//! concrete image codec or camera API.

mod error;
mod frame;
mod homography;
mod image;
mod logger;
mod threshold;

pub use error::CoreError;
pub use frame::{luma, Frame, PixelFormat};
pub use homography::{homography_from_4pt, warp_perspective, Homography};
pub use image::{
    sample_bilinear, sample_bilinear_frame, sample_bilinear_u8, GrayImage, GrayImageView,
};
pub use threshold::{
    adaptive_mean_dark, global_dark, histogram, otsu_threshold_from_histogram,
    otsu_threshold_from_samples, IntegralImage,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_filter, init_with_level, level_from_verbosity, LogFilter, LOG_ENV};

pub use nalgebra::Point2;
