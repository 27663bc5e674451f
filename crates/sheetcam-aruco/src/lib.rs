//! Fiducial marker detection for sheetcam.
//!
//! This crate focuses on:
//! - embedded built-in dictionaries (compiled into the binary),
//! - matching observed marker codes against those dictionaries,
//! - finding dark quadrilaterals in a frame and decoding them as markers.
//!
//! The entry point is [`MarkerDetector`]. Detection never fails on a
//! well-formed frame: an empty [`MarkerDetection`] simply means no marker was
//! in view.
//!
//! Every [`DetectedMarker`] lists its corners clockwise as seen in the image,
//! starting at the marker's own top-left corner, regardless of how the marker
//! is rotated in the frame.

pub mod builtins;
mod decode;
mod detector;
mod dictionary;
mod error;
mod matcher;
mod quad;

#[cfg(any(test, feature = "synthetic"))]
pub mod synthetic;

pub use detector::{
    DetectedMarker, MarkerDetection, MarkerDetector, MarkerDetectorParams, ThresholdMode,
};
pub use dictionary::Dictionary;
pub use error::DetectError;
pub use matcher::{canonical_corners, rotate_code_u64, Match, Matcher};
