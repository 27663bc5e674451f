//! Live capture and perspective rectification of marker-framed sheets.
//!
//! This crate provides:
//! - re-exports of the pipeline crates,
//! - [`VisionService`], which owns the capture loop and answers the four
//!   request-level operations (start, stop, raw frame, rectified frame),
//! - PNG/JPEG encoding and decoding at the service boundary,
//! - the JSON [`SheetcamConfig`] shared by the service and the CLI.
//!
//! ## Quickstart
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use sheetcam::capture::FrameSequenceBackend;
//! use sheetcam::{load_frame, ImageFormat, SheetcamConfig, VisionService};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let still = load_frame("sheet.jpg")?;
//! let backend = Arc::new(FrameSequenceBackend::new(vec![still], Duration::from_millis(33)));
//! let service = VisionService::with_backend(backend, SheetcamConfig::default())?;
//!
//! service.start_capture()?;
//! std::thread::sleep(Duration::from_millis(100));
//! let png = service.get_rectified_frame(800, &Default::default(), ImageFormat::Png)?;
//! std::fs::write("sheet_top_down.png", &png.bytes)?;
//! service.stop_capture();
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `sheetcam::core`: frames, homographies, sampling and thresholds.
//! - `sheetcam::aruco`: marker dictionaries and the [`MarkerDetector`].
//! - `sheetcam::rectify`: corner table, correspondences and the [`Rectifier`].
//! - `sheetcam::postprocess`: contrast, gamma and ink masks.
//! - `sheetcam::capture`: camera backends, frame slot and [`CaptureController`].

pub use sheetcam_aruco as aruco;
pub use sheetcam_capture as capture;
pub use sheetcam_core as core;
pub use sheetcam_postprocess as postprocess;
pub use sheetcam_rectify as rectify;

pub use sheetcam_aruco::{DetectedMarker, MarkerDetection, MarkerDetector, MarkerDetectorParams};
pub use sheetcam_capture::{CaptureController, DeviceConfig};
pub use sheetcam_core::{Frame, PixelFormat};
pub use sheetcam_postprocess::{PostProcessOutput, PostProcessParams, PostProcessor};
pub use sheetcam_rectify::{CornerTable, Rectifier, RectifierParams};

mod encode;
mod error;
mod io;
mod service;

pub use encode::{
    decode_base64_image, encode, frame_from_bytes, image_info, load_frame, save_frame,
    EncodeError, EncodedImage, ImageFormat, ImageInfo,
};
pub use error::SheetcamError;
pub use io::{ConfigError, SheetcamConfig};
pub use service::VisionService;

/// Install logging for binaries: `tracing` spans with `log` records bridged
/// in when the `tracing` feature is on, the plain stderr logger otherwise.
pub fn init_logging(level: log::LevelFilter) {
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_log::LogTracer::init_with_filter(level);
        sheetcam_core::init_tracing(false);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = sheetcam_core::init_with_level(level);
    }
}
