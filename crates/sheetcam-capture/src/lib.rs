//! Camera frame acquisition for sheetcam.
//!
//! A [`CameraBackend`] opens [`CameraDevice`]s. A [`FrameSource`] owns one
//! open device and publishes what it reads into a [`FrameSlot`], a
//! single-slot holder that always keeps only the newest frame. The
//! [`CaptureController`] runs a `FrameSource` on a background thread and is
//! the only place where devices are opened in a running service.
//!
//! Readers never touch the device: they clone the `Arc<Frame>` currently in
//! the slot, so every read observes one complete frame.

mod config;
mod controller;
mod convert;
mod device;
mod error;
mod sequence;
mod slot;
mod source;
#[cfg(all(feature = "v4l2", target_os = "linux"))]
mod v4l2;

pub use config::{CapturePixelFormat, DeviceConfig};
pub use controller::CaptureController;
pub use convert::yuyv_to_rgb;
pub use device::{CameraBackend, CameraDevice};
pub use error::CaptureError;
pub use sequence::FrameSequenceBackend;
pub use slot::{FrameReader, FrameSlot};
pub use source::FrameSource;
#[cfg(all(feature = "v4l2", target_os = "linux"))]
pub use v4l2::V4l2Backend;
