use crate::{CaptureError, DeviceConfig};
use sheetcam_core::Frame;

/// Something that can open camera devices.
pub trait CameraBackend: Send + Sync {
    /// Acquire the device described by `config`.
    ///
    /// Fails with [`CaptureError::DeviceUnavailable`] when it cannot be opened.
    fn open(&self, config: &DeviceConfig) -> Result<Box<dyn CameraDevice>, CaptureError>;
}

/// An open camera device.
pub trait CameraDevice: Send {
    /// Block until the next frame arrives, or at most the read timeout
    /// ([`CaptureError::Timeout`]).
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Release the hardware. Further reads fail with [`CaptureError::Closed`].
    fn close(&mut self);
}
