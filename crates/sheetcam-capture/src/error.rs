use sheetcam_core::CoreError;

/// Errors raised by camera devices, frame sources and the capture controller.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera device {index} unavailable: {reason}")]
    DeviceUnavailable { index: usize, reason: String },
    #[error("no frame available")]
    NoFrameAvailable,
    #[error("timed out waiting for a frame")]
    Timeout,
    #[error("device read failed: {0}")]
    Read(String),
    #[error("device is closed")]
    Closed,
    #[error("failed to start capture worker: {0}")]
    Spawn(String),
    #[error(transparent)]
    Frame(#[from] CoreError),
}
