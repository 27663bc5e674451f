use std::sync::Arc;

use crate::{CameraBackend, CameraDevice, CaptureError, DeviceConfig, FrameReader, FrameSlot};
use sheetcam_core::Frame;

/// Owns one open camera device and serves the latest frame read from it.
pub struct FrameSource {
    device: Option<Box<dyn CameraDevice>>,
    slot: Arc<FrameSlot>,
    index: usize,
}

impl FrameSource {
    /// Open the device described by `config` with a fresh frame slot.
    pub fn open(backend: &dyn CameraBackend, config: &DeviceConfig) -> Result<Self, CaptureError> {
        Self::with_slot(backend, config, Arc::new(FrameSlot::new()))
    }

    /// Open the device and publish into an existing slot.
    pub fn with_slot(
        backend: &dyn CameraBackend,
        config: &DeviceConfig,
        slot: Arc<FrameSlot>,
    ) -> Result<Self, CaptureError> {
        let device = backend.open(config)?;
        log::info!(
            "opened camera {} ({}x{}, {:?})",
            config.index,
            config.width,
            config.height,
            config.pixel_format
        );
        Ok(Self {
            device: Some(device),
            slot,
            index: config.index,
        })
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Blocking read of one frame from the device, published to the slot.
    pub fn pump(&mut self) -> Result<Arc<Frame>, CaptureError> {
        let device = self.device.as_mut().ok_or(CaptureError::Closed)?;
        let frame = Arc::new(device.read_frame()?);
        self.slot.publish(frame.clone());
        Ok(frame)
    }

    /// Most recently published frame.
    pub fn read_latest_frame(&self) -> Result<Arc<Frame>, CaptureError> {
        if self.device.is_none() {
            return Err(CaptureError::NoFrameAvailable);
        }
        self.slot.latest().ok_or(CaptureError::NoFrameAvailable)
    }

    pub fn reader(&self) -> FrameReader {
        FrameReader::new(self.slot.clone())
    }

    /// Release the device. Closing twice is a no-op.
    pub fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.close();
            log::info!("closed camera {}", self.index);
        }
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSource")
            .field("index", &self.index)
            .field("open", &self.is_open())
            .field("published", &self.slot.published())
            .finish()
    }
}
