use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::{CameraBackend, CameraDevice, CaptureError, DeviceConfig};
use sheetcam_core::Frame;

/// In-memory camera backend that replays a fixed list of frames.
///
/// Used for stills, tests and machines without a camera. Every opened
/// device loops over the frames, waiting `interval` before each one.
#[derive(Clone, Debug)]
pub struct FrameSequenceBackend {
    frames: Arc<Vec<Frame>>,
    interval: Duration,
    available: bool,
    open: Arc<AtomicUsize>,
}

impl FrameSequenceBackend {
    pub fn new(frames: Vec<Frame>, interval: Duration) -> Self {
        Self {
            frames: Arc::new(frames),
            interval,
            available: true,
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A backend whose device can never be opened.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Vec::new(), Duration::ZERO)
        }
    }

    /// Number of devices opened and not yet closed.
    pub fn open_devices(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }
}

impl CameraBackend for FrameSequenceBackend {
    fn open(&self, config: &DeviceConfig) -> Result<Box<dyn CameraDevice>, CaptureError> {
        if !self.available {
            return Err(CaptureError::DeviceUnavailable {
                index: config.index,
                reason: "no such device".into(),
            });
        }
        self.open.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(SequenceDevice {
            frames: self.frames.clone(),
            next: 0,
            interval: self.interval,
            timeout: config.read_timeout(),
            open: Some(self.open.clone()),
        }))
    }
}

struct SequenceDevice {
    frames: Arc<Vec<Frame>>,
    next: usize,
    interval: Duration,
    timeout: Duration,
    open: Option<Arc<AtomicUsize>>,
}

impl CameraDevice for SequenceDevice {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        if self.open.is_none() {
            return Err(CaptureError::Closed);
        }
        if self.frames.is_empty() {
            std::thread::sleep(self.timeout);
            return Err(CaptureError::Timeout);
        }
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
        let frame = self.frames[self.next % self.frames.len()].clone();
        self.next = self.next.wrapping_add(1);
        Ok(frame)
    }

    fn close(&mut self) {
        if let Some(open) = self.open.take() {
            open.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl Drop for SequenceDevice {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetcam_core::PixelFormat;

    #[test]
    fn cycles_through_frames() {
        let frames = vec![
            Frame::filled(1, 1, PixelFormat::Gray8, 10),
            Frame::filled(1, 1, PixelFormat::Gray8, 20),
        ];
        let backend = FrameSequenceBackend::new(frames, Duration::ZERO);
        let mut dev = backend.open(&DeviceConfig::default()).unwrap();
        let seen: Vec<u8> = (0..5).map(|_| dev.read_frame().unwrap().data()[0]).collect();
        assert_eq!(seen, vec![10, 20, 10, 20, 10]);
    }

    #[test]
    fn empty_sequence_times_out() {
        let backend = FrameSequenceBackend::new(Vec::new(), Duration::ZERO);
        let config = DeviceConfig {
            read_timeout_ms: 1,
            ..DeviceConfig::default()
        };
        let mut dev = backend.open(&config).unwrap();
        assert_eq!(dev.read_frame().unwrap_err(), CaptureError::Timeout);
    }

    #[test]
    fn tracks_open_devices() {
        let backend = FrameSequenceBackend::new(Vec::new(), Duration::ZERO);
        let mut a = backend.open(&DeviceConfig::default()).unwrap();
        let b = backend.open(&DeviceConfig::default()).unwrap();
        assert_eq!(backend.open_devices(), 2);
        a.close();
        assert_eq!(a.read_frame().unwrap_err(), CaptureError::Closed);
        drop(b);
        assert_eq!(backend.open_devices(), 0);
    }
}
