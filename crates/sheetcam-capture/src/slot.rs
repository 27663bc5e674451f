use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::CaptureError;
use sheetcam_core::Frame;

/// Single-slot holder for the newest frame.
///
/// Publishing swaps in a new `Arc<Frame>`; older frames are dropped once the
/// last reader lets go of them. No frames are queued.
#[derive(Debug, Default)]
pub struct FrameSlot {
    latest: Mutex<Option<Arc<Frame>>>,
    published: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<Frame>>> {
        // A panicking writer cannot leave a half-swapped `Option`.
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the held frame.
    pub fn publish(&self, frame: Arc<Frame>) {
        *self.lock() = Some(frame);
        self.published.fetch_add(1, Ordering::Release);
    }

    /// Newest frame, if any.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    /// Number of frames published since creation.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }
}

/// Cloneable read-only handle on a [`FrameSlot`].
#[derive(Clone, Debug)]
pub struct FrameReader {
    slot: Arc<FrameSlot>,
}

impl FrameReader {
    pub(crate) fn new(slot: Arc<FrameSlot>) -> Self {
        Self { slot }
    }

    /// The newest frame, or [`CaptureError::NoFrameAvailable`].
    pub fn latest(&self) -> Result<Arc<Frame>, CaptureError> {
        self.slot.latest().ok_or(CaptureError::NoFrameAvailable)
    }

    pub fn published(&self) -> u64 {
        self.slot.published()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetcam_core::PixelFormat;

    #[test]
    fn keeps_only_the_newest_frame() {
        let slot = Arc::new(FrameSlot::new());
        let reader = FrameReader::new(slot.clone());
        assert_eq!(reader.latest().unwrap_err(), CaptureError::NoFrameAvailable);

        for v in [1u8, 2, 3] {
            slot.publish(Arc::new(Frame::filled(2, 2, PixelFormat::Gray8, v)));
        }
        assert_eq!(reader.latest().unwrap().data()[0], 3);
        assert_eq!(reader.published(), 3);

        slot.clear();
        assert!(reader.latest().is_err());
    }

    #[test]
    fn held_frame_survives_replacement() {
        let slot = FrameSlot::new();
        slot.publish(Arc::new(Frame::filled(1, 1, PixelFormat::Gray8, 7)));
        let held = slot.latest().unwrap();
        slot.publish(Arc::new(Frame::filled(1, 1, PixelFormat::Gray8, 9)));
        assert_eq!(held.data(), &[7]);
    }
}
