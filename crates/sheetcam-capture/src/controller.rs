use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::{CameraBackend, CaptureError, DeviceConfig, FrameReader, FrameSlot, FrameSource};
use sheetcam_core::Frame;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Consecutive failed reads after which the capture loop gives up.
const MAX_CONSECUTIVE_FAILURES: u32 = 8;

struct Worker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Starts and stops the background capture loop.
///
/// The controller is the only owner of the camera device while running. It
/// is an ordinary value: share it behind an `Arc` with whatever handles
/// requests. States are `Stopped` and `Running`; `stop` joins the loop before
/// returning, so a stopped controller never holds the device.
pub struct CaptureController {
    backend: Arc<dyn CameraBackend>,
    config: DeviceConfig,
    slot: Arc<FrameSlot>,
    worker: Mutex<Option<Worker>>,
}

impl CaptureController {
    pub fn new(backend: Arc<dyn CameraBackend>, config: DeviceConfig) -> Self {
        Self {
            backend,
            config,
            slot: Arc::new(FrameSlot::new()),
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the device and start the capture loop. No-op when running.
    ///
    /// The device is opened on the calling thread: a
    /// [`CaptureError::DeviceUnavailable`] is returned here and leaves the
    /// controller stopped.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self), fields(device = self.config.index)))]
    pub fn start(&self) -> Result<(), CaptureError> {
        let mut guard = self.lock();
        if let Some(worker) = guard.as_ref() {
            if !worker.handle.is_finished() {
                return Ok(());
            }
        }
        // A loop that ended on its own is reaped before restarting.
        if let Some(worker) = guard.take() {
            join(worker);
        }

        let source = FrameSource::with_slot(self.backend.as_ref(), &self.config, self.slot.clone())?;
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name("sheetcam-capture".into())
            .spawn(move || capture_loop(source, flag))
            .map_err(|e| CaptureError::Spawn(e.to_string()))?;

        *guard = Some(Worker { stop, handle });
        log::info!("capture started on device {}", self.config.index);
        Ok(())
    }

    /// Stop the loop, release the device and drop the held frame.
    /// No-op when stopped.
    ///
    /// The worker lock is held until the device is closed, so a concurrent
    /// [`start`](Self::start) waits instead of opening a second device.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self)))]
    pub fn stop(&self) {
        let mut guard = self.lock();
        let Some(worker) = guard.take() else {
            return;
        };
        worker.stop.store(true, Ordering::Release);
        join(worker);
        self.slot.clear();
        drop(guard);
        log::info!("capture stopped on device {}", self.config.index);
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|w| !w.handle.is_finished())
    }

    /// Read-only handle on the latest-frame slot. Stays valid across restarts.
    pub fn reader(&self) -> FrameReader {
        FrameReader::new(self.slot.clone())
    }

    /// The newest captured frame.
    pub fn latest_frame(&self) -> Result<Arc<Frame>, CaptureError> {
        if !self.is_running() {
            return Err(CaptureError::NoFrameAvailable);
        }
        self.slot.latest().ok_or(CaptureError::NoFrameAvailable)
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CaptureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureController")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("published", &self.slot.published())
            .finish()
    }
}

fn join(worker: Worker) {
    if worker.handle.join().is_err() {
        log::error!("capture worker panicked");
    }
}

fn capture_loop(mut source: FrameSource, stop: Arc<AtomicBool>) {
    let mut failures = 0u32;
    while !stop.load(Ordering::Acquire) {
        match source.pump() {
            Ok(_) => failures = 0,
            Err(CaptureError::Timeout) => {
                log::debug!("camera read timed out");
            }
            Err(CaptureError::Closed) => break,
            Err(err) => {
                failures += 1;
                log::warn!("camera read failed ({failures}/{MAX_CONSECUTIVE_FAILURES}): {err}");
                if failures >= MAX_CONSECUTIVE_FAILURES {
                    log::error!("capture loop giving up after {failures} failed reads");
                    break;
                }
            }
        }
    }
    source.close();
}
