use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sheetcam_capture::{CaptureController, CaptureError, DeviceConfig, FrameSequenceBackend};
use sheetcam_core::{Frame, PixelFormat};

fn uniform_frames(n: u8) -> Vec<Frame> {
    (0..n)
        .map(|v| Frame::filled(64, 48, PixelFormat::Rgb8, v.wrapping_mul(37)))
        .collect()
}

fn controller(frames: Vec<Frame>) -> (Arc<FrameSequenceBackend>, CaptureController) {
    let backend = Arc::new(FrameSequenceBackend::new(frames, Duration::from_micros(200)));
    let ctl = CaptureController::new(backend.clone(), DeviceConfig::default());
    (backend, ctl)
}

fn wait_until(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached within 5 s");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn no_frame_before_start() {
    let (_, ctl) = controller(uniform_frames(2));
    assert_eq!(ctl.latest_frame().unwrap_err(), CaptureError::NoFrameAvailable);
}

#[test]
fn double_start_keeps_one_device() {
    let (backend, ctl) = controller(uniform_frames(2));
    ctl.start().unwrap();
    ctl.start().unwrap();
    assert!(ctl.is_running());
    assert_eq!(backend.open_devices(), 1);
    ctl.stop();
}

#[test]
fn double_stop_is_a_no_op() {
    let (backend, ctl) = controller(uniform_frames(2));
    ctl.stop();
    ctl.start().unwrap();
    ctl.stop();
    ctl.stop();
    assert!(!ctl.is_running());
    assert_eq!(backend.open_devices(), 0);
}

#[test]
fn unavailable_device_registers_no_worker() {
    let ctl = CaptureController::new(
        Arc::new(FrameSequenceBackend::unavailable()),
        DeviceConfig {
            index: 3,
            ..DeviceConfig::default()
        },
    );
    let err = ctl.start().unwrap_err();
    assert!(matches!(err, CaptureError::DeviceUnavailable { index: 3, .. }));
    assert!(!ctl.is_running());
    assert_eq!(ctl.latest_frame().unwrap_err(), CaptureError::NoFrameAvailable);
}

#[test]
fn frame_released_and_device_closed_after_stop() {
    let (backend, ctl) = controller(uniform_frames(3));
    let reader = ctl.reader();
    ctl.start().unwrap();
    wait_until(|| reader.published() > 0);
    ctl.stop();
    assert_eq!(backend.open_devices(), 0);
    assert!(reader.latest().is_err());
    assert_eq!(ctl.latest_frame().unwrap_err(), CaptureError::NoFrameAvailable);
}

#[test]
fn restart_after_stop() {
    let (backend, ctl) = controller(uniform_frames(2));
    let reader = ctl.reader();
    ctl.start().unwrap();
    wait_until(|| reader.published() > 0);
    ctl.stop();
    let before = reader.published();
    ctl.start().unwrap();
    wait_until(|| reader.published() > before);
    assert!(ctl.latest_frame().is_ok());
    drop(ctl);
    assert_eq!(backend.open_devices(), 0);
}

#[test]
fn start_during_stop_waits_for_the_device_to_close() {
    let backend = Arc::new(FrameSequenceBackend::new(
        uniform_frames(2),
        Duration::from_millis(300),
    ));
    let ctl = Arc::new(CaptureController::new(backend.clone(), DeviceConfig::default()));
    ctl.start().unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let peak = Arc::new(AtomicUsize::new(0));
    let watcher = {
        let (backend, done, peak) = (backend.clone(), done.clone(), peak.clone());
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                peak.fetch_max(backend.open_devices(), Ordering::AcqRel);
                thread::yield_now();
            }
        })
    };

    let stopper = {
        let ctl = ctl.clone();
        thread::spawn(move || ctl.stop())
    };
    thread::sleep(Duration::from_millis(50));
    ctl.start().unwrap();
    let reader = ctl.reader();
    let before = reader.published();
    stopper.join().expect("stop thread");

    // Frames of the new session survive the earlier stop.
    wait_until(|| reader.published() > before);
    done.store(true, Ordering::Release);
    watcher.join().expect("watcher thread");

    assert_eq!(peak.load(Ordering::Acquire), 1, "two devices held at once");
    assert!(ctl.is_running());
    assert_eq!(backend.open_devices(), 1);
    assert!(ctl.latest_frame().is_ok());
    ctl.stop();
    assert_eq!(backend.open_devices(), 0);
}

#[test]
fn concurrent_readers_never_see_torn_frames() {
    let (_, ctl) = controller(uniform_frames(7));
    let ctl = Arc::new(ctl);
    ctl.start().unwrap();
    let reader = ctl.reader();
    wait_until(|| reader.published() > 0);

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let reader = reader.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let frame = reader.latest().expect("frame while running");
                    let first = frame.data()[0];
                    assert!(frame.data().iter().all(|&v| v == first), "torn frame");
                    assert_eq!(frame.width(), 64);
                    assert_eq!(frame.height(), 48);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("reader thread");
    }
    ctl.stop();
}
