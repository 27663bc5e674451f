use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sheetcam::aruco::synthetic::SyntheticSheet;
use sheetcam::capture::{CaptureError, FrameSequenceBackend};
use sheetcam::core::Homography;
use sheetcam::rectify::RectifyError;
use sheetcam::{
    frame_from_bytes, Frame, ImageFormat, PixelFormat, PostProcessOutput, PostProcessParams,
    SheetcamConfig, SheetcamError, VisionService,
};

fn sheet_frame(sheet: &SyntheticSheet) -> Frame {
    let h = Homography::from_array([
        [3.6, 0.4, 80.0],
        [-0.3, 3.4, 70.0],
        [0.0004, 0.0006, 1.0],
    ]);
    sheet.render(560, 520, &h)
}

fn service(frames: Vec<Frame>) -> VisionService {
    let backend = Arc::new(FrameSequenceBackend::new(frames, Duration::from_millis(2)));
    VisionService::with_backend(backend, SheetcamConfig::default()).expect("service")
}

fn wait_for_frame(service: &VisionService) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while service.latest_frame().is_err() {
        assert!(Instant::now() < deadline, "no frame within 5 s");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn raw_frame_requires_running_capture() {
    let service = service(vec![sheet_frame(&SyntheticSheet::default())]);
    let err = service.get_raw_frame(ImageFormat::Png).unwrap_err();
    assert!(matches!(err, SheetcamError::Capture(CaptureError::NoFrameAvailable)));
    assert!(err.is_recoverable());
}

#[test]
fn raw_frame_round_trips_through_png() {
    let frame = sheet_frame(&SyntheticSheet::default());
    let service = service(vec![frame.clone()]);
    service.start_capture().unwrap();
    wait_for_frame(&service);

    let png = service.get_raw_frame(ImageFormat::Png).unwrap();
    assert_eq!((png.width, png.height), (560, 520));
    assert_eq!(frame_from_bytes(&png.bytes).unwrap(), frame);

    let jpg = service.get_raw_frame_default().unwrap();
    assert_eq!(jpg.mime_type(), "image/jpeg");
    service.stop_capture();
}

#[test]
fn rectified_frame_has_requested_size() {
    let service = service(vec![sheet_frame(&SyntheticSheet::default())]);
    service.start_capture().unwrap();
    wait_for_frame(&service);

    let params = PostProcessParams {
        output: PostProcessOutput::Mask,
        ..PostProcessParams::default()
    };
    let png = service
        .get_rectified_frame(240, &params, ImageFormat::Png)
        .unwrap();
    let out = frame_from_bytes(&png.bytes).unwrap();
    assert_eq!((out.width(), out.height()), (240, 240));
    assert_eq!(out.format(), PixelFormat::Gray8);
    assert!(out.data().iter().all(|&v| v == 0 || v == 255));
    service.stop_capture();
}

#[test]
fn missing_marker_is_named() {
    let sheet = SyntheticSheet {
        ids: [1, 2, 9, 3],
        ..SyntheticSheet::default()
    };
    let service = service(vec![sheet_frame(&sheet)]);
    service.start_capture().unwrap();
    wait_for_frame(&service);

    let err = service
        .get_rectified_frame(200, &PostProcessParams::default(), ImageFormat::Png)
        .unwrap_err();
    assert!(err.is_recoverable());
    assert_eq!(err.missing_markers(), Some(&[4][..]));
    service.stop_capture();
}

#[test]
fn swapped_top_markers_are_degenerate() {
    // Ids 1 and 2 trade places: the selected outer corners form a bow tie.
    let sheet = SyntheticSheet {
        ids: [2, 1, 4, 3],
        ..SyntheticSheet::default()
    };
    let service = service(vec![sheet_frame(&sheet)]);
    service.start_capture().unwrap();
    wait_for_frame(&service);
    assert_eq!(
        service.detect_markers().unwrap().ids().collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );

    let err = service
        .get_rectified_frame(200, &PostProcessParams::default(), ImageFormat::Png)
        .unwrap_err();
    assert!(
        matches!(err, SheetcamError::Rectify(RectifyError::DegenerateGeometry { .. })),
        "{err:?}"
    );
    assert!(err.is_recoverable());
    assert_eq!(err.missing_markers(), None);
    service.stop_capture();
}

#[test]
fn concurrent_raw_frames_are_never_torn() {
    let frames: Vec<Frame> = (0..7u8)
        .map(|v| Frame::filled(64, 48, PixelFormat::Rgb8, v.wrapping_mul(37)))
        .collect();
    let backend = Arc::new(FrameSequenceBackend::new(frames, Duration::from_micros(200)));
    let service = Arc::new(
        VisionService::with_backend(backend, SheetcamConfig::default()).expect("service"),
    );
    service.start_capture().unwrap();
    wait_for_frame(&service);

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let service = service.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    let png = service.get_raw_frame(ImageFormat::Png).expect("raw frame");
                    let frame = frame_from_bytes(&png.bytes).expect("decodable png");
                    assert_eq!((frame.width(), frame.height()), (64, 48));
                    let first = frame.data()[0];
                    assert!(frame.data().iter().all(|&v| v == first), "torn frame");
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("reader thread");
    }
    service.stop_capture();
}

#[test]
fn detect_markers_reports_all_four() {
    let service = service(vec![sheet_frame(&SyntheticSheet::default())]);
    service.start_capture().unwrap();
    wait_for_frame(&service);
    let detection = service.detect_markers().unwrap();
    assert_eq!(detection.ids().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    service.stop_capture();
    assert!(!service.is_capturing());
}

#[test]
fn process_frame_works_without_capture() {
    let service = service(Vec::new());
    let out = service
        .process_frame(
            &sheet_frame(&SyntheticSheet::default()),
            160,
            &PostProcessParams::default(),
        )
        .unwrap();
    assert_eq!((out.width(), out.height()), (160, 160));
}

#[test]
fn unavailable_camera_is_not_recoverable() {
    let backend = Arc::new(FrameSequenceBackend::unavailable());
    let service = VisionService::with_backend(backend, SheetcamConfig::default()).unwrap();
    let err = service.start_capture().unwrap_err();
    assert!(!err.is_recoverable());
    assert!(!service.is_capturing());
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let mut config = SheetcamConfig::default();
    config.detector.dictionary = "NO_SUCH_DICT".into();
    let backend = Arc::new(FrameSequenceBackend::new(Vec::new(), Duration::ZERO));
    assert!(matches!(
        VisionService::with_backend(backend, config),
        Err(SheetcamError::Detect(_))
    ));
}
