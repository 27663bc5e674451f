use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sheetcam_aruco::synthetic::SyntheticSheet;
use sheetcam_aruco::{MarkerDetector, MarkerDetectorParams, ThresholdMode};
use sheetcam_core::Homography;

fn bench_detect(c: &mut Criterion) {
    let sheet = SyntheticSheet::default();
    let h = Homography::from_array([[5.2, 0.3, 140.0], [-0.2, 5.0, 60.0], [0.0002, 0.0003, 1.0]]);
    let frame = sheet.render(1280, 720, &h);

    let otsu = MarkerDetector::new(MarkerDetectorParams::default()).expect("detector");
    c.bench_function("detect_otsu_1280x720", |b| {
        b.iter(|| otsu.detect(black_box(&frame)))
    });

    let adaptive = MarkerDetector::new(MarkerDetectorParams {
        threshold: ThresholdMode::AdaptiveMean {
            radius: 15,
            offset: 7.0,
        },
        ..MarkerDetectorParams::default()
    })
    .expect("detector");
    c.bench_function("detect_adaptive_1280x720", |b| {
        b.iter(|| adaptive.detect(black_box(&frame)))
    });
}

criterion_group!(benches, bench_detect);
criterion_main!(benches);
