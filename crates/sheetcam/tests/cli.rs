use assert_cmd::Command;
use predicates::prelude::*;
use sheetcam::aruco::synthetic::SyntheticSheet;
use sheetcam::core::Homography;
use sheetcam::{load_frame, save_frame, ImageFormat, PixelFormat};
use std::path::Path;

fn write_sheet(path: &Path) {
    let h = Homography::from_array([[4.0, 0.0, 40.0], [0.0, 4.0, 30.0], [0.0, 0.0, 1.0]]);
    let frame = SyntheticSheet::default().render(480, 460, &h);
    save_frame(&frame, ImageFormat::Png, path).unwrap();
}

#[test]
fn prints_default_config() {
    Command::cargo_bin("sheetcam")
        .unwrap()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"output_size\": 800"))
        .stdout(predicate::str::contains("SHEETCAM_6X6_50"));
}

#[test]
fn detect_prints_marker_json() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("sheet.png");
    write_sheet(&img);

    let out = Command::cargo_bin("sheetcam")
        .unwrap()
        .args(["-q", "detect"])
        .arg(&img)
        .output()
        .unwrap();
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let ids: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
}

#[test]
fn rectify_writes_square_mask() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("sheet.png");
    let out = dir.path().join("top_down.png");
    write_sheet(&img);

    Command::cargo_bin("sheetcam")
        .unwrap()
        .args(["rectify", "--size", "200", "--output", "mask", "-o"])
        .arg(&out)
        .arg(&img)
        .assert()
        .success();

    let frame = load_frame(&out).unwrap();
    assert_eq!((frame.width(), frame.height()), (200, 200));
    assert_eq!(frame.format(), PixelFormat::Gray8);
}

#[test]
fn rectify_fails_without_markers() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("blank.png");
    let blank = sheetcam::Frame::filled(64, 64, PixelFormat::Gray8, 200);
    save_frame(&blank, ImageFormat::Png, &img).unwrap();

    Command::cargo_bin("sheetcam")
        .unwrap()
        .args(["rectify", "-o"])
        .arg(dir.path().join("out.png"))
        .arg(&img)
        .assert()
        .failure()
        .stderr(predicate::str::contains("InsufficientMarkers"));
}

#[test]
fn capture_replays_stills() {
    let dir = tempfile::tempdir().unwrap();
    let img = dir.path().join("sheet.png");
    write_sheet(&img);
    let out_dir = dir.path().join("frames");

    Command::cargo_bin("sheetcam")
        .unwrap()
        .args(["capture", "--frames", "2", "--still"])
        .arg(&img)
        .arg("-o")
        .arg(&out_dir)
        .assert()
        .success();

    assert!(out_dir.join("raw_0000.jpg").exists());
    assert!(out_dir.join("rectified_0001.png").exists());
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("cfg.json");
    std::fs::write(&cfg, r#"{ "rectifier": { "output_size": 320 } }"#).unwrap();

    Command::cargo_bin("sheetcam")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"output_size\": 320"));
}
