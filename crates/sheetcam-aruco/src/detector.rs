//! Frame-level marker detection.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::builtins::{builtin_dictionary, DEFAULT_DICTIONARY};
use crate::decode::QuadDecoder;
use crate::quad::{find_quads, QuadLimits};
use crate::{canonical_corners, DetectError, Dictionary, Matcher};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use sheetcam_core::{adaptive_mean_dark, global_dark, otsu_threshold_from_histogram};
use sheetcam_core::{histogram, Frame};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// How dark pixels are separated from the background before quad search.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ThresholdMode {
    /// One global Otsu threshold for the whole frame.
    #[default]
    Otsu,
    /// Dark when `v + offset` is below the mean of the `(2r+1)²` window.
    AdaptiveMean { radius: usize, offset: f32 },
}

/// Configuration for [`MarkerDetector`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerDetectorParams {
    /// Built-in dictionary name.
    pub dictionary: String,
    /// Codes file (`*_CODES.json`) used instead of the built-in dictionary.
    pub dictionary_file: Option<PathBuf>,
    /// Binarisation used to find marker candidates.
    pub threshold: ThresholdMode,
    /// Smallest dark component (in pixels) considered as a marker.
    pub min_component_px: usize,
    /// Largest dark component as a fraction of the frame area.
    pub max_component_frac: f32,
    /// Shortest accepted quad side, in pixels.
    pub min_side_px: f32,
    /// Quads closer than this to the frame border are dropped.
    pub border_margin_px: f32,
    /// Marker border width in cells.
    pub border_bits: usize,
    /// Require border-black ratio >= this.
    pub min_border_score: f32,
    /// Maximum corrected bit errors (clamped to the dictionary's capability).
    pub max_hamming: u8,
}

impl Default for MarkerDetectorParams {
    fn default() -> Self {
        Self {
            dictionary: DEFAULT_DICTIONARY.to_string(),
            dictionary_file: None,
            threshold: ThresholdMode::Otsu,
            min_component_px: 64,
            max_component_frac: 0.25,
            min_side_px: 16.0,
            border_margin_px: 2.0,
            border_bits: 1,
            min_border_score: 0.85,
            max_hamming: 2,
        }
    }
}

impl MarkerDetectorParams {
    /// The configured dictionary: the codes file when set, else the
    /// built-in one named by `dictionary`.
    pub fn resolve_dictionary(&self) -> Result<Dictionary, DetectError> {
        match &self.dictionary_file {
            Some(path) => Dictionary::from_json_file(path),
            None => builtin_dictionary(&self.dictionary)
                .ok_or_else(|| DetectError::UnknownDictionary(self.dictionary.clone())),
        }
    }
}

/// One decoded marker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedMarker {
    pub id: u32,
    /// Image corners, clockwise, starting at the marker's own top-left.
    pub corners: [Point2<f32>; 4],
    /// Quarter turns (clockwise) of the marker as seen in the image.
    pub rotation: u8,
    pub hamming: u8,
    /// Border quality times the Hamming penalty, in `[0, 1]`.
    pub score: f32,
}

/// Markers found in one frame, keyed by id.
///
/// Holds at most one marker per id; an empty detection is a valid result.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerDetection {
    markers: BTreeMap<u32, DetectedMarker>,
}

impl MarkerDetection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a marker, keeping the better-scoring one when the id is taken.
    ///
    /// Returns `true` when `marker` was stored.
    pub fn insert(&mut self, marker: DetectedMarker) -> bool {
        match self.markers.get(&marker.id) {
            Some(prev) if prev.score >= marker.score => false,
            _ => {
                self.markers.insert(marker.id, marker);
                true
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<&DetectedMarker> {
        self.markers.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.markers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Detected ids, ascending.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.markers.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DetectedMarker> {
        self.markers.values()
    }
}

impl FromIterator<DetectedMarker> for MarkerDetection {
    fn from_iter<I: IntoIterator<Item = DetectedMarker>>(iter: I) -> Self {
        let mut out = Self::new();
        for m in iter {
            out.insert(m);
        }
        out
    }
}

/// Detects dictionary markers in frames.
///
/// Stateless apart from its configuration; share it freely between threads.
#[derive(Clone, Debug)]
pub struct MarkerDetector {
    params: MarkerDetectorParams,
    matcher: Matcher,
}

impl MarkerDetector {
    pub fn new(params: MarkerDetectorParams) -> Result<Self, DetectError> {
        let dict = params.resolve_dictionary()?;
        if dict.bit_count() > 64 {
            return Err(DetectError::UnsupportedDictionary {
                name: dict.name.to_string(),
                bits: dict.bit_count(),
            });
        }
        if !(params.max_component_frac > 0.0 && params.max_component_frac <= 1.0) {
            return Err(DetectError::InvalidParams(
                "max_component_frac must be in (0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&params.min_border_score) {
            return Err(DetectError::InvalidParams(
                "min_border_score must be in [0, 1]",
            ));
        }
        let matcher = Matcher::new(dict, params.max_hamming);
        Ok(Self { params, matcher })
    }

    pub fn params(&self) -> &MarkerDetectorParams {
        &self.params
    }

    /// Detect markers in `frame`. Never fails; unknown or unreadable
    /// candidates are skipped.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(width = frame.width(), height = frame.height()))
    )]
    pub fn detect(&self, frame: &Frame) -> MarkerDetection {
        let mut out = MarkerDetection::new();
        if frame.is_empty() {
            return out;
        }

        let gray = frame.to_gray();
        let view = gray.view();
        let dark = match self.params.threshold {
            ThresholdMode::Otsu => {
                let t = otsu_threshold_from_histogram(&histogram(&view));
                log::debug!("otsu threshold {t}");
                global_dark(&view, t)
            }
            ThresholdMode::AdaptiveMean { radius, offset } => {
                adaptive_mean_dark(&view, radius, offset)
            }
        };

        let area = (gray.width * gray.height) as f32;
        let limits = QuadLimits {
            min_component_px: self.params.min_component_px,
            max_component_px: (self.params.max_component_frac * area) as usize,
            min_side_px: self.params.min_side_px,
            border_margin_px: self.params.border_margin_px,
        };
        let quads = find_quads(&dark, gray.width, gray.height, &limits);

        let mut decoder =
            QuadDecoder::new(&self.matcher, self.params.border_bits, self.params.min_border_score);
        for quad in &quads {
            let Some(d) = decoder.decode(&view, quad) else {
                continue;
            };
            out.insert(DetectedMarker {
                id: d.id,
                corners: canonical_corners(*quad, d.rotation),
                rotation: d.rotation,
                hamming: d.hamming,
                score: d.score,
            });
        }

        log::debug!(
            "decoded {} markers from {} quads: {:?}",
            out.len(),
            quads.len(),
            out.ids().collect::<Vec<_>>()
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticSheet;
    use sheetcam_core::{Homography, PixelFormat};

    fn assert_corners_close(got: &[Point2<f32>; 4], want: &[Point2<f32>; 4], tol: f32) {
        for (g, w) in got.iter().zip(want) {
            assert!(
                (*g - *w).norm() < tol,
                "corner {g:?} too far from {w:?} (tol {tol})"
            );
        }
    }

    fn fronto_parallel() -> Homography {
        // 4 px per sheet unit, sheet origin at (60, 40).
        Homography::from_array([[4.0, 0.0, 60.0], [0.0, 4.0, 40.0], [0.0, 0.0, 1.0]])
    }

    #[test]
    fn finds_all_four_sheet_markers() {
        let sheet = SyntheticSheet::default();
        let h = fronto_parallel();
        let frame = sheet.render(520, 480, &h);

        let detector = MarkerDetector::new(MarkerDetectorParams::default()).unwrap();
        let det = detector.detect(&frame);

        assert_eq!(det.ids().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        for slot in 0..4 {
            let id = sheet.ids[slot];
            let m = det.get(id).unwrap();
            assert_eq!(m.rotation, 0);
            assert_eq!(m.hamming, 0);
            let want = sheet.marker_corners(slot).map(|p| h.apply(p));
            assert_corners_close(&m.corners, &want, 0.75);
        }
    }

    #[test]
    fn corner_order_follows_marker_orientation() {
        let mut sheet = SyntheticSheet::default();
        sheet.rotations = [1, 2, 3, 0];
        let h = Homography::from_array([
            [3.6, 0.4, 80.0],
            [-0.3, 3.4, 70.0],
            [0.0004, 0.0006, 1.0],
        ]);
        let frame = sheet.render(560, 520, &h);

        let detector = MarkerDetector::new(MarkerDetectorParams::default()).unwrap();
        let det = detector.detect(&frame);
        assert_eq!(det.len(), 4);

        for slot in 0..4 {
            let m = det.get(sheet.ids[slot]).unwrap();
            assert_eq!(m.rotation, sheet.rotations[slot]);
            let want = sheet.marker_corners(slot).map(|p| h.apply(p));
            assert_corners_close(&m.corners, &want, 1.0);
        }
    }

    #[test]
    fn adaptive_threshold_finds_markers_in_rgb_frame() {
        let sheet = SyntheticSheet::default();
        let gray = sheet.render(520, 480, &fronto_parallel());
        let rgb: Vec<u8> = gray.data().iter().flat_map(|&v| [v, v, v]).collect();
        let frame = Frame::new(520, 480, PixelFormat::Rgb8, rgb).unwrap();

        let params = MarkerDetectorParams {
            threshold: ThresholdMode::AdaptiveMean {
                radius: 25,
                offset: 10.0,
            },
            ..MarkerDetectorParams::default()
        };
        let det = MarkerDetector::new(params).unwrap().detect(&frame);
        assert_eq!(det.len(), 4);
    }

    #[test]
    fn blank_frame_yields_empty_detection() {
        let detector = MarkerDetector::new(MarkerDetectorParams::default()).unwrap();
        let frame = Frame::filled(200, 100, PixelFormat::Gray8, 240);
        assert!(detector.detect(&frame).is_empty());
        let empty = Frame::filled(0, 0, PixelFormat::Rgb8, 0);
        assert!(detector.detect(&empty).is_empty());
    }

    #[test]
    fn unknown_dictionary_is_rejected() {
        let params = MarkerDetectorParams {
            dictionary: "DICT_APRILTAG_36h11".into(),
            ..MarkerDetectorParams::default()
        };
        assert_eq!(
            MarkerDetector::new(params).unwrap_err(),
            DetectError::UnknownDictionary("DICT_APRILTAG_36h11".into())
        );
    }

    #[test]
    fn markers_from_a_codes_file_are_decoded() {
        // A printed set whose id 1 is not the built-in id 1.
        let builtin = crate::builtins::SHEETCAM_6X6_50;
        let codes: Vec<String> = builtin
            .codes
            .iter()
            .rev()
            .map(|&code| (0..36).map(|i| if (code >> i) & 1 == 1 { '1' } else { '0' }).collect())
            .collect();
        let json = serde_json::json!({
            "name": "PRINTED_6X6_50",
            "marker_size": 6,
            "max_correction_bits": 6,
            "codes": codes,
        });
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PRINTED_6X6_50_CODES.json");
        std::fs::write(&path, json.to_string()).unwrap();

        let params = MarkerDetectorParams {
            dictionary_file: Some(path),
            ..MarkerDetectorParams::default()
        };
        let printed = params.resolve_dictionary().unwrap();
        assert_eq!(printed.name, "PRINTED_6X6_50");
        assert_eq!(printed.code(1), builtin.code(48));

        let sheet = SyntheticSheet {
            dictionary: printed,
            ..SyntheticSheet::default()
        };
        let frame = sheet.render(520, 480, &fronto_parallel());

        let det = MarkerDetector::new(params).unwrap().detect(&frame);
        assert_eq!(det.ids().collect::<Vec<_>>(), vec![1, 2, 3, 4]);

        let with_builtin = MarkerDetector::new(MarkerDetectorParams::default())
            .unwrap()
            .detect(&frame);
        assert!(!with_builtin.contains(1));
    }

    #[test]
    fn unreadable_codes_file_is_a_config_error() {
        let params = MarkerDetectorParams {
            dictionary_file: Some("/no/such/dir/DICT_6X6_250_CODES.json".into()),
            ..MarkerDetectorParams::default()
        };
        assert!(matches!(
            MarkerDetector::new(params).unwrap_err(),
            DetectError::DictionaryFile { .. }
        ));
    }

    #[test]
    fn detection_keeps_best_score_per_id() {
        let corners = [Point2::new(0.0, 0.0); 4];
        let weak = DetectedMarker {
            id: 3,
            corners,
            rotation: 0,
            hamming: 2,
            score: 0.5,
        };
        let strong = DetectedMarker { score: 0.9, ..weak };
        let det: MarkerDetection = [weak, strong, weak].into_iter().collect();
        assert_eq!(det.len(), 1);
        assert_eq!(det.get(3).unwrap().score, 0.9);
    }

    #[test]
    fn params_accept_partial_json() {
        let params: MarkerDetectorParams =
            serde_json::from_str(r#"{"threshold":{"kind":"adaptive_mean","radius":9,"offset":4.0}}"#)
                .unwrap();
        assert_eq!(params.dictionary, DEFAULT_DICTIONARY);
        assert_eq!(
            params.threshold,
            ThresholdMode::AdaptiveMean {
                radius: 9,
                offset: 4.0
            }
        );
    }
}
