//! Marker detections to point correspondences.

use crate::{CornerTable, RectifyError};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use sheetcam_aruco::MarkerDetection;

/// Four image points paired with the corners of the output square.
///
/// Both arrays are in destination order TL, TR, BR, BL.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrespondenceSet {
    /// Image points.
    pub src: [Point2<f32>; 4],
    /// `(0,0), (S,0), (S,S), (0,S)` for output size `S`.
    pub dst: [Point2<f32>; 4],
    pub output_size: u32,
}

impl CorrespondenceSet {
    pub fn new(src: [Point2<f32>; 4], output_size: u32) -> Self {
        let s = output_size as f32;
        Self {
            src,
            dst: [
                Point2::new(0.0, 0.0),
                Point2::new(s, 0.0),
                Point2::new(s, s),
                Point2::new(0.0, s),
            ],
            output_size,
        }
    }

    /// Reject source quads that cannot give a stable, non-mirrored warp.
    pub fn check_geometry(&self, min_separation: f32, min_sine: f32) -> Result<(), RectifyError> {
        let p = &self.src;
        if p.iter().any(|q| !q.x.is_finite() || !q.y.is_finite()) {
            return Err(RectifyError::degenerate("non-finite source point"));
        }

        for i in 0..4 {
            for j in i + 1..4 {
                let d = (p[i] - p[j]).norm();
                if d < min_separation {
                    return Err(RectifyError::degenerate(format!(
                        "source points {i} and {j} are {d:.2} px apart"
                    )));
                }
            }
        }

        for k in 0..4 {
            let a = p[(k + 3) % 4] - p[k];
            let b = p[(k + 1) % 4] - p[k];
            let sine = cross(a, b) / (a.norm() * b.norm());
            if sine.abs() < min_sine {
                return Err(RectifyError::degenerate(format!(
                    "source points around corner {k} are nearly collinear (sin={sine:.4})"
                )));
            }
        }

        // Clockwise on screen, same as the destination square.
        for k in 0..4 {
            let e0 = p[(k + 1) % 4] - p[k];
            let e1 = p[(k + 2) % 4] - p[(k + 1) % 4];
            if cross(e0, e1) <= 0.0 {
                return Err(RectifyError::degenerate(
                    "source quad is not convex or is mirrored",
                ));
            }
        }
        Ok(())
    }
}

#[inline]
fn cross(a: Vector2<f32>, b: Vector2<f32>) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Pick one corner per required marker according to `table`.
///
/// Fails with [`RectifyError::InsufficientMarkers`] listing every required id
/// that is absent from `detection`, ascending.
pub fn build_correspondence(
    detection: &MarkerDetection,
    table: &CornerTable,
    output_size: u32,
) -> Result<CorrespondenceSet, RectifyError> {
    let missing: Vec<u32> = table
        .required_ids()
        .into_iter()
        .filter(|&id| !detection.contains(id))
        .collect();
    if !missing.is_empty() {
        log::debug!("cannot rectify, missing markers {missing:?}");
        return Err(RectifyError::InsufficientMarkers { missing });
    }
    if output_size == 0 {
        return Err(RectifyError::InvalidOutputSize);
    }

    let mut src = [Point2::origin(); 4];
    for (slot, entry) in table.entries().iter().enumerate() {
        let marker = detection
            .get(entry.marker_id)
            .ok_or(RectifyError::InsufficientMarkers {
                missing: vec![entry.marker_id],
            })?;
        src[slot] = marker.corners[entry.corner as usize];
    }
    Ok(CorrespondenceSet::new(src, output_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetcam_aruco::DetectedMarker;

    fn marker(id: u32, x: f32, y: f32) -> DetectedMarker {
        DetectedMarker {
            id,
            corners: [
                Point2::new(x, y),
                Point2::new(x + 10.0, y),
                Point2::new(x + 10.0, y + 10.0),
                Point2::new(x, y + 10.0),
            ],
            rotation: 0,
            hamming: 0,
            score: 1.0,
        }
    }

    fn sheet_detection() -> MarkerDetection {
        [
            marker(1, 10.0, 10.0),
            marker(2, 80.0, 10.0),
            marker(3, 10.0, 80.0),
            marker(4, 80.0, 80.0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn picks_outer_corners_with_default_table() {
        let set = build_correspondence(&sheet_detection(), &CornerTable::default(), 100).unwrap();
        assert_eq!(
            set.src,
            [
                Point2::new(10.0, 10.0),
                Point2::new(90.0, 10.0),
                Point2::new(90.0, 90.0),
                Point2::new(10.0, 90.0),
            ]
        );
        assert_eq!(set.dst[2], Point2::new(100.0, 100.0));
        assert!(set.check_geometry(2.0, 0.05).is_ok());
    }

    #[test]
    fn empty_detection_names_all_required_ids() {
        let err = build_correspondence(&MarkerDetection::new(), &CornerTable::default(), 100)
            .unwrap_err();
        assert_eq!(
            err,
            RectifyError::InsufficientMarkers {
                missing: vec![1, 2, 3, 4]
            }
        );
    }

    #[test]
    fn three_markers_name_the_missing_one() {
        let det: MarkerDetection = sheet_detection().iter().copied().filter(|m| m.id != 2).collect();
        let err = build_correspondence(&det, &CornerTable::default(), 100).unwrap_err();
        assert_eq!(err, RectifyError::InsufficientMarkers { missing: vec![2] });
    }

    #[test]
    fn zero_output_size_is_rejected() {
        let err = build_correspondence(&sheet_detection(), &CornerTable::default(), 0).unwrap_err();
        assert_eq!(err, RectifyError::InvalidOutputSize);
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(50.0, 0.0),
            Point2::new(100.0, 0.5),
            Point2::new(150.0, 0.0),
        ];
        let err = CorrespondenceSet::new(src, 100)
            .check_geometry(2.0, 0.05)
            .unwrap_err();
        assert!(matches!(err, RectifyError::DegenerateGeometry { .. }));
    }

    #[test]
    fn coincident_points_are_degenerate() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(0.5, 0.0),
            Point2::new(100.0, 100.0),
            Point2::new(0.0, 100.0),
        ];
        assert!(CorrespondenceSet::new(src, 100)
            .check_geometry(2.0, 0.05)
            .is_err());
    }

    #[test]
    fn mirrored_quad_is_degenerate() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 100.0),
            Point2::new(100.0, 100.0),
            Point2::new(100.0, 0.0),
        ];
        assert!(CorrespondenceSet::new(src, 100)
            .check_geometry(2.0, 0.05)
            .is_err());
    }

    #[test]
    fn non_finite_points_are_degenerate() {
        let mut src = CorrespondenceSet::new([Point2::new(1.0, 1.0); 4], 10).dst;
        src[1].x = f32::NAN;
        assert!(CorrespondenceSet::new(src, 10)
            .check_geometry(2.0, 0.05)
            .is_err());
    }
}
