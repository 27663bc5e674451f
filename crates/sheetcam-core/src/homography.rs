use crate::image::sample_bilinear_frame;
use crate::Frame;
use nalgebra::{Matrix3, Point2, SMatrix, SVector, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Projective 3×3 transform, normalised so that `h[(2, 2)] == 1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ]))
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        let inv = self.h.try_inverse()?;
        unit_scale(inv).map(Self::new)
    }

    /// All nine entries are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.h.iter().all(|v| v.is_finite())
    }

    /// Ratio of the smallest to the largest singular value.
    ///
    /// Values close to zero mean the transform collapses the plane onto a
    /// line or point and cannot be inverted reliably.
    pub fn conditioning(&self) -> f64 {
        let sv = self.h.singular_values();
        let max = sv.max();
        if max.is_nan() || max <= 0.0 {
            return 0.0;
        }
        sv.min() / max
    }
}

/// Similarity that moves four points to their centroid and scales them to a
/// mean distance of `sqrt(2)`.
fn conditioner(pts: &[Point2<f32>; 4]) -> Matrix3<f64> {
    let centroid = pts
        .iter()
        .fold(Vector2::zeros(), |acc: Vector2<f64>, p| acc + p.coords.cast::<f64>())
        / 4.0;
    let spread = pts
        .iter()
        .map(|p| (p.coords.cast::<f64>() - centroid).norm())
        .sum::<f64>()
        / 4.0;
    let s = if spread > 1e-12 {
        std::f64::consts::SQRT_2 / spread
    } else {
        1.0
    };
    Matrix3::new(
        s, 0.0, -s * centroid.x, //
        0.0, s, -s * centroid.y, //
        0.0, 0.0, 1.0,
    )
}

fn project(t: &Matrix3<f64>, p: &Point2<f32>) -> (f64, f64) {
    let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
    (v.x / v.z, v.y / v.z)
}

fn unit_scale(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let s = h[(2, 2)];
    (s.is_finite() && s.abs() >= 1e-12).then(|| h / s)
}

/// Exact homography mapping each `src[k]` onto `dst[k]`.
///
/// Solves the 8×8 linear system with `h33 = 1` on conditioned coordinates.
/// Returns `None` when the system is singular.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    let t_src = conditioner(src);
    let t_dst = conditioner(dst);

    // Rows 2k and 2k+1 hold the u and v equations of correspondence k.
    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for (k, (s, d)) in src.iter().zip(dst).enumerate() {
        let (x, y) = project(&t_src, s);
        let (u, v) = project(&t_dst, d);
        a.row_mut(2 * k)
            .copy_from_slice(&[x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y]);
        a.row_mut(2 * k + 1)
            .copy_from_slice(&[0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y]);
        b[2 * k] = u;
        b[2 * k + 1] = v;
    }

    let sol = a.lu().solve(&b)?;
    if sol.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let conditioned = Matrix3::new(
        sol[0], sol[1], sol[2], //
        sol[3], sol[4], sol[5], //
        sol[6], sol[7], 1.0,
    );

    let h = t_dst.try_inverse()? * conditioned * t_src;
    unit_scale(h).map(Homography::new)
}

/// Perspective warp of a whole frame.
///
/// For each output pixel centre `(x + 0.5, y + 0.5)` the source position is
/// `h_src_from_dst` applied to it, sampled bilinearly per channel. Output
/// pixels that map outside the source frame are black.
pub fn warp_perspective(
    src: &Frame,
    h_src_from_dst: &Homography,
    out_w: usize,
    out_h: usize,
) -> Frame {
    let c = src.channels();
    let mut out = Frame::filled(out_w, out_h, src.format(), 0);
    let data = out.data_mut();
    let mut px = [0u8; 4];

    for y in 0..out_h {
        for x in 0..out_w {
            let q = h_src_from_dst.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            let offset = (y * out_w + x) * c;
            if !q.x.is_finite() || !q.y.is_finite() {
                continue;
            }
            sample_bilinear_frame(src, q.x - 0.5, q.y - 0.5, &mut px[..c]);
            data[offset..offset + c].copy_from_slice(&px[..c]);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PixelFormat;
    use approx::assert_abs_diff_eq;

    fn sample_points() -> [Point2<f32>; 3] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(75.0, -12.5),
            Point2::new(310.0, 190.0),
        ]
    }

    #[test]
    fn inverse_undoes_mapping() {
        let h = Homography::from_array([
            [1.15, 0.08, 6.0],
            [-0.04, 0.95, 2.5],
            [0.0008, 0.0004, 1.0],
        ]);
        let inv = h.inverse().unwrap();
        for p in sample_points() {
            let back = inv.apply(h.apply(p));
            assert_abs_diff_eq!(back.x, p.x, epsilon = 1e-3);
            assert_abs_diff_eq!(back.y, p.y, epsilon = 1e-3);
        }
        assert_abs_diff_eq!(inv.h[(2, 2)], 1.0);
    }

    #[test]
    fn square_to_quad_matches_known_transform() {
        let truth = Homography::from_array([
            [0.85, 0.04, 110.0],
            [-0.03, 1.05, 75.0],
            [0.0007, -0.0003, 1.0],
        ]);
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(200.0, 0.0),
            Point2::new(200.0, 200.0),
            Point2::new(0.0, 200.0),
        ];
        let quad = square.map(|p| truth.apply(p));

        let h = homography_from_4pt(&square, &quad).unwrap();
        for p in sample_points() {
            let (got, want) = (h.apply(p), truth.apply(p));
            assert_abs_diff_eq!(got.x, want.x, epsilon = 1e-2);
            assert_abs_diff_eq!(got.y, want.y, epsilon = 1e-2);
        }
        assert!(h.conditioning() > 1e-6);
    }

    #[test]
    fn identity_warp_copies_frame() {
        let data: Vec<u8> = (0..48).map(|v| (v * 5) as u8).collect();
        let src = Frame::new(4, 4, PixelFormat::Rgb8, data).unwrap();
        let out = warp_perspective(&src, &Homography::identity(), 4, 4);
        assert_eq!(out, src);
    }
}
