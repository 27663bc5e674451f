//! Marker decoding from image quads.

use crate::Matcher;
use nalgebra::Point2;
use sheetcam_core::{homography_from_4pt, otsu_threshold_from_samples, sample_bilinear};
use sheetcam_core::{GrayImageView, Homography};

/// Sub-samples per cell side; each cell value is the mean of `SUB × SUB` reads.
const SUB: usize = 3;
/// Spacing of the sub-samples in cell units.
const SUB_STEP: f32 = 0.25;
/// Threshold grid density relative to the cell grid.
const THRESH_SUBDIV: usize = 3;

#[derive(Clone, Copy, Debug)]
pub(crate) struct MarkerObservation {
    /// Observed inner bits (row-major, black=1).
    pub code: u64,
    pub border_score: f32,
}

/// A decoded quad, corners still in observed order.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Decoded {
    pub id: u32,
    pub rotation: u8,
    pub hamming: u8,
    pub score: f32,
}

/// Sample positions in marker cell units, shared by every quad of a frame.
struct SampleGrid {
    cells: usize,
    points: Vec<Point2<f32>>, // row-major: (cy * cells + cx) * SUB² + k
    threshold_points: Vec<Point2<f32>>,
}

impl SampleGrid {
    fn new(cells: usize) -> Self {
        let mut points = Vec::with_capacity(cells * cells * SUB * SUB);
        let half = (SUB as f32 - 1.0) * 0.5;
        for cy in 0..cells {
            for cx in 0..cells {
                for sy in 0..SUB {
                    for sx in 0..SUB {
                        points.push(Point2::new(
                            cx as f32 + 0.5 + (sx as f32 - half) * SUB_STEP,
                            cy as f32 + 0.5 + (sy as f32 - half) * SUB_STEP,
                        ));
                    }
                }
            }
        }

        let grid = cells * THRESH_SUBDIV;
        let step = cells as f32 / grid as f32;
        let mut threshold_points = Vec::with_capacity(grid * grid);
        for ty in 0..grid {
            for tx in 0..grid {
                threshold_points.push(Point2::new(
                    (tx as f32 + 0.5) * step,
                    (ty as f32 + 0.5) * step,
                ));
            }
        }

        Self {
            cells,
            points,
            threshold_points,
        }
    }
}

/// Reads marker bits out of arbitrary image quads.
///
/// Holds scratch buffers, so one decoder is created per detection call and
/// reused for every candidate.
pub(crate) struct QuadDecoder<'a> {
    matcher: &'a Matcher,
    bits: usize,
    border: usize,
    min_border_score: f32,
    grid: SampleGrid,
    square: [Point2<f32>; 4],
    scratch_cells: Vec<u8>,
    scratch_thr: Vec<u8>,
}

impl<'a> QuadDecoder<'a> {
    pub fn new(matcher: &'a Matcher, border_bits: usize, min_border_score: f32) -> Self {
        let bits = matcher.dictionary().marker_size;
        let cells = bits + 2 * border_bits;
        let s = cells as f32;
        let grid = SampleGrid::new(cells);
        Self {
            matcher,
            bits,
            border: border_bits,
            min_border_score,
            scratch_cells: Vec::with_capacity(cells * cells),
            scratch_thr: Vec::with_capacity(grid.threshold_points.len()),
            grid,
            square: [
                Point2::new(0.0, 0.0),
                Point2::new(s, 0.0),
                Point2::new(s, s),
                Point2::new(0.0, s),
            ],
        }
    }

    /// Decode the quad `corners` (clockwise in the image). The first corner is
    /// read as the top-left of the bit grid.
    pub fn decode(&mut self, img: &GrayImageView<'_>, corners: &[Point2<f32>; 4]) -> Option<Decoded> {
        let h = homography_from_4pt(&self.square, corners)?;
        let obs = self.observe(img, &h)?;
        let m = self.matcher.match_code(obs.code)?;
        let bits = (self.bits * self.bits).max(1) as f32;
        let ham_pen = 1.0 - (m.hamming as f32 / bits);
        Some(Decoded {
            id: m.id,
            rotation: m.rotation,
            hamming: m.hamming,
            score: (obs.border_score * ham_pen).clamp(0.0, 1.0),
        })
    }

    fn observe(&mut self, img: &GrayImageView<'_>, h: &Homography) -> Option<MarkerObservation> {
        self.scratch_cells.clear();
        for cell in self.grid.points.chunks_exact(SUB * SUB) {
            let mut sum = 0.0f32;
            for p in cell {
                let q = h.apply(*p);
                if !q.x.is_finite() || !q.y.is_finite() {
                    return None;
                }
                sum += sample_bilinear(img, q.x - 0.5, q.y - 0.5);
            }
            self.scratch_cells
                .push((sum / (SUB * SUB) as f32).round().clamp(0.0, 255.0) as u8);
        }

        self.scratch_thr.clear();
        for p in &self.grid.threshold_points {
            let q = h.apply(*p);
            if q.x.is_finite() && q.y.is_finite() {
                let v = sample_bilinear(img, q.x - 0.5, q.y - 0.5);
                self.scratch_thr.push(v.round().clamp(0.0, 255.0) as u8);
            }
        }

        decode_samples(
            &self.scratch_cells,
            &self.scratch_thr,
            self.grid.cells,
            self.bits,
            self.border,
            self.min_border_score,
        )
    }
}

fn decode_samples(
    samples: &[u8],
    thr_samples: &[u8],
    cells: usize,
    bits: usize,
    border: usize,
    min_border_score: f32,
) -> Option<MarkerObservation> {
    if samples.len() != cells * cells || bits * bits > 64 {
        return None;
    }

    let thr = if thr_samples.is_empty() {
        otsu_threshold_from_samples(samples)
    } else {
        otsu_threshold_from_samples(thr_samples)
    };

    let mut border_ok = 0u32;
    let mut border_total = 0u32;
    let mut code: u64 = 0;

    for cy in 0..cells {
        for cx in 0..cells {
            let is_black = samples[cy * cells + cx] < thr;
            let is_border =
                cx < border || cy < border || cx + border >= cells || cy + border >= cells;
            if is_border {
                border_total += 1;
                if is_black {
                    border_ok += 1;
                }
            } else if is_black {
                let bx = cx - border;
                let by = cy - border;
                code |= 1u64 << (by * bits + bx); // row-major
            }
        }
    }

    let border_score = if border_total > 0 {
        border_ok as f32 / border_total as f32
    } else {
        1.0
    };
    if border_score < min_border_score {
        return None;
    }

    Some(MarkerObservation { code, border_score })
}
