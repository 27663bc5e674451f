//! Synthetic sheet scenes for tests and benchmarks.
//!
//! A [`SyntheticSheet`] is a white square sheet in its own plane coordinates
//! (`0..sheet_side` on both axes) carrying one marker near each corner. It is
//! rendered into a grey frame through a known sheet-to-image homography with
//! box-filter supersampling, so detected corners can be checked against the
//! exact projection of the printed ones.

use crate::builtins::SHEETCAM_6X6_50;
use crate::Dictionary;
use nalgebra::Point2;
use sheetcam_core::{Frame, GrayImage, Homography};

const INK: u8 = 20;
const PAPER: u8 = 250;

/// Sheet with four markers in the slots top-left, top-right, bottom-right,
/// bottom-left (in that order).
#[derive(Clone, Debug)]
pub struct SyntheticSheet {
    pub dictionary: Dictionary,
    /// Marker id per slot.
    pub ids: [u32; 4],
    /// Clockwise quarter turns applied to each printed marker.
    pub rotations: [u8; 4],
    pub sheet_side: f32,
    pub marker_side: f32,
    /// Gap between the sheet edge and the markers.
    pub margin: f32,
    /// Intensity outside the sheet.
    pub background: u8,
    /// Sub-samples per pixel side.
    pub supersample: usize,
}

impl Default for SyntheticSheet {
    fn default() -> Self {
        Self {
            dictionary: SHEETCAM_6X6_50,
            ids: [1, 2, 4, 3],
            rotations: [0; 4],
            sheet_side: 100.0,
            marker_side: 20.0,
            margin: 5.0,
            background: 60,
            supersample: 4,
        }
    }
}

impl SyntheticSheet {
    /// Top-left of the marker in `slot`, in sheet coordinates.
    fn marker_origin(&self, slot: usize) -> Point2<f32> {
        let near = self.margin;
        let far = self.sheet_side - self.margin - self.marker_side;
        match slot & 3 {
            0 => Point2::new(near, near),
            1 => Point2::new(far, near),
            2 => Point2::new(far, far),
            _ => Point2::new(near, far),
        }
    }

    /// Corners of the marker in `slot` in sheet coordinates, clockwise from
    /// the marker's own top-left corner.
    pub fn marker_corners(&self, slot: usize) -> [Point2<f32>; 4] {
        let o = self.marker_origin(slot);
        let s = self.marker_side;
        let shown = [
            o,
            Point2::new(o.x + s, o.y),
            Point2::new(o.x + s, o.y + s),
            Point2::new(o.x, o.y + s),
        ];
        let r = (self.rotations[slot & 3] & 3) as usize;
        [0, 1, 2, 3].map(|k| shown[(k + r) % 4])
    }

    /// The four sheet corners, clockwise from top-left.
    pub fn sheet_corners(&self) -> [Point2<f32>; 4] {
        let s = self.sheet_side;
        [
            Point2::new(0.0, 0.0),
            Point2::new(s, 0.0),
            Point2::new(s, s),
            Point2::new(0.0, s),
        ]
    }

    /// Intensity of the printed sheet at sheet coordinates `(u, v)`.
    pub fn intensity(&self, u: f32, v: f32) -> u8 {
        if !(0.0..self.sheet_side).contains(&u) || !(0.0..self.sheet_side).contains(&v) {
            return self.background;
        }

        let n = self.dictionary.marker_size;
        let cells = n + 2;
        for slot in 0..4 {
            let o = self.marker_origin(slot);
            let lx = (u - o.x) / self.marker_side * cells as f32;
            let ly = (v - o.y) / self.marker_side * cells as f32;
            if !(0.0..cells as f32).contains(&lx) || !(0.0..cells as f32).contains(&ly) {
                continue;
            }
            let (cx, cy) = (lx as usize, ly as usize);
            // Cell (cx, cy) as shown displays this cell of the marker's own grid.
            let (mx, my) = match self.rotations[slot] & 3 {
                0 => (cx, cy),
                1 => (cy, cells - 1 - cx),
                2 => (cells - 1 - cx, cells - 1 - cy),
                _ => (cells - 1 - cy, cx),
            };
            let border = mx == 0 || my == 0 || mx + 1 == cells || my + 1 == cells;
            let black = border
                || self
                    .dictionary
                    .bit(self.ids[slot], mx - 1, my - 1)
                    .unwrap_or(false);
            return if black { INK } else { PAPER };
        }
        PAPER
    }

    /// Render a `width × height` grey frame; `img_from_sheet` maps sheet
    /// coordinates to continuous image coordinates.
    pub fn render(&self, width: usize, height: usize, img_from_sheet: &Homography) -> Frame {
        let mut img = GrayImage::filled(width, height, self.background);
        let Some(sheet_from_img) = img_from_sheet.inverse() else {
            return img.into();
        };

        let ss = self.supersample.max(1);
        let inv = 1.0 / ss as f32;
        for y in 0..height {
            for x in 0..width {
                let mut sum = 0u32;
                for sy in 0..ss {
                    for sx in 0..ss {
                        let p = Point2::new(
                            x as f32 + (sx as f32 + 0.5) * inv,
                            y as f32 + (sy as f32 + 0.5) * inv,
                        );
                        let q = sheet_from_img.apply(p);
                        sum += self.intensity(q.x, q.y) as u32;
                    }
                }
                img.data[y * width + x] = ((sum + (ss * ss) as u32 / 2) / (ss * ss) as u32) as u8;
            }
        }
        img.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_cells_follow_dictionary_bits() {
        let sheet = SyntheticSheet::default();
        let cell = sheet.marker_side / 8.0;
        let o = sheet.marker_origin(0);
        // Border cell.
        assert_eq!(sheet.intensity(o.x + 0.5 * cell, o.y + 0.5 * cell), INK);
        // First inner bit of id 1.
        let want = if sheet.dictionary.bit(1, 0, 0).unwrap() {
            INK
        } else {
            PAPER
        };
        assert_eq!(sheet.intensity(o.x + 1.5 * cell, o.y + 1.5 * cell), want);
        // Outside the sheet.
        assert_eq!(sheet.intensity(-1.0, 50.0), sheet.background);
        // Sheet centre.
        assert_eq!(sheet.intensity(50.0, 50.0), PAPER);
    }

    #[test]
    fn rotated_corners_start_at_printed_top_left() {
        let mut sheet = SyntheticSheet::default();
        sheet.rotations[0] = 1;
        let c = sheet.marker_corners(0);
        let o = sheet.marker_origin(0);
        // A clockwise quarter turn moves the printed top-left to the shown top-right.
        assert_eq!(c[0], Point2::new(o.x + sheet.marker_side, o.y));
    }
}
