//! Dictionary matching and rotation helpers.

use crate::Dictionary;
use nalgebra::Point2;

/// A dictionary match for an observed marker code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    /// Marker id in the dictionary.
    pub id: u32,
    /// Rotation `0..=3` such that: `observed_code == rotate(dict_code, rotation)`.
    ///
    /// One step is a quarter turn clockwise as seen in the image.
    pub rotation: u8,
    /// Hamming distance between observed and dictionary code (after rotation).
    pub hamming: u8,
}

/// Matcher for a fixed dictionary.
///
/// Brute-force search over all ids and rotations. Sheet dictionaries are
/// small, so a lookup table would buy nothing.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    rotated: Vec<[u64; 4]>,
}

impl Matcher {
    /// Build a matcher for the given dictionary.
    ///
    /// `max_hamming` is clamped to the dictionary's correction capability.
    /// Dictionaries with more than 64 bits per marker match nothing.
    pub fn new(dict: Dictionary, max_hamming: u8) -> Self {
        let rotated = if dict.bit_count() <= 64 {
            dict.codes
                .iter()
                .map(|&base| [0, 1, 2, 3].map(|rot| rotate_code_u64(base, dict.marker_size, rot)))
                .collect()
        } else {
            log::warn!(
                "dictionary {} has {} bits per marker (> 64); matcher disabled",
                dict.name,
                dict.bit_count()
            );
            Vec::new()
        };

        Self {
            max_hamming: max_hamming.min(dict.max_correction_bits),
            dict,
            rotated,
        }
    }

    /// Dictionary used by this matcher.
    #[inline]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dict
    }

    /// Maximum Hamming distance allowed for matches.
    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Find the best match within `max_hamming`.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;

        for (id, rots) in self.rotated.iter().enumerate() {
            for (rot, &cand) in rots.iter().enumerate() {
                let h = (observed ^ cand).count_ones() as u8;
                if h > self.max_hamming {
                    continue;
                }
                if best.is_none_or(|prev| h < prev.hamming) {
                    best = Some(Match {
                        id: id as u32,
                        rotation: rot as u8,
                        hamming: h,
                    });
                    if h == 0 {
                        return best;
                    }
                }
            }
        }

        best
    }
}

/// Rotate a code stored in row-major bits: `idx = y * N + x`.
///
/// `rot` counts clockwise quarter turns.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }

    #[inline]
    fn get(code: u64, idx: usize) -> u64 {
        (code >> idx) & 1
    }

    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            out |= get(code, sy * n + sx) << (y * n + x);
        }
    }
    out
}

/// Re-order observed quad corners into the marker's own frame.
///
/// `observed` lists the quad clockwise starting at the corner that was
/// sampled as the top-left of the bit grid. The result starts at the
/// marker's printed top-left corner and stays clockwise.
pub fn canonical_corners(observed: [Point2<f32>; 4], rotation: u8) -> [Point2<f32>; 4] {
    let r = (rotation & 3) as usize;
    [0, 1, 2, 3].map(|k| observed[(k + r) % 4])
}
