//! Built-in dictionaries compiled into the binary.

#![allow(clippy::unreadable_literal)]

use std::borrow::Cow;

use crate::Dictionary;

/// Name of the default sheet dictionary.
pub const DEFAULT_DICTIONARY: &str = "SHEETCAM_6X6_50";

/// 50 markers of 6×6 inner bits (1-cell black border).
///
/// Minimum Hamming distance between any two codes, over all four rotations,
/// is 13; no code is closer than 13 bits to its own rotations either.
pub const SHEETCAM_6X6_50: Dictionary = Dictionary {
    name: Cow::Borrowed("SHEETCAM_6X6_50"),
    marker_size: 6,
    max_correction_bits: 6,
    codes: Cow::Borrowed(&SHEETCAM_6X6_50_CODES),
};

const SHEETCAM_6X6_50_CODES: [u64; 50] = [
    0x6_d82c_07cd, 0x0_6baa_9455, 0xf_4248_5e3a, 0x7_82e2_e662,
    0xe_67a9_c378, 0xe_9558_867f, 0x2_8133_2876, 0x1_c17c_6279,
    0xc_9e4d_6e3c, 0x1_4f65_d4d9, 0x5_af19_922a, 0xa_9c63_16b9,
    0x7_7a1d_5006, 0x7_eece_328b, 0xd_307b_f326, 0x1_9cdf_5a86,
    0x4_bb42_e0b2, 0xf_f606_2541, 0xb_35e8_579a, 0xa_713b_7e05,
    0xd_a23d_4c9d, 0xd_5f58_d5b5, 0x9_fb5e_b866, 0x1_a38d_8afc,
    0x9_41c3_0359, 0x7_10cc_8711, 0x8_f1dd_50bf, 0x7_1cc5_a8a0,
    0xd_0bd7_696f, 0x4_42d0_1ba3, 0xc_0679_2b47, 0xc_e1bc_cfb2,
    0xd_211e_55c3, 0xb_3085_ee6d, 0x7_f002_2e2e, 0x7_e2fb_8f04,
    0xc_d8d0_2c0d, 0x1_a6db_74d1, 0x7_34ff_496a, 0xc_5f7e_3898,
    0x4_523f_ef19, 0xa_fb93_0021, 0xa_b51d_635c, 0x9_5f17_8ece,
    0xd_6eba_5950, 0xc_c157_8681, 0x3_dcd2_c4d2, 0xb_8132_d7a5,
    0x7_28b9_3cc2, 0xa_090d_a3e9,
];

/// All dictionaries known by name.
pub const BUILTIN_DICTIONARIES: &[Dictionary] = &[SHEETCAM_6X6_50];

/// Look a built-in dictionary up by name (case-sensitive).
pub fn builtin_dictionary(name: &str) -> Option<Dictionary> {
    BUILTIN_DICTIONARIES.iter().find(|d| d.name == name).cloned()
}
