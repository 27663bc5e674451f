//! Dictionary metadata and packed marker codes.

use std::borrow::Cow;
use std::path::Path;

use crate::DetectError;
use serde::Deserialize;

/// An ArUco-style dictionary, either built in or loaded from a codes file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dictionary {
    /// Human-readable name (for config files and logging).
    pub name: Cow<'static, str>,
    /// Marker side length (number of inner bits per side).
    pub marker_size: usize,
    /// Maximum error-correcting Hamming distance supported by the dictionary.
    pub max_correction_bits: u8,
    /// One `u64` per marker id, encoding the inner `marker_size × marker_size` bits.
    ///
    /// Bits are stored in row-major order with **black = 1**: cell `(x, y)` is
    /// bit `y * marker_size + x`.
    pub codes: Cow<'static, [u64]>,
}

/// On-disk form of a dictionary (`*_CODES.json`).
///
/// Each code is either the packed integer or a string of `marker_size²`
/// `0`/`1` characters in row-major order, `1` = black.
#[derive(Deserialize)]
struct CodesFile {
    name: String,
    marker_size: usize,
    #[serde(default)]
    max_correction_bits: u8,
    codes: Vec<CodeEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CodeEntry {
    Packed(u64),
    Bits(String),
}

impl Dictionary {
    /// Total number of inner bits per marker.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.marker_size * self.marker_size
    }

    /// Number of marker ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Code of marker `id`, if the dictionary has one.
    #[inline]
    pub fn code(&self, id: u32) -> Option<u64> {
        self.codes.get(id as usize).copied()
    }

    /// Bit `(x, y)` of marker `id` (`true` = black), in the marker's own frame.
    pub fn bit(&self, id: u32, x: usize, y: usize) -> Option<bool> {
        if x >= self.marker_size || y >= self.marker_size {
            return None;
        }
        let code = self.code(id)?;
        Some((code >> (y * self.marker_size + x)) & 1 == 1)
    }

    /// Parse a codes file from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, DetectError> {
        let file: CodesFile =
            serde_json::from_str(json).map_err(|e| DetectError::InvalidDictionary(e.to_string()))?;

        let bits = file.marker_size * file.marker_size;
        if file.marker_size == 0 || bits > 64 {
            return Err(DetectError::UnsupportedDictionary {
                name: file.name,
                bits,
            });
        }
        if file.codes.is_empty() {
            return Err(DetectError::InvalidDictionary(format!(
                "dictionary {} has no codes",
                file.name
            )));
        }

        let codes = file
            .codes
            .iter()
            .enumerate()
            .map(|(id, entry)| pack_code(entry, bits).ok_or(id))
            .collect::<Result<Vec<u64>, usize>>()
            .map_err(|id| {
                DetectError::InvalidDictionary(format!(
                    "code {id} of {} does not fit {bits} bits",
                    file.name
                ))
            })?;

        Ok(Self {
            name: Cow::Owned(file.name),
            marker_size: file.marker_size,
            max_correction_bits: file.max_correction_bits,
            codes: Cow::Owned(codes),
        })
    }

    /// Load a codes file from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DetectError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| DetectError::DictionaryFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let dict = Self::from_json_str(&json)?;
        log::info!(
            "loaded dictionary {} ({} markers, {}x{} bits) from {}",
            dict.name,
            dict.len(),
            dict.marker_size,
            dict.marker_size,
            path.display()
        );
        Ok(dict)
    }
}

fn pack_code(entry: &CodeEntry, bits: usize) -> Option<u64> {
    match entry {
        CodeEntry::Packed(code) => (bits == 64 || code >> bits == 0).then_some(*code),
        CodeEntry::Bits(s) => {
            if s.len() != bits {
                return None;
            }
            s.bytes().enumerate().try_fold(0u64, |acc, (i, b)| match b {
                b'0' => Some(acc),
                b'1' => Some(acc | 1 << i),
                _ => None,
            })
        }
    }
}
