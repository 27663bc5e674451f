//! Perspective rectification of a sheet framed by four fiducial markers.
//!
//! A [`CornerTable`] says which corner of which marker lands on each corner
//! of the output square. [`build_correspondence`] turns a
//! [`sheetcam_aruco::MarkerDetection`] into a [`CorrespondenceSet`] (or names
//! the missing markers), and [`Rectifier`] warps the frame.

mod correspondence;
mod corner_table;
mod error;
mod rectifier;

pub use corner_table::{CornerRef, CornerTable, DEFAULT_CORNER_TABLE};
pub use correspondence::{build_correspondence, CorrespondenceSet};
pub use error::RectifyError;
pub use rectifier::{RectifiedImage, Rectifier, RectifierParams};
