/// Errors returned by correspondence building and rectification.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RectifyError {
    #[error("required markers not detected: {missing:?}")]
    InsufficientMarkers { missing: Vec<u32> },
    #[error("degenerate marker geometry: {reason}")]
    DegenerateGeometry { reason: String },
    #[error("invalid corner table: {0}")]
    InvalidCornerTable(String),
    #[error("output size must be positive")]
    InvalidOutputSize,
    #[error("source frame is empty")]
    EmptyImage,
}

impl RectifyError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            reason: reason.into(),
        }
    }
}
