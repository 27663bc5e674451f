/// Errors returned when configuring a [`crate::MarkerDetector`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    #[error("unknown marker dictionary {0:?}")]
    UnknownDictionary(String),
    #[error("dictionary {name} has {bits} bits per marker; at most 64 are supported")]
    UnsupportedDictionary { name: String, bits: usize },
    #[error("failed to read dictionary file {path}: {reason}")]
    DictionaryFile { path: String, reason: String },
    #[error("invalid dictionary: {0}")]
    InvalidDictionary(String),
    #[error("invalid detector parameter: {0}")]
    InvalidParams(&'static str),
}
