//! Error types for the upload protocol.

/// A filename that does not follow the upload naming rule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name must be {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("stem must be {digits} ASCII digits: {name}")]
    Stem { digits: usize, name: String },

    #[error("missing '.' separator: {0}")]
    Separator(String),

    #[error("extension must be {expected}: {name}")]
    Extension { expected: String, name: String },

    #[error("invalid naming rule: {0}")]
    Rule(String),
}

/// Errors produced while reading or writing the upload header.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("header is not ASCII")]
    NotAscii,

    #[error("header is not NUL-terminated")]
    Unterminated,

    #[error(transparent)]
    Name(#[from] NameError),
}
