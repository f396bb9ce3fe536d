//! Parser error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unrecoverable PDF container corruption. Per-page extraction failures
    /// never surface here; they are logged and skipped.
    #[error("PDF container error: {0}")]
    Corrupt(String),
}

pub type ParseResult<T> = Result<T, ParseError>;
