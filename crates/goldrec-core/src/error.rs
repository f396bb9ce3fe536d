//! Core error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("schema validation failed: {0}")]
    Validation(#[from] serde_json::Error),

    #[error("no partial extractions for {0}")]
    EmptyGroup(String),

    #[error("merge produced an invalid record for {product}: {message}")]
    InvalidMerge { product: String, message: String },
}

pub type CoreResult<T> = Result<T, CoreError>;
