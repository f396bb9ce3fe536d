//! Store error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("run {0} not found")]
    RunNotFound(i64),

    #[error("duplicate golden record for run {run_id}: {product_name} / {region}")]
    Duplicate {
        run_id: i64,
        product_name: String,
        region: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;
