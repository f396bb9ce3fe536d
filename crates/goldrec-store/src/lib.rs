//! # Goldrec Store
//!
//! Persistence façade for the pipeline: extraction runs and versioned
//! golden records.
//!
//! Two implementations of the [`Store`] trait:
//!
//! - [`PgStore`] - Postgres via sqlx, with transactional version assignment
//!   per (product_name, region) and the unique/partial indexes the query
//!   layer depends on
//! - [`MemoryStore`] - in-process store with the same semantics, used by
//!   tests and dry runs
//!
//! Golden records are append-only: superseded rows get `is_latest = false`
//! but are never deleted.

pub mod error;
pub mod history;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use history::{compute_diff, FieldChange, FieldChangeKind};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{RecordFilter, RunRecord, RunStatus, Store, StoredGoldenRecord};
