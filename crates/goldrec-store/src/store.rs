//! The store interface and its row types.

use crate::error::StoreResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use goldrec_core::{GoldenRecordDraft, Region};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle state of one batch invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn from_code(code: &str) -> RunStatus {
        match code {
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            _ => RunStatus::Running,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution of the batch pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub pdf_count: Option<i32>,
    pub golden_records_count: Option<i32>,
    pub total_cost: Option<f64>,
    pub status: RunStatus,
    pub error_message: Option<String>,
    pub metadata: Value,
}

/// A persisted golden record row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredGoldenRecord {
    pub id: i64,
    pub run_id: i64,
    pub product_name: String,
    pub brand: Option<String>,
    pub region: Region,
    pub doc_language: Option<String>,
    pub revision_date: Option<String>,
    pub document_type: Option<String>,
    pub version: i32,
    pub is_latest: bool,
    /// The full 33-attribute record as JSON.
    pub golden_record: Value,
    pub source_files: Vec<String>,
    pub source_count: i32,
    pub missing_count: i32,
    pub completeness: f64,
    pub created_at: DateTime<Utc>,
}

/// Filters for golden-record listings.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub run_id: Option<i64>,
    /// Only the latest version per (product, region).
    pub latest_only: bool,
    /// 1-based page number; 0 is treated as 1.
    pub page: usize,
    pub page_size: usize,
}

impl RecordFilter {
    pub fn latest() -> Self {
        Self {
            latest_only: true,
            ..Self::default()
        }
    }

    pub fn for_run(run_id: i64) -> Self {
        Self {
            run_id: Some(run_id),
            ..Self::default()
        }
    }

    pub(crate) fn page_bounds(&self) -> (usize, usize) {
        let page = self.page.max(1);
        let page_size = if self.page_size == 0 { 50 } else { self.page_size };
        ((page - 1) * page_size, page_size)
    }
}

/// Persistence interface consumed by the pipeline.
///
/// Version assignment happens inside [`persist_golden_record`]: per
/// (product_name, region) the next version is max + 1, previous rows lose
/// their `is_latest` flag, and the new row is inserted, all atomically.
///
/// [`persist_golden_record`]: Store::persist_golden_record
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_run(&self, pdf_count: usize) -> StoreResult<i64>;

    async fn complete_run(
        &self,
        run_id: i64,
        golden_records_count: usize,
        total_cost: f64,
    ) -> StoreResult<()>;

    async fn fail_run(&self, run_id: i64, error_message: &str) -> StoreResult<()>;

    async fn persist_golden_record(
        &self,
        run_id: i64,
        draft: &GoldenRecordDraft,
    ) -> StoreResult<StoredGoldenRecord>;

    /// Runs, newest first, with the total count.
    async fn list_runs(&self, page: usize, page_size: usize)
        -> StoreResult<(Vec<RunRecord>, usize)>;

    /// Golden records ordered by product name, with the total count.
    async fn list_golden_records(
        &self,
        filter: RecordFilter,
    ) -> StoreResult<(Vec<StoredGoldenRecord>, usize)>;

    /// All versions of one product, newest first, optionally region-scoped.
    async fn list_product_versions(
        &self,
        product_name: &str,
        region: Option<Region>,
    ) -> StoreResult<Vec<StoredGoldenRecord>>;
}
