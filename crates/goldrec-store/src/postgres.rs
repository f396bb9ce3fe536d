//! Postgres store backed by sqlx.
//!
//! Version assignment runs inside one transaction per record, serialised
//! per (product_name, region) with a transaction-scoped advisory lock so
//! two concurrent batches can never both mint version N. The unique index
//! on (run_id, product_name, region) additionally rejects duplicates
//! within a single run.

use crate::error::{StoreError, StoreResult};
use crate::store::{RecordFilter, RunRecord, RunStatus, Store, StoredGoldenRecord};
use async_trait::async_trait;
use goldrec_core::{GoldenRecordDraft, Region};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tracing::info;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and run migrations.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn run_from_row(row: &PgRow) -> StoreResult<RunRecord> {
    let status: String = row.try_get("status")?;
    Ok(RunRecord {
        id: row.try_get("id")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
        pdf_count: row.try_get("pdf_count")?,
        golden_records_count: row.try_get("golden_records_count")?,
        total_cost: row.try_get("total_cost")?,
        status: RunStatus::from_code(&status),
        error_message: row.try_get("error_message")?,
        metadata: row
            .try_get::<Option<serde_json::Value>, _>("metadata")?
            .unwrap_or_else(|| serde_json::json!({})),
    })
}

fn record_from_row(row: &PgRow) -> StoreResult<StoredGoldenRecord> {
    let region: String = row.try_get("region")?;
    Ok(StoredGoldenRecord {
        id: row.try_get("id")?,
        run_id: row.try_get("run_id")?,
        product_name: row.try_get("product_name")?,
        brand: row.try_get("brand")?,
        region: Region::from_code(&region).unwrap_or(Region::Global),
        doc_language: row.try_get("doc_language")?,
        revision_date: row.try_get("revision_date")?,
        document_type: row.try_get("document_type")?,
        version: row.try_get("version")?,
        is_latest: row.try_get("is_latest")?,
        golden_record: row.try_get("golden_record")?,
        source_files: row
            .try_get::<Option<Vec<String>>, _>("source_files")?
            .unwrap_or_default(),
        source_count: row.try_get::<Option<i32>, _>("source_count")?.unwrap_or(0),
        missing_count: row.try_get::<Option<i32>, _>("missing_count")?.unwrap_or(0),
        completeness: row.try_get::<Option<f64>, _>("completeness")?.unwrap_or(0.0),
        created_at: row.try_get("created_at")?,
    })
}

const RECORD_COLUMNS: &str = "id, run_id, product_name, brand, region, doc_language, \
     revision_date, document_type, version, is_latest, golden_record, source_files, \
     source_count, missing_count, completeness, created_at";

#[async_trait]
impl Store for PgStore {
    async fn create_run(&self, pdf_count: usize) -> StoreResult<i64> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO extraction_runs (pdf_count, status) VALUES ($1, 'running') RETURNING id",
        )
        .bind(pdf_count as i32)
        .fetch_one(&self.pool)
        .await?;

        info!(run_id = id, pdf_count, "extraction run started");
        Ok(id)
    }

    async fn complete_run(
        &self,
        run_id: i64,
        golden_records_count: usize,
        total_cost: f64,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE extraction_runs \
             SET finished_at = now(), golden_records_count = $2, total_cost = $3, status = 'completed' \
             WHERE id = $1",
        )
        .bind(run_id)
        .bind(golden_records_count as i32)
        .bind(total_cost)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        info!(run_id, golden_records_count, "extraction run completed");
        Ok(())
    }

    async fn fail_run(&self, run_id: i64, error_message: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE extraction_runs \
             SET finished_at = now(), status = 'failed', error_message = $2 \
             WHERE id = $1",
        )
        .bind(run_id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RunNotFound(run_id));
        }
        Ok(())
    }

    async fn persist_golden_record(
        &self,
        run_id: i64,
        draft: &GoldenRecordDraft,
    ) -> StoreResult<StoredGoldenRecord> {
        let record_json = serde_json::to_value(&draft.record)?;
        let region = draft.region.as_str();

        let mut tx = self.pool.begin().await?;

        // Serialise version assignment per (product, region).
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{}:{}", draft.product_name, region))
            .execute(&mut *tx)
            .await?;

        let max_version: Option<i32> = sqlx::query_scalar(
            "SELECT max(version) FROM golden_records WHERE product_name = $1 AND region = $2",
        )
        .bind(&draft.product_name)
        .bind(region)
        .fetch_one(&mut *tx)
        .await?;
        let version = max_version.unwrap_or(0) + 1;

        let obsoleted = sqlx::query(
            "UPDATE golden_records SET is_latest = false, updated_at = now() \
             WHERE product_name = $1 AND region = $2 AND is_latest = true",
        )
        .bind(&draft.product_name)
        .bind(region)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let row = sqlx::query(&format!(
            "INSERT INTO golden_records \
             (run_id, product_name, brand, region, doc_language, revision_date, document_type, \
              version, is_latest, golden_record, source_files, source_count, missing_count, completeness) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true, $9, $10, $11, $12, $13) \
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(run_id)
        .bind(&draft.product_name)
        .bind(&draft.brand)
        .bind(region)
        .bind(&draft.doc_language)
        .bind(&draft.revision_date)
        .bind(draft.document_type.as_str())
        .bind(version)
        .bind(&record_json)
        .bind(&draft.source_files)
        .bind(draft.source_count as i32)
        .bind(draft.missing_count as i32)
        .bind(draft.completeness)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| duplicate_or_sqlx(e, run_id, draft))?;

        tx.commit().await?;

        info!(
            product = %draft.product_name,
            region = %draft.region,
            version,
            obsoleted,
            "golden record persisted"
        );
        record_from_row(&row)
    }

    async fn list_runs(
        &self,
        page: usize,
        page_size: usize,
    ) -> StoreResult<(Vec<RunRecord>, usize)> {
        let page = page.max(1);
        let page_size = if page_size == 0 { 20 } else { page_size };

        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM extraction_runs")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query(
            "SELECT id, started_at, finished_at, pdf_count, golden_records_count, total_cost, \
             status, error_message, metadata \
             FROM extraction_runs ORDER BY started_at DESC OFFSET $1 LIMIT $2",
        )
        .bind(((page - 1) * page_size) as i64)
        .bind(page_size as i64)
        .fetch_all(&self.pool)
        .await?;

        let runs = rows.iter().map(run_from_row).collect::<StoreResult<_>>()?;
        Ok((runs, total as usize))
    }

    async fn list_golden_records(
        &self,
        filter: RecordFilter,
    ) -> StoreResult<(Vec<StoredGoldenRecord>, usize)> {
        let (offset, limit) = filter.page_bounds();

        let total: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM golden_records \
             WHERE ($1::bigint IS NULL OR run_id = $1) AND (NOT $2 OR is_latest = true)",
        )
        .bind(filter.run_id)
        .bind(filter.latest_only)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM golden_records \
             WHERE ($1::bigint IS NULL OR run_id = $1) AND (NOT $2 OR is_latest = true) \
             ORDER BY product_name ASC OFFSET $3 LIMIT $4"
        ))
        .bind(filter.run_id)
        .bind(filter.latest_only)
        .bind(offset as i64)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .map(record_from_row)
            .collect::<StoreResult<_>>()?;
        Ok((records, total as usize))
    }

    async fn list_product_versions(
        &self,
        product_name: &str,
        region: Option<Region>,
    ) -> StoreResult<Vec<StoredGoldenRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM golden_records \
             WHERE product_name = $1 AND ($2::text IS NULL OR region = $2) \
             ORDER BY version DESC"
        ))
        .bind(product_name)
        .bind(region.map(|r| r.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }
}

fn duplicate_or_sqlx(error: sqlx::Error, run_id: i64, draft: &GoldenRecordDraft) -> StoreError {
    if let Some(db_error) = error.as_database_error() {
        if db_error.constraint() == Some("uq_golden_records_run_product_region") {
            return StoreError::Duplicate {
                run_id,
                product_name: draft.product_name.clone(),
                region: draft.region.as_str().to_string(),
            };
        }
    }
    StoreError::Sqlx(error)
}
