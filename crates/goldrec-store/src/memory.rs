//! In-memory store with the same versioning semantics as Postgres.
//!
//! Used by tests and dry runs. One mutex around the whole state gives the
//! same atomicity the database transaction provides.

use crate::error::{StoreError, StoreResult};
use crate::store::{RecordFilter, RunRecord, RunStatus, Store, StoredGoldenRecord};
use async_trait::async_trait;
use chrono::Utc;
use goldrec_core::{GoldenRecordDraft, Region};
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    runs: Vec<RunRecord>,
    records: Vec<StoredGoldenRecord>,
    next_run_id: i64,
    next_record_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_run(&self, pdf_count: usize) -> StoreResult<i64> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner.next_run_id += 1;
        let id = inner.next_run_id;
        inner.runs.push(RunRecord {
            id,
            started_at: Utc::now(),
            finished_at: None,
            pdf_count: Some(pdf_count as i32),
            golden_records_count: None,
            total_cost: None,
            status: RunStatus::Running,
            error_message: None,
            metadata: serde_json::json!({}),
        });
        Ok(id)
    }

    async fn complete_run(
        &self,
        run_id: i64,
        golden_records_count: usize,
        total_cost: f64,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let run = inner
            .runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or(StoreError::RunNotFound(run_id))?;
        run.finished_at = Some(Utc::now());
        run.golden_records_count = Some(golden_records_count as i32);
        run.total_cost = Some(total_cost);
        run.status = RunStatus::Completed;
        Ok(())
    }

    async fn fail_run(&self, run_id: i64, error_message: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        let run = inner
            .runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or(StoreError::RunNotFound(run_id))?;
        run.finished_at = Some(Utc::now());
        run.status = RunStatus::Failed;
        run.error_message = Some(error_message.to_string());
        Ok(())
    }

    async fn persist_golden_record(
        &self,
        run_id: i64,
        draft: &GoldenRecordDraft,
    ) -> StoreResult<StoredGoldenRecord> {
        let record_json = serde_json::to_value(&draft.record)?;
        let mut inner = self.inner.lock().expect("memory store poisoned");

        let duplicate = inner.records.iter().any(|r| {
            r.run_id == run_id && r.product_name == draft.product_name && r.region == draft.region
        });
        if duplicate {
            return Err(StoreError::Duplicate {
                run_id,
                product_name: draft.product_name.clone(),
                region: draft.region.as_str().to_string(),
            });
        }

        let version = inner
            .records
            .iter()
            .filter(|r| r.product_name == draft.product_name && r.region == draft.region)
            .map(|r| r.version)
            .max()
            .unwrap_or(0)
            + 1;

        for record in inner
            .records
            .iter_mut()
            .filter(|r| r.product_name == draft.product_name && r.region == draft.region)
        {
            record.is_latest = false;
        }

        inner.next_record_id += 1;
        let stored = StoredGoldenRecord {
            id: inner.next_record_id,
            run_id,
            product_name: draft.product_name.clone(),
            brand: draft.brand.clone(),
            region: draft.region,
            doc_language: draft.doc_language.clone(),
            revision_date: draft.revision_date.clone(),
            document_type: Some(draft.document_type.as_str().to_string()),
            version,
            is_latest: true,
            golden_record: record_json,
            source_files: draft.source_files.clone(),
            source_count: draft.source_count as i32,
            missing_count: draft.missing_count as i32,
            completeness: draft.completeness,
            created_at: Utc::now(),
        };
        inner.records.push(stored.clone());
        Ok(stored)
    }

    async fn list_runs(
        &self,
        page: usize,
        page_size: usize,
    ) -> StoreResult<(Vec<RunRecord>, usize)> {
        let inner = self.inner.lock().expect("memory store poisoned");
        let page = page.max(1);
        let page_size = if page_size == 0 { 20 } else { page_size };

        let mut runs = inner.runs.clone();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        let total = runs.len();
        let paged = runs
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();
        Ok((paged, total))
    }

    async fn list_golden_records(
        &self,
        filter: RecordFilter,
    ) -> StoreResult<(Vec<StoredGoldenRecord>, usize)> {
        let inner = self.inner.lock().expect("memory store poisoned");
        let (offset, limit) = filter.page_bounds();

        let mut records: Vec<StoredGoldenRecord> = inner
            .records
            .iter()
            .filter(|r| filter.run_id.map_or(true, |id| r.run_id == id))
            .filter(|r| !filter.latest_only || r.is_latest)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.product_name.cmp(&b.product_name));
        let total = records.len();
        let paged = records.into_iter().skip(offset).take(limit).collect();
        Ok((paged, total))
    }

    async fn list_product_versions(
        &self,
        product_name: &str,
        region: Option<Region>,
    ) -> StoreResult<Vec<StoredGoldenRecord>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        let mut versions: Vec<StoredGoldenRecord> = inner
            .records
            .iter()
            .filter(|r| r.product_name == product_name)
            .filter(|r| region.map_or(true, |reg| r.region == reg))
            .cloned()
            .collect();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goldrec_core::ExtractionResult;
    use serde_json::json;

    fn extraction(doc_type: &str, language: &str, inventories: Vec<&str>) -> ExtractionResult {
        ExtractionResult::from_json(json!({
            "document_info": {"document_type": doc_type, "language": language, "manufacturer": null, "brand": "ELASTOSIL", "revision_date": "2024-01-05", "page_count": 2},
            "identity": {"product_name": "RT-601", "product_line": null, "wacker_sku": null, "material_numbers": [], "product_url": null, "grade": null},
            "chemical": {"cas_numbers": {"value": "68083-19-2", "unit": null, "source_section": "Section 3", "raw_string": "68083-19-2", "confidence": "high", "is_specification": true, "test_method": null}, "chemical_components": [], "chemical_synonyms": [], "purity": null},
            "physical": {"physical_form": null, "density": null, "flash_point": null, "temperature_range": null, "shelf_life": null, "cure_system": null},
            "application": {"main_application": null, "usage_restrictions": [], "packaging_options": []},
            "safety": {"ghs_statements": [], "un_number": null, "certifications": [], "global_inventories": inventories, "blocked_countries": [], "blocked_industries": []},
            "compliance": {"wiaw_status": null, "sales_advisory": null},
            "missing_attributes": ["purity"],
            "extraction_warnings": []
        }))
        .unwrap()
    }

    fn draft(doc_type: &str, language: &str, inventories: Vec<&str>) -> GoldenRecordDraft {
        GoldenRecordDraft::from_merged(
            "RT-601",
            Some("ELASTOSIL".into()),
            extraction(doc_type, language, inventories),
            vec!["/data/ELASTOSIL/RT-601/doc.pdf".into()],
        )
    }

    #[tokio::test]
    async fn versions_increase_and_only_newest_is_latest() {
        let store = MemoryStore::new();
        // The same PDF ingested in three successive runs.
        for expected_version in 1..=3 {
            let run_id = store.create_run(1).await.unwrap();
            let stored = store
                .persist_golden_record(run_id, &draft("TDS", "en", vec![]))
                .await
                .unwrap();
            assert_eq!(stored.version, expected_version);
            assert!(stored.is_latest);
            store.complete_run(run_id, 1, 0.01).await.unwrap();
        }

        let versions = store.list_product_versions("RT-601", None).await.unwrap();
        assert_eq!(versions.len(), 3);
        assert_eq!(versions[0].version, 3);
        assert!(versions[0].is_latest);
        assert!(versions[1..].iter().all(|r| !r.is_latest));

        let latest_rows: Vec<_> = versions.iter().filter(|r| r.is_latest).collect();
        assert_eq!(latest_rows.len(), 1);
    }

    #[tokio::test]
    async fn regions_version_independently() {
        let store = MemoryStore::new();
        let run_a = store.create_run(1).await.unwrap();
        let eu = store
            .persist_golden_record(run_a, &draft("SDS", "en", vec!["REACH registered", "TSCA listed"]))
            .await
            .unwrap();
        assert_eq!(eu.region, Region::Eu);
        assert_eq!(eu.version, 1);

        // A TSCA-only English SDS lands in US without touching the EU row.
        let run_b = store.create_run(1).await.unwrap();
        let us = store
            .persist_golden_record(run_b, &draft("SDS", "en", vec!["TSCA listed"]))
            .await
            .unwrap();
        assert_eq!(us.region, Region::Us);
        assert_eq!(us.version, 1);
        assert!(us.is_latest);

        let eu_rows = store
            .list_product_versions("RT-601", Some(Region::Eu))
            .await
            .unwrap();
        assert_eq!(eu_rows.len(), 1);
        assert!(eu_rows[0].is_latest);
    }

    #[tokio::test]
    async fn duplicate_key_within_a_run_is_rejected() {
        let store = MemoryStore::new();
        let run_id = store.create_run(2).await.unwrap();
        store
            .persist_golden_record(run_id, &draft("TDS", "en", vec![]))
            .await
            .unwrap();
        let err = store
            .persist_golden_record(run_id, &draft("TDS", "en", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn failed_runs_keep_committed_records() {
        let store = MemoryStore::new();
        let run_id = store.create_run(2).await.unwrap();
        store
            .persist_golden_record(run_id, &draft("TDS", "en", vec![]))
            .await
            .unwrap();
        store.fail_run(run_id, "persistence error").await.unwrap();

        let (runs, _) = store.list_runs(1, 10).await.unwrap();
        assert_eq!(runs[0].status, RunStatus::Failed);
        assert_eq!(runs[0].error_message.as_deref(), Some("persistence error"));

        let (records, total) = store
            .list_golden_records(RecordFilter::for_run(run_id))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn latest_filter_returns_one_row_per_key() {
        let store = MemoryStore::new();
        for _ in 0..3 {
            let run_id = store.create_run(1).await.unwrap();
            store
                .persist_golden_record(run_id, &draft("TDS", "en", vec![]))
                .await
                .unwrap();
        }
        let (latest, total) = store.list_golden_records(RecordFilter::latest()).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(latest[0].version, 3);
    }

    #[tokio::test]
    async fn completeness_is_derived_from_missing_count() {
        let store = MemoryStore::new();
        let run_id = store.create_run(1).await.unwrap();
        let stored = store
            .persist_golden_record(run_id, &draft("TDS", "en", vec![]))
            .await
            .unwrap();
        assert_eq!(stored.missing_count, 1);
        assert!((stored.completeness - (32.0 / 33.0 * 100.0)).abs() < 1e-9);
    }
}
