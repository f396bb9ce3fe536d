//! Result exports: summary CSV, full JSON, and cost attribution files.

use anyhow::{Context, Result};
use chrono::Utc;
use goldrec_core::PartialExtraction;
use goldrec_llm::{CostTracker, TokenRecord};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Timestamp suffix shared by all files of one invocation.
pub fn timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// One summary line per PDF. Field order is the CSV column order.
#[derive(Debug, Serialize)]
pub struct SummaryRow {
    pub file_name: String,
    pub brand: String,
    pub product_folder: String,
    pub doc_type: String,
    pub success: bool,
    pub product_name: String,
    pub cas_numbers: String,
    pub missing_count: usize,
    pub provider: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub duration_ms: u64,
    pub error: String,
    pub warnings: String,
}

impl SummaryRow {
    /// Build the row for one PDF, joining the cost records attributed to it.
    pub fn build(
        partial: &PartialExtraction,
        file_name: &str,
        brand: &str,
        product_folder: &str,
        records: &[TokenRecord],
    ) -> Self {
        let mine: Vec<&TokenRecord> = records
            .iter()
            .filter(|r| r.file_name == file_name)
            .collect();

        // Attribute provider/model to the winning extraction call; fall
        // back to whatever call happened for this file.
        let extraction_call = mine
            .iter()
            .rev()
            .find(|r| r.doc_type != "classification" && !r.cascade_triggered)
            .or_else(|| mine.first());

        let (product_name, cas_numbers) = match partial.extraction_result.as_ref() {
            Some(result) => (
                result.identity.product_name.clone(),
                result.chemical.cas_numbers.value_string(),
            ),
            None => (String::new(), String::new()),
        };

        Self {
            file_name: file_name.to_string(),
            brand: brand.to_string(),
            product_folder: product_folder.to_string(),
            doc_type: partial.doc_type.to_string(),
            success: partial.is_success(),
            product_name,
            cas_numbers,
            missing_count: partial.missing_fields.len(),
            provider: extraction_call.map(|r| r.provider.clone()).unwrap_or_default(),
            model: extraction_call.map(|r| r.model.clone()).unwrap_or_default(),
            input_tokens: mine.iter().map(|r| r.input_tokens).sum(),
            output_tokens: mine.iter().map(|r| r.output_tokens).sum(),
            cache_read_tokens: mine.iter().map(|r| r.cache_read_tokens).sum(),
            duration_ms: mine.iter().map(|r| r.duration_ms).sum(),
            error: if partial.is_success() {
                String::new()
            } else {
                partial.warnings.first().cloned().unwrap_or_default()
            },
            warnings: partial.warnings.join("; "),
        }
    }
}

pub fn export_summary_csv(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_costs_csv(path: &Path, tracker: &CostTracker) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for record in tracker.records() {
        writer.serialize(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_costs_json(path: &Path, tracker: &CostTracker) -> Result<()> {
    #[derive(Serialize)]
    struct Costs {
        summary: goldrec_llm::CostSummary,
        records: Vec<TokenRecord>,
    }
    export_json(
        path,
        &Costs {
            summary: tracker.summary(),
            records: tracker.records(),
        },
    )
}

/// Pretty-printed JSON artifact.
pub fn export_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_vec_pretty(value)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use goldrec_core::DocType;

    #[test]
    fn summary_row_for_a_failed_partial_carries_the_error() {
        let partial = PartialExtraction::failed("x.pdf", DocType::Unknown, "PDF parse error: bad xref");
        let row = SummaryRow::build(&partial, "x.pdf", "ELASTOSIL", "RT-601", &[]);
        assert!(!row.success);
        assert_eq!(row.missing_count, 33);
        assert_eq!(row.error, "PDF parse error: bad xref");
        assert_eq!(row.provider, "");
    }

    #[test]
    fn summary_row_attributes_tokens_to_the_right_file() {
        let partial = PartialExtraction::failed("a.pdf", DocType::Tds, "whatever");
        let tracker = CostTracker::new();
        tracker.record(
            TokenRecord::new("google", "gemini-2.5-flash")
                .with_tokens(100, 10)
                .with_attribution("a.pdf", "TDS"),
        );
        tracker.record(
            TokenRecord::new("google", "gemini-2.5-flash")
                .with_tokens(500, 50)
                .with_attribution("b.pdf", "TDS"),
        );

        let row = SummaryRow::build(&partial, "a.pdf", "", "", &tracker.records());
        assert_eq!(row.input_tokens, 100);
        assert_eq!(row.model, "gemini-2.5-flash");
    }

    #[test]
    fn csv_export_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.csv");
        let partial = PartialExtraction::failed("x.pdf", DocType::Sds, "boom");
        let rows = vec![SummaryRow::build(&partial, "x.pdf", "B", "P", &[])];
        export_summary_csv(&path, &rows).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "file_name,brand,product_folder,doc_type,success,product_name,cas_numbers,missing_count,provider,model,input_tokens,output_tokens,cache_read_tokens,duration_ms,error,warnings"
        );
        assert!(lines.next().unwrap().starts_with("x.pdf,B,P,SDS,false"));
    }
}
