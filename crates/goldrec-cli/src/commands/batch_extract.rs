//! `goldrec batch-extract`: one extraction per PDF, no grouping or merge.
//!
//! Uses the parser's heuristic document type to pick the extractor (no LLM
//! classifier, no auditor): the cheap bulk path. Writes a summary CSV, the
//! full JSON results, and a per-call cost CSV.

use crate::discover::{discover_pdfs, PdfFile};
use crate::export::{export_costs_csv, export_json, export_summary_csv, timestamp, SummaryRow};
use anyhow::{ensure, Result};
use colored::Colorize;
use goldrec_agents::{build_client, DocExtractor, ExtractorKind, LlmExecutor, PromptRegistry, Settings};
use goldrec_core::PartialExtraction;
use goldrec_llm::CostTracker;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct BatchArgs {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub limit: usize,
    pub brand: Option<String>,
    pub doc_type: Option<String>,
    pub no_cascade: bool,
    pub cascade_threshold: Option<usize>,
    pub dry_run: bool,
    pub delay: f64,
    pub provider: Option<String>,
    pub model: Option<String>,
}

#[derive(Serialize)]
struct BatchEntry {
    file_name: String,
    brand: String,
    product_folder: String,
    partial: PartialExtraction,
    /// Per-call token usage attributed to this file.
    token_records: Vec<goldrec_llm::TokenRecord>,
}

pub async fn run(args: BatchArgs) -> Result<()> {
    let mut settings = Settings::from_env();
    super::apply_overrides(&mut settings, args.provider, args.model);
    if args.no_cascade {
        settings.cascade_enabled = false;
    }
    if let Some(threshold) = args.cascade_threshold {
        settings.cascade_threshold = threshold;
    }

    ensure!(
        args.input_dir.is_dir(),
        "input directory not found: {}",
        args.input_dir.display()
    );

    let pdfs = discover_pdfs(
        &args.input_dir,
        args.brand.as_deref(),
        args.doc_type.as_deref(),
        args.limit,
        settings.max_file_size_mb as f64,
    );

    println!("Batch extraction");
    println!("  Input dir:   {}", args.input_dir.display());
    println!("  Output dir:  {}", args.output_dir.display());
    println!("  Provider:    {}/{}", settings.provider, settings.model);
    println!(
        "  Cascade:     {}",
        if settings.cascade_enabled { "enabled" } else { "disabled" }
    );
    println!("  PDFs found:  {}", pdfs.len());

    if pdfs.is_empty() {
        println!("{}", "No PDFs found under the input directory.".yellow());
        return Ok(());
    }

    if args.dry_run {
        for pdf in &pdfs {
            println!("  {} / {} / {} ({} MB)", pdf.brand, pdf.product_folder, pdf.file_name, pdf.size_mb);
        }
        return Ok(());
    }

    let prompts = PromptRegistry::load(settings.prompt_dir.as_deref())?;
    let tracker = Arc::new(CostTracker::new());

    let primary_client = build_client(&settings, &settings.provider, &settings.model)?;
    let primary = LlmExecutor::new(primary_client, tracker.clone())
        .with_retries(settings.max_retries, settings.retry_delay_ms);

    let fallback = if settings.cascade_enabled && settings.cascade_differs() {
        match build_client(&settings, &settings.cascade_provider, &settings.cascade_model) {
            Ok(client) => Some(
                LlmExecutor::new(client, tracker.clone())
                    .with_retries(settings.max_retries, settings.retry_delay_ms),
            ),
            Err(e) => {
                warn!(error = %e, "cascade fallback unavailable, running without cascade");
                None
            }
        }
    } else {
        None
    };

    let extractors: HashMap<ExtractorKind, DocExtractor> = ExtractorKind::ALL
        .iter()
        .map(|kind| {
            let mut extractor = DocExtractor::new(*kind, &prompts, primary.clone());
            if let Some(fb) = &fallback {
                extractor = extractor.with_cascade(fb.clone(), settings.cascade_threshold);
            }
            (*kind, extractor)
        })
        .collect();

    let total = pdfs.len();
    let mut partials: Vec<PartialExtraction> = Vec::with_capacity(total);
    for (idx, pdf) in pdfs.iter().enumerate() {
        let partial = extract_one(pdf, &extractors).await;

        let status = if partial.is_success() {
            "OK".green()
        } else {
            "FAIL".red()
        };
        println!(
            "[{}/{}] {} {} ({}, {} missing)",
            idx + 1,
            total,
            status,
            pdf.file_name,
            partial.doc_type,
            partial.missing_fields.len()
        );

        partials.push(partial);

        if args.delay > 0.0 && idx + 1 < total {
            tokio::time::sleep(Duration::from_secs_f64(args.delay)).await;
        }
    }

    let records = tracker.records();
    let entries: Vec<BatchEntry> = partials
        .into_iter()
        .zip(&pdfs)
        .map(|(partial, pdf)| BatchEntry {
            file_name: pdf.file_name.clone(),
            brand: pdf.brand.clone(),
            product_folder: pdf.product_folder.clone(),
            token_records: records
                .iter()
                .filter(|r| r.file_name == pdf.file_name)
                .cloned()
                .collect(),
            partial,
        })
        .collect();
    let rows: Vec<SummaryRow> = entries
        .iter()
        .map(|e| SummaryRow::build(&e.partial, &e.file_name, &e.brand, &e.product_folder, &records))
        .collect();

    let ts = timestamp();
    let csv_path = args.output_dir.join(format!("batch_results_{ts}.csv"));
    let json_path = args.output_dir.join(format!("batch_results_{ts}.json"));
    let cost_csv_path = args.output_dir.join(format!("batch_costs_{ts}.csv"));

    export_summary_csv(&csv_path, &rows)?;
    export_json(&json_path, &entries)?;
    export_costs_csv(&cost_csv_path, &tracker)?;

    let succeeded = entries.iter().filter(|e| e.partial.is_success()).count();
    println!();
    println!("{}", tracker.summary_text());
    println!(
        "Processed {} PDFs: {} ok, {} failed",
        total,
        succeeded,
        total - succeeded
    );
    println!("  CSV:  {}", csv_path.display());
    println!("  JSON: {}", json_path.display());
    println!("  Cost: {}", cost_csv_path.display());

    // Partial failures still exit 0; only configuration errors are fatal.
    Ok(())
}

async fn extract_one(pdf: &PdfFile, extractors: &HashMap<ExtractorKind, DocExtractor>) -> PartialExtraction {
    let source_file = pdf.path.display().to_string();

    let bytes = match std::fs::read(&pdf.path) {
        Ok(bytes) => bytes,
        Err(e) => {
            return PartialExtraction::failed(
                &source_file,
                goldrec_core::DocType::Unknown,
                format!("PDF read error: {e}"),
            )
        }
    };

    let parsed = match tokio::task::spawn_blocking(move || goldrec_parse::parse_pdf(&bytes)).await {
        Ok(Ok(parsed)) => parsed,
        Ok(Err(e)) => {
            return PartialExtraction::failed(
                &source_file,
                goldrec_core::DocType::Unknown,
                format!("PDF parse error: {e}"),
            )
        }
        Err(e) => {
            return PartialExtraction::failed(
                &source_file,
                goldrec_core::DocType::Unknown,
                format!("PDF parse error: {e}"),
            )
        }
    };

    // Heuristic classification only on this path; the LLM classifier
    // belongs to agent-extract.
    let doc_type = parsed.doc_type;
    let extractor = &extractors[&ExtractorKind::for_doc_type(doc_type)];
    let mut partial = extractor
        .extract(&parsed.full_markdown, doc_type, &pdf.file_name)
        .await;
    partial.source_file = source_file;
    partial
}
