//! `goldrec agent-extract`: the full multi-agent pipeline.
//!
//! Classify, extract (with cascade), conditionally audit, group by product
//! folder, merge to golden records; optionally persist them with region
//! resolution and version assignment.

use crate::discover::discover_pdfs;
use crate::export::{export_costs_json, export_json, export_summary_csv, timestamp, SummaryRow};
use anyhow::{bail, ensure, Context, Result};
use colored::Colorize;
use goldrec_agents::{GoldenOutcome, Orchestrator, PromptRegistry, Settings};
use goldrec_core::{GoldenRecordDraft, ProductGroup};
use goldrec_store::{PgStore, Store};
use std::path::PathBuf;
use std::time::Instant;

pub struct AgentArgs {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub limit: usize,
    pub brand: Option<String>,
    pub no_merge: bool,
    pub dry_run: bool,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub persist: bool,
}

pub async fn run(args: AgentArgs) -> Result<()> {
    let mut settings = Settings::from_env();
    super::apply_overrides(&mut settings, args.provider, args.model);

    ensure!(
        args.input_dir.is_dir(),
        "input directory not found: {}",
        args.input_dir.display()
    );
    if args.persist {
        // Checked before any work: a missing database URL is a
        // configuration error, not a mid-run surprise.
        ensure!(
            settings.database_url.is_some(),
            "GOLDREC_DATABASE_URL is required for --persist"
        );
    }

    let pdfs = discover_pdfs(
        &args.input_dir,
        args.brand.as_deref(),
        None,
        args.limit,
        settings.max_file_size_mb as f64,
    );

    println!("Agent pipeline");
    println!("  Input dir:   {}", args.input_dir.display());
    println!("  Output dir:  {}", args.output_dir.display());
    println!("  Provider:    {}/{}", settings.provider, settings.model);
    println!("  Merge:       {}", if args.no_merge { "skipped" } else { "enabled" });
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
    let orchestrator = Orchestrator::from_settings(&settings, &prompts)?;
    let tracker = orchestrator.cost_tracker();

    let start = Instant::now();
    let paths: Vec<PathBuf> = pdfs.iter().map(|p| p.path.clone()).collect();
    let partials = orchestrator.process_batch(&paths).await;

    for (partial, pdf) in partials.iter().zip(&pdfs) {
        let status = if partial.is_success() { "OK".green() } else { "FAIL".red() };
        println!(
            "  {} {} ({}, {} missing{})",
            status,
            pdf.file_name,
            partial.doc_type,
            partial.missing_fields.len(),
            if partial.audit_result.is_some() { ", audited" } else { "" }
        );
    }

    let (product_groups, golden_records) = if args.no_merge {
        (Vec::new(), Vec::new())
    } else {
        let groups = Orchestrator::group_by_product(&partials);
        let goldens = Orchestrator::merge_to_golden(&groups);
        (groups, goldens)
    };

    // Exports.
    let ts = timestamp();
    let partials_path = args.output_dir.join(format!("agent_partials_{ts}.json"));
    let golden_path = args.output_dir.join(format!("agent_golden_records_{ts}.json"));
    let summary_path = args.output_dir.join(format!("agent_summary_{ts}.csv"));
    let costs_path = args.output_dir.join(format!("agent_costs_{ts}.json"));

    export_json(&partials_path, &partials)?;
    export_json(&golden_path, &golden_records)?;

    let records = tracker.records();
    let rows: Vec<SummaryRow> = partials
        .iter()
        .zip(&pdfs)
        .map(|(partial, pdf)| {
            SummaryRow::build(partial, &pdf.file_name, &pdf.brand, &pdf.product_folder, &records)
        })
        .collect();
    export_summary_csv(&summary_path, &rows)?;
    export_costs_json(&costs_path, &tracker)?;

    // Optional persistence with versioning.
    if args.persist {
        persist_golden_records(&settings, &product_groups, &golden_records, paths.len(), &tracker)
            .await?;
    }

    let successful = partials.iter().filter(|p| p.is_success()).count();
    println!();
    println!("{}", tracker.summary_text());
    println!("Pipeline summary");
    println!("  Total PDFs:             {}", paths.len());
    println!("  Successful extractions: {successful}");
    println!("  Failed extractions:     {}", paths.len() - successful);
    println!("  Product groups:         {}", product_groups.len());
    println!(
        "  Golden records:         {}",
        golden_records.iter().filter(|g| g.golden_record.is_some()).count()
    );
    println!("  Elapsed:                {:.1}s", start.elapsed().as_secs_f64());
    println!("  Partials:       {}", partials_path.display());
    println!("  Golden records: {}", golden_path.display());
    println!("  Summary CSV:    {}", summary_path.display());
    println!("  Costs:          {}", costs_path.display());

    Ok(())
}

/// Write golden records through the store: one run row, one versioned
/// record per merged product. A persistence error aborts the run and marks
/// it failed; records committed before the error remain.
async fn persist_golden_records(
    settings: &Settings,
    groups: &[ProductGroup],
    outcomes: &[GoldenOutcome],
    pdf_count: usize,
    tracker: &goldrec_llm::CostTracker,
) -> Result<()> {
    let url = settings
        .database_url
        .as_deref()
        .context("GOLDREC_DATABASE_URL is required for --persist")?;
    let store = PgStore::connect(url).await?;
    let run_id = store.create_run(pdf_count).await?;

    let mut persisted = 0usize;
    for outcome in outcomes {
        let Some(record) = &outcome.golden_record else {
            continue;
        };

        let source_files = groups
            .iter()
            .find(|g| g.product_folder == outcome.product_folder)
            .map(|g| {
                g.partial_extractions
                    .iter()
                    .map(|p| p.source_file.clone())
                    .collect()
            })
            .unwrap_or_default();

        let brand = (!outcome.brand.is_empty()).then(|| outcome.brand.clone());
        let draft = GoldenRecordDraft::from_merged(
            outcome.product_name.clone(),
            brand,
            record.clone(),
            source_files,
        );

        match store.persist_golden_record(run_id, &draft).await {
            Ok(stored) => {
                persisted += 1;
                println!(
                    "  {} {} [{}] v{} ({:.0}% complete)",
                    "persisted".green(),
                    stored.product_name,
                    stored.region,
                    stored.version,
                    stored.completeness
                );
            }
            Err(e) => {
                let message = e.to_string();
                store.fail_run(run_id, &message).await?;
                bail!("persistence failed, run {run_id} marked failed: {message}");
            }
        }
    }

    store
        .complete_run(run_id, persisted, tracker.total_cost_usd())
        .await?;
    println!("  Run {run_id} completed with {persisted} golden records");
    Ok(())
}
