//! Pipeline orchestrator.
//!
//! Stateless controller, no LLM calls of its own:
//!
//! ```text
//! single PDF:  parse -> classify -> extract -> (audit) -> PartialExtraction
//! batch:       per-PDF pipeline under a bounded semaphore,
//!              group by product folder, merge groups to golden records
//! ```
//!
//! Individual PDF failures are encoded as failed partials, never exceptions;
//! batch output order always matches input order regardless of internal
//! parallelism. A cancellation signal stops dispatching new PDFs while
//! in-flight ones run to completion.

use crate::auditor::{apply_corrections, should_audit, Auditor};
use crate::classifier::Classifier;
use crate::config::Settings;
use crate::error::AgentResult;
use crate::executor::{build_client, LlmExecutor};
use crate::extractor::{DocExtractor, ExtractorKind};
use crate::prompts::PromptRegistry;
use goldrec_core::{merge_group, DocType, ExtractionResult, PartialExtraction, ProductGroup};
use goldrec_llm::{CostSummary, CostTracker};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Outcome of merging one product group.
#[derive(Debug, Clone, Serialize)]
pub struct GoldenOutcome {
    pub product_name: String,
    pub product_folder: String,
    pub brand: String,
    pub golden_record: Option<ExtractionResult>,
    /// How many PDFs contributed.
    pub source_count: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub total_pdfs: usize,
    pub successful_extractions: usize,
    pub failed_extractions: usize,
    pub product_groups: usize,
    pub golden_records: usize,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Serialize)]
pub struct PipelineOutput {
    pub partials: Vec<PartialExtraction>,
    pub product_groups: Vec<ProductGroup>,
    pub golden_records: Vec<GoldenOutcome>,
    pub pipeline_summary: PipelineSummary,
    pub cost_summary: CostSummary,
}

struct Inner {
    classifier: Classifier,
    extractors: HashMap<ExtractorKind, DocExtractor>,
    auditor: Auditor,
    tracker: Arc<CostTracker>,
    max_concurrent: usize,
    cancelled: AtomicBool,
}

/// Pipeline controller. Cheap to clone; clones share the cost tracker and
/// the cancellation flag.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    /// Build the full agent set from settings. Provider clients are
    /// constructed once here and cached for the orchestrator's lifetime.
    pub fn from_settings(settings: &Settings, prompts: &PromptRegistry) -> AgentResult<Self> {
        let tracker = Arc::new(CostTracker::new());
        let primary_client = build_client(settings, &settings.provider, &settings.model)?;
        let primary = LlmExecutor::new(primary_client, tracker.clone())
            .with_retries(settings.max_retries, settings.retry_delay_ms);

        let fallback = if settings.cascade_enabled && settings.cascade_differs() {
            match build_client(settings, &settings.cascade_provider, &settings.cascade_model) {
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

        Ok(Self::with_executors(
            primary,
            fallback,
            settings.cascade_threshold,
            settings.max_concurrent,
            prompts,
            tracker,
        ))
    }

    /// Assemble an orchestrator from pre-built executors. The seam used by
    /// tests (mock clients) and custom wiring.
    pub fn with_executors(
        primary: LlmExecutor,
        fallback: Option<LlmExecutor>,
        cascade_threshold: usize,
        max_concurrent: usize,
        prompts: &PromptRegistry,
        tracker: Arc<CostTracker>,
    ) -> Self {
        let extractors = ExtractorKind::ALL
            .iter()
            .map(|kind| {
                let mut extractor = DocExtractor::new(*kind, prompts, primary.clone());
                if let Some(fb) = &fallback {
                    extractor = extractor.with_cascade(fb.clone(), cascade_threshold);
                }
                (*kind, extractor)
            })
            .collect();

        Self {
            inner: Arc::new(Inner {
                classifier: Classifier::new(primary.clone(), prompts),
                extractors,
                auditor: Auditor::new(primary, prompts),
                tracker,
                max_concurrent: max_concurrent.max(1),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    pub fn cost_tracker(&self) -> Arc<CostTracker> {
        self.inner.tracker.clone()
    }

    /// Stop dispatching new PDFs; in-flight work finishes normally.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Process a single PDF through the full agent pipeline. Never raises;
    /// parser failures come back as failed partials.
    pub async fn process_single(&self, pdf_path: &Path) -> PartialExtraction {
        let source_file = pdf_path.display().to_string();
        let file_name = pdf_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| source_file.clone());
        let start = Instant::now();

        let bytes = match tokio::fs::read(pdf_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(file = %file_name, error = %e, "PDF read failed");
                return PartialExtraction::failed(
                    &source_file,
                    DocType::Unknown,
                    format!("PDF read error: {e}"),
                );
            }
        };

        let parsed =
            match tokio::task::spawn_blocking(move || goldrec_parse::parse_pdf(&bytes)).await {
                Ok(Ok(parsed)) => parsed,
                Ok(Err(e)) => {
                    error!(file = %file_name, error = %e, "PDF parse failed");
                    return PartialExtraction::failed(
                        &source_file,
                        DocType::Unknown,
                        format!("PDF parse error: {e}"),
                    );
                }
                Err(e) => {
                    error!(file = %file_name, error = %e, "PDF parse task failed");
                    return PartialExtraction::failed(
                        &source_file,
                        DocType::Unknown,
                        format!("PDF parse error: {e}"),
                    );
                }
            };

        let mut partial = self
            .process_document(&parsed.full_markdown, &file_name)
            .await;
        partial.source_file = source_file;

        info!(
            file = %file_name,
            doc_type = %partial.doc_type,
            extracted = partial.extracted_fields.len(),
            missing = partial.missing_fields.len(),
            audited = partial.audit_result.is_some(),
            duration_ms = start.elapsed().as_millis() as u64,
            "PDF processed"
        );

        partial
    }

    /// The LLM stages on already-parsed markdown: classify, extract,
    /// conditionally audit.
    pub async fn process_document(&self, markdown: &str, file_name: &str) -> PartialExtraction {
        let classification = self.inner.classifier.classify(markdown, file_name).await;
        let doc_type = classification.doc_type;

        let extractor = &self.inner.extractors[&ExtractorKind::for_doc_type(doc_type)];
        let mut partial = extractor.extract(markdown, doc_type, file_name).await;

        let (audit_triggered, reasons) = should_audit(&partial, doc_type);
        if audit_triggered {
            info!(file = file_name, doc_type = %doc_type, reasons = ?reasons, "audit triggered");
            let audit = self
                .inner
                .auditor
                .audit(markdown, &partial, doc_type, file_name)
                .await;
            let has_corrections = !audit.corrections.is_empty();
            partial.audit_result = Some(audit.clone());
            if has_corrections {
                partial = apply_corrections(partial, &audit);
            }
        }

        partial
    }

    /// Process a batch of PDFs with bounded parallelism. Output order
    /// matches input order.
    pub async fn process_batch(&self, pdf_paths: &[PathBuf]) -> Vec<PartialExtraction> {
        let semaphore = Arc::new(Semaphore::new(self.inner.max_concurrent));
        let total = pdf_paths.len();
        let mut handles = Vec::with_capacity(total);

        for (idx, path) in pdf_paths.iter().enumerate() {
            let this = self.clone();
            let path = path.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                if this.is_cancelled() {
                    return PartialExtraction::failed(
                        path.display().to_string(),
                        DocType::Unknown,
                        "batch cancelled before dispatch",
                    );
                }
                info!(file = %path.display(), item = idx + 1, total, "batch item");
                this.process_single(&path).await
            }));
        }

        let mut results = Vec::with_capacity(total);
        for (handle, path) in handles.into_iter().zip(pdf_paths) {
            match handle.await {
                Ok(partial) => results.push(partial),
                Err(e) => {
                    error!(file = %path.display(), error = %e, "batch task failed");
                    results.push(PartialExtraction::failed(
                        path.display().to_string(),
                        DocType::Unknown,
                        format!("Processing error: {e}"),
                    ));
                }
            }
        }
        results
    }

    /// Group partial extractions by the parent directory of their source
    /// file. Groups come out in first-seen order.
    pub fn group_by_product(partials: &[PartialExtraction]) -> Vec<ProductGroup> {
        let mut order: Vec<String> = Vec::new();
        let mut buckets: HashMap<String, Vec<PartialExtraction>> = HashMap::new();

        for partial in partials {
            let folder = Path::new(&partial.source_file)
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            if !buckets.contains_key(&folder) {
                order.push(folder.clone());
            }
            buckets.entry(folder).or_default().push(partial.clone());
        }

        let groups: Vec<ProductGroup> = order
            .into_iter()
            .map(|folder| {
                let group_partials = buckets.remove(&folder).unwrap_or_default();
                let folder_name = Path::new(&folder)
                    .file_name()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| folder.clone());

                let product_name = group_partials
                    .iter()
                    .filter_map(|p| p.extraction_result.as_ref())
                    .map(|r| r.identity.product_name.trim())
                    .find(|name| !name.is_empty())
                    .map(String::from)
                    .unwrap_or(folder_name);

                let brand = group_partials
                    .iter()
                    .filter_map(|p| p.extraction_result.as_ref())
                    .filter_map(|r| r.document_info.brand.as_deref())
                    .find(|b| !b.is_empty())
                    .map(String::from)
                    .unwrap_or_default();

                ProductGroup {
                    product_name,
                    product_folder: folder,
                    brand,
                    partial_extractions: group_partials,
                }
            })
            .collect();

        info!(
            total_pdfs = partials.len(),
            product_groups = groups.len(),
            "grouped into products"
        );
        groups
    }

    /// Merge each product group into a golden record. Merge errors are
    /// per-group; other groups still produce records.
    pub fn merge_to_golden(groups: &[ProductGroup]) -> Vec<GoldenOutcome> {
        groups
            .iter()
            .map(|group| match merge_group(group) {
                Ok(golden) => {
                    info!(
                        product = %group.product_name,
                        sources = group.partial_extractions.len(),
                        missing = golden.missing_attributes.len(),
                        "golden record created"
                    );
                    GoldenOutcome {
                        product_name: group.product_name.clone(),
                        product_folder: group.product_folder.clone(),
                        brand: group.brand.clone(),
                        golden_record: Some(golden),
                        source_count: group.partial_extractions.len(),
                        error: None,
                    }
                }
                Err(e) => {
                    error!(product = %group.product_name, error = %e, "golden record merge failed");
                    GoldenOutcome {
                        product_name: group.product_name.clone(),
                        product_folder: group.product_folder.clone(),
                        brand: group.brand.clone(),
                        golden_record: None,
                        source_count: group.partial_extractions.len(),
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect()
    }

    /// The complete pipeline: extract every PDF, group, merge, summarise.
    pub async fn run_full_pipeline(&self, pdf_paths: &[PathBuf]) -> PipelineOutput {
        let start = Instant::now();

        let partials = self.process_batch(pdf_paths).await;
        let product_groups = Self::group_by_product(&partials);
        let golden_records = Self::merge_to_golden(&product_groups);

        let summary = PipelineSummary {
            total_pdfs: pdf_paths.len(),
            successful_extractions: partials.iter().filter(|p| p.is_success()).count(),
            failed_extractions: partials.iter().filter(|p| !p.is_success()).count(),
            product_groups: product_groups.len(),
            golden_records: golden_records
                .iter()
                .filter(|g| g.golden_record.is_some())
                .count(),
            elapsed_seconds: (start.elapsed().as_secs_f64() * 10.0).round() / 10.0,
        };

        info!(
            total_pdfs = summary.total_pdfs,
            successful = summary.successful_extractions,
            failed = summary.failed_extractions,
            groups = summary.product_groups,
            golden_records = summary.golden_records,
            elapsed_seconds = summary.elapsed_seconds,
            "full pipeline complete"
        );

        PipelineOutput {
            partials,
            product_groups,
            golden_records,
            pipeline_summary: summary,
            cost_summary: self.inner.tracker.summary(),
        }
    }
}
