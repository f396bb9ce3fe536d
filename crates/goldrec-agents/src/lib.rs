//! # Goldrec Agents
//!
//! The multi-agent extraction pipeline:
//!
//! 1. [`Classifier`] - LLM doc-type + brand detection
//! 2. [`DocExtractor`] - doc-type-specific extraction with optional cascade
//! 3. [`Auditor`] - conditional cross-check against the source document
//! 4. [`Orchestrator`] - stateless pipeline controller with bounded fan-out
//!
//! The merger is deliberately not here: merging is pure logic and lives in
//! `goldrec-core`. Every LLM-calling component shares one [`CostTracker`]
//! by reference.

pub mod auditor;
pub mod classifier;
pub mod config;
pub mod error;
pub mod executor;
pub mod extractor;
pub mod orchestrator;
pub mod prompts;
#[cfg(test)]
mod test_support;

pub use auditor::{apply_corrections, should_audit, Auditor};
pub use classifier::Classifier;
pub use config::Settings;
pub use error::AgentError;
pub use executor::{build_client, LlmExecutor};
pub use extractor::{DocExtractor, ExtractorKind};
pub use orchestrator::{GoldenOutcome, Orchestrator, PipelineOutput, PipelineSummary};
pub use prompts::{PromptRegistry, SCHEMA_HINT};
