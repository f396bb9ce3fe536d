//! CLI definition and command dispatch.

use crate::commands::{agent_extract, batch_extract};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Goldrec - chemical product PDF extraction to golden records.
#[derive(Parser)]
#[command(name = "goldrec")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable trace-level logging
    #[arg(long, global = true)]
    pub trace: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract every PDF under a directory with the doc-type extractor
    /// pool, one result per PDF (no grouping or merging).
    BatchExtract {
        /// Root directory: <root>/<BRAND>/<PRODUCT>/<FILE>.pdf
        #[arg(long)]
        input_dir: PathBuf,

        /// Where result files are written
        #[arg(long, default_value = "output/batch_results")]
        output_dir: PathBuf,

        /// Process at most N PDFs (0 = no limit)
        #[arg(long, default_value_t = 0)]
        limit: usize,

        /// Only PDFs under this brand folder
        #[arg(long)]
        brand: Option<String>,

        /// Only files whose name carries this doc-type marker (TDS, SDS, ...)
        #[arg(long)]
        doc_type: Option<String>,

        /// Disable the quality-model cascade
        #[arg(long)]
        no_cascade: bool,

        /// Fallback fires when more than N of 33 attributes are missing
        #[arg(long)]
        cascade_threshold: Option<usize>,

        /// List the discovered PDFs and exit
        #[arg(long)]
        dry_run: bool,

        /// Seconds to sleep between PDFs (provider rate limits)
        #[arg(long, default_value_t = 0.0)]
        delay: f64,

        /// Override the primary provider (google, anthropic)
        #[arg(long)]
        provider: Option<String>,

        /// Override the primary model
        #[arg(long)]
        model: Option<String>,
    },

    /// Run the full multi-agent pipeline: classify, extract, audit, group
    /// by product, merge to golden records.
    AgentExtract {
        /// Root directory: <root>/<BRAND>/<PRODUCT>/<FILE>.pdf
        #[arg(long)]
        input_dir: PathBuf,

        /// Where result files are written
        #[arg(long, default_value = "output/agent_results")]
        output_dir: PathBuf,

        /// Process at most N PDFs (0 = no limit)
        #[arg(long, default_value_t = 0)]
        limit: usize,

        /// Only PDFs under this brand folder
        #[arg(long)]
        brand: Option<String>,

        /// Skip the grouping + merge stage
        #[arg(long)]
        no_merge: bool,

        /// List the discovered PDFs and exit
        #[arg(long)]
        dry_run: bool,

        /// Override the primary provider (google, anthropic)
        #[arg(long)]
        provider: Option<String>,

        /// Override the primary model
        #[arg(long)]
        model: Option<String>,

        /// Persist golden records (requires GOLDREC_DATABASE_URL)
        #[arg(long)]
        persist: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::BatchExtract {
                input_dir,
                output_dir,
                limit,
                brand,
                doc_type,
                no_cascade,
                cascade_threshold,
                dry_run,
                delay,
                provider,
                model,
            } => {
                batch_extract::run(batch_extract::BatchArgs {
                    input_dir,
                    output_dir,
                    limit,
                    brand,
                    doc_type,
                    no_cascade,
                    cascade_threshold,
                    dry_run,
                    delay,
                    provider,
                    model,
                })
                .await
            }
            Commands::AgentExtract {
                input_dir,
                output_dir,
                limit,
                brand,
                no_merge,
                dry_run,
                provider,
                model,
                persist,
            } => {
                agent_extract::run(agent_extract::AgentArgs {
                    input_dir,
                    output_dir,
                    limit,
                    brand,
                    no_merge,
                    dry_run,
                    provider,
                    model,
                    persist,
                })
                .await
            }
        }
    }
}
