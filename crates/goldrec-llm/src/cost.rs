//! Token counting and cost aggregation across a batch.

use crate::client::LlmResponse;
use crate::pricing::pricing_for;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;
use tracing::debug;

/// Token usage for a single LLM call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub provider: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Tokens written to the prompt cache.
    pub cache_creation_tokens: u64,
    /// Tokens read back from the prompt cache.
    pub cache_read_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
    pub file_name: String,
    pub doc_type: String,
    pub duration_ms: u64,
    /// True on the losing side of a cascade pair.
    pub cascade_triggered: bool,
    pub timestamp: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            input_tokens: 0,
            output_tokens: 0,
            cache_creation_tokens: 0,
            cache_read_tokens: 0,
            total_tokens: 0,
            cost_usd: 0.0,
            file_name: String::new(),
            doc_type: String::new(),
            duration_ms: 0,
            cascade_triggered: false,
            timestamp: Utc::now(),
        }
    }

    /// Build a record straight from a provider response.
    pub fn from_response(response: &LlmResponse) -> Self {
        Self {
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            cache_creation_tokens: response.cache_creation_tokens,
            cache_read_tokens: response.cache_read_tokens,
            duration_ms: response.duration_ms,
            ..Self::new(response.provider.clone(), response.model.clone())
        }
    }

    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }

    pub fn with_cache(mut self, creation: u64, read: u64) -> Self {
        self.cache_creation_tokens = creation;
        self.cache_read_tokens = read;
        self
    }

    pub fn with_attribution(mut self, file_name: impl Into<String>, doc_type: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self.doc_type = doc_type.into();
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn cascade(mut self, triggered: bool) -> Self {
        self.cascade_triggered = triggered;
        self
    }

    fn compute_cost(&mut self) {
        self.total_tokens = self.input_tokens
            + self.output_tokens
            + self.cache_creation_tokens
            + self.cache_read_tokens;
        self.cost_usd = pricing_for(&self.model).cost_usd(
            self.input_tokens,
            self.output_tokens,
            self.cache_creation_tokens,
            self.cache_read_tokens,
        );
    }
}

/// Aggregated stats for one (provider, model).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderStats {
    pub provider: String,
    pub model: String,
    pub call_count: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
    pub total_tokens: u64,
    pub cost_usd: f64,
    pub avg_cost_per_call: f64,
    pub avg_duration_ms: u64,
    /// cache_read / (cache_read + cache_creation), as a percentage.
    pub cache_hit_rate_pct: f64,
    #[serde(skip)]
    total_duration_ms: u64,
}

/// Batch-level cost summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_calls: u64,
    pub cascade_triggered_count: u64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub avg_cost_per_call: f64,
    pub elapsed_seconds: f64,
    pub providers: BTreeMap<String, ProviderStats>,
}

/// Tracks token usage and costs across a batch of extractions.
///
/// `record` takes `&self` and is safe under concurrent invocation; one
/// tracker is shared by reference across every LLM-calling component.
pub struct CostTracker {
    records: Mutex<Vec<TokenRecord>>,
    started_at: Instant,
}

impl CostTracker {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            started_at: Instant::now(),
        }
    }

    /// Price and store one call's usage; returns the finished record.
    pub fn record(&self, mut record: TokenRecord) -> TokenRecord {
        record.compute_cost();
        debug!(
            provider = %record.provider,
            model = %record.model,
            file = %record.file_name,
            input_tokens = record.input_tokens,
            output_tokens = record.output_tokens,
            cache_read = record.cache_read_tokens,
            cost_usd = format!("${:.4}", record.cost_usd),
            "cost tracked"
        );
        self.records
            .lock()
            .expect("cost tracker poisoned")
            .push(record.clone());
        record
    }

    /// Snapshot of every record, for CSV/JSON export.
    pub fn records(&self) -> Vec<TokenRecord> {
        self.records.lock().expect("cost tracker poisoned").clone()
    }

    pub fn total_cost_usd(&self) -> f64 {
        self.records().iter().map(|r| r.cost_usd).sum()
    }

    pub fn summary(&self) -> CostSummary {
        let records = self.records();
        let mut providers: BTreeMap<String, ProviderStats> = BTreeMap::new();

        for rec in &records {
            let key = format!("{}/{}", rec.provider, rec.model);
            let stats = providers.entry(key).or_insert_with(|| ProviderStats {
                provider: rec.provider.clone(),
                model: rec.model.clone(),
                ..ProviderStats::default()
            });
            stats.call_count += 1;
            stats.input_tokens += rec.input_tokens;
            stats.output_tokens += rec.output_tokens;
            stats.cache_creation_tokens += rec.cache_creation_tokens;
            stats.cache_read_tokens += rec.cache_read_tokens;
            stats.total_tokens += rec.total_tokens;
            stats.cost_usd += rec.cost_usd;
            stats.total_duration_ms += rec.duration_ms;
        }

        for stats in providers.values_mut() {
            let calls = stats.call_count.max(1);
            stats.avg_cost_per_call = stats.cost_usd / calls as f64;
            stats.avg_duration_ms = stats.total_duration_ms / calls;
            let total_cache = stats.cache_creation_tokens + stats.cache_read_tokens;
            if total_cache > 0 {
                stats.cache_hit_rate_pct =
                    stats.cache_read_tokens as f64 / total_cache as f64 * 100.0;
            }
        }

        let total_calls = records.len() as u64;
        let total_cost_usd: f64 = records.iter().map(|r| r.cost_usd).sum();
        CostSummary {
            total_calls,
            cascade_triggered_count: records.iter().filter(|r| r.cascade_triggered).count() as u64,
            total_tokens: records.iter().map(|r| r.total_tokens).sum(),
            total_cost_usd,
            avg_cost_per_call: total_cost_usd / total_calls.max(1) as f64,
            elapsed_seconds: self.started_at.elapsed().as_secs_f64(),
            providers,
        }
    }

    /// Human-readable cost report printed at the end of every run.
    pub fn summary_text(&self) -> String {
        let s = self.summary();
        let mut lines = vec![
            "=".repeat(60),
            "  GOLDREC EXTRACTION - COST REPORT".into(),
            "=".repeat(60),
            format!("  Total Calls:      {}", s.total_calls),
            format!("  Cascades:         {}", s.cascade_triggered_count),
            format!("  Total Tokens:     {}", s.total_tokens),
            format!("  Total Cost:       ${:.4}", s.total_cost_usd),
            format!("  Avg Cost/Call:    ${:.4}", s.avg_cost_per_call),
            format!("  Elapsed:          {:.1}s", s.elapsed_seconds),
            "-".repeat(60),
        ];

        for (key, ps) in &s.providers {
            lines.extend([
                format!("  Provider: {key}"),
                format!("    Calls:          {}", ps.call_count),
                format!("    Input Tokens:   {}", ps.input_tokens),
                format!("    Output Tokens:  {}", ps.output_tokens),
                format!("    Cache Created:  {}", ps.cache_creation_tokens),
                format!("    Cache Read:     {}", ps.cache_read_tokens),
                format!("    Cache Hit Rate: {:.1}%", ps.cache_hit_rate_pct),
                format!("    Total Cost:     ${:.4}", ps.cost_usd),
                format!("    Avg Cost/Call:  ${:.4}", ps.avg_cost_per_call),
                format!("    Avg Duration:   {}ms", ps.avg_duration_ms),
                "-".repeat(60),
            ]);
        }

        lines.push("=".repeat(60));
        lines.join("\n")
    }
}

impl Default for CostTracker {
    fn default() -> Self {
        Self::new()
    }
}
