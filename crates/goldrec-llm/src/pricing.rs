//! Per-model pricing tables (USD per 1M tokens).

use tracing::warn;

/// Prices per 1M tokens. `cache_write` is the surcharge for the first write
/// to the prompt cache, `cache_read` the discounted read price; both are 0
/// for providers without caching on that model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
    pub cache_write_per_mtok: f64,
    pub cache_read_per_mtok: f64,
}

impl Pricing {
    const fn new(input: f64, output: f64, cache_write: f64, cache_read: f64) -> Self {
        Self {
            input_per_mtok: input,
            output_per_mtok: output,
            cache_write_per_mtok: cache_write,
            cache_read_per_mtok: cache_read,
        }
    }

    /// Cost in USD for one call's token counts.
    pub fn cost_usd(
        &self,
        input_tokens: u64,
        output_tokens: u64,
        cache_creation_tokens: u64,
        cache_read_tokens: u64,
    ) -> f64 {
        (input_tokens as f64 / 1_000_000.0) * self.input_per_mtok
            + (output_tokens as f64 / 1_000_000.0) * self.output_per_mtok
            + (cache_creation_tokens as f64 / 1_000_000.0) * self.cache_write_per_mtok
            + (cache_read_tokens as f64 / 1_000_000.0) * self.cache_read_per_mtok
    }
}

/// Conservative estimate applied to unknown models.
pub const FALLBACK_PRICING: Pricing = Pricing::new(3.00, 15.00, 3.75, 0.30);

static PRICING_TABLE: &[(&str, Pricing)] = &[
    // Gemini Flash
    ("gemini-2.5-flash", Pricing::new(0.15, 0.60, 0.0375, 0.0375)),
    ("gemini-2.0-flash", Pricing::new(0.10, 0.40, 0.025, 0.025)),
    ("gemini-1.5-flash", Pricing::new(0.075, 0.30, 0.01875, 0.01875)),
    // Gemini Pro
    ("gemini-2.5-pro", Pricing::new(1.25, 10.00, 0.3125, 0.3125)),
    ("gemini-1.5-pro", Pricing::new(1.25, 5.00, 0.3125, 0.3125)),
    // Claude Sonnet (Vertex AI pricing matches the direct API)
    ("claude-sonnet-4@20250514", Pricing::new(3.00, 15.00, 3.75, 0.30)),
    ("claude-sonnet-4-20250514", Pricing::new(3.00, 15.00, 3.75, 0.30)),
    ("claude-3-5-sonnet-v2@20241022", Pricing::new(3.00, 15.00, 3.75, 0.30)),
    ("claude-3-5-sonnet@20241022", Pricing::new(3.00, 15.00, 3.75, 0.30)),
    // Claude Opus
    ("claude-opus-4@20250514", Pricing::new(15.00, 75.00, 18.75, 1.50)),
    // Claude Haiku
    ("claude-3-5-haiku@20241022", Pricing::new(0.80, 4.00, 1.00, 0.08)),
];

/// Look up pricing for a model, with fuzzy prefix matching so dated variants
/// (e.g. "gemini-2.5-flash-001") resolve to their base entry. Unknown models
/// get the conservative fallback and a warning.
pub fn pricing_for(model: &str) -> Pricing {
    if let Some((_, pricing)) = PRICING_TABLE.iter().find(|(name, _)| *name == model) {
        return *pricing;
    }
    if let Some((_, pricing)) = PRICING_TABLE
        .iter()
        .find(|(name, _)| model.contains(name) || name.contains(model))
    {
        return *pricing;
    }
    warn!(model, "unknown model pricing, using fallback");
    FALLBACK_PRICING
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        let p = pricing_for("gemini-2.5-flash");
        assert_eq!(p.input_per_mtok, 0.15);
        assert_eq!(p.output_per_mtok, 0.60);
    }

    #[test]
    fn fuzzy_match_on_dated_variant() {
        let p = pricing_for("gemini-2.5-flash-001");
        assert_eq!(p.input_per_mtok, 0.15);
    }

    #[test]
    fn unknown_model_falls_back() {
        let p = pricing_for("some-future-model");
        assert_eq!(p, FALLBACK_PRICING);
    }

    #[test]
    fn cost_formula() {
        let p = Pricing::new(1.0, 2.0, 4.0, 0.5);
        // 1M of each bucket: 1 + 2 + 4 + 0.5
        let cost = p.cost_usd(1_000_000, 1_000_000, 1_000_000, 1_000_000);
        assert!((cost - 7.5).abs() < 1e-9);
        assert!(p.cost_usd(0, 0, 0, 0).abs() < 1e-12);
    }
}
