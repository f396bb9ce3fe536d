//! # Goldrec LLM
//!
//! Provider abstraction for the extraction pipeline.
//!
//! Exactly one operation matters to callers: [`LlmClient::call`], which takes
//! a system prompt plus user content and returns the raw response text with
//! token accounting. Two concrete adapters are provided (Gemini and
//! Anthropic, the latter directly or via Vertex AI) plus a scripted
//! [`MockClient`] for tests.
//!
//! Every call's usage is recorded into a shared [`CostTracker`], which prices
//! tokens per (provider, model) and aggregates cache hit rates and per-call
//! cost across a batch.

pub mod anthropic;
pub mod client;
pub mod cost;
pub mod gemini;
pub mod mock;
pub mod pricing;

pub use anthropic::AnthropicClient;
pub use client::{LlmClient, LlmError, LlmRequest, LlmResponse, LlmResult};
pub use cost::{CostSummary, CostTracker, ProviderStats, TokenRecord};
pub use gemini::GeminiClient;
pub use mock::MockClient;
pub use pricing::{pricing_for, Pricing};
