//! Agent pipeline error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(#[from] goldrec_llm::LlmError),

    #[error("invalid JSON from model: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] goldrec_core::CoreError),

    #[error(transparent)]
    Parse(#[from] goldrec_parse::ParseError),

    #[error("prompt file error: {0}")]
    Prompt(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
