use audit_ai::{AnswerMode, PromptPair};
use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct ExplainCodeRequest {
    #[schemars(description = "Code to explain")]
    pub code: String,

    #[schemars(description = "Language of the code, if known")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CodeMetrics {
    pub lines: usize,
    pub non_empty: usize,
    pub avg_length: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExplainResult {
    pub explanation: String,
    pub metrics: CodeMetrics,
    pub ai_mode: AnswerMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Prompt the host can run itself when no model answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_prompt: Option<PromptPair>,
}
