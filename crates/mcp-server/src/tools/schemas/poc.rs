use audit_ai::{AnswerMode, PromptPair};
use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct GeneratePocRequest {
    #[schemars(description = "Vulnerability identifier, e.g. CVE-2021-44228 or GHSA-jfh8-c2jp-5v3q")]
    pub vulnerability_id: String,

    #[schemars(description = "Language of the proof of concept (default: python)")]
    pub language: Option<String>,

    #[schemars(description = "Optional code or notes the proof of concept should target")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PocResult {
    pub vulnerability_id: String,
    pub language: String,
    pub poc: String,
    pub ai_mode: AnswerMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Prompt the host can run itself when no model answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_prompt: Option<PromptPair>,
}
