use audit_ai::AnswerMode;
use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct SearchCodeRequest {
    #[schemars(description = "Natural language or keyword query")]
    pub query: String,

    #[schemars(description = "File or directory to search")]
    pub path: String,

    #[schemars(description = "Maximum number of files to return (default: 5, max: 50)")]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeMatch {
    pub file_path: String,
    pub language: String,
    pub score: f32,
    pub preview: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchCodeResult {
    pub query: String,
    pub path: String,
    pub files_considered: usize,
    pub matches: Vec<CodeMatch>,
    pub ai_mode: AnswerMode,
}
