use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct ParseFileRequest {
    #[schemars(description = "Source file to parse")]
    pub path: String,

    #[schemars(description = "Language override (default: detected from the extension)")]
    pub language: Option<String>,

    #[schemars(description = "Keep comments in the syntax tree (default: false)")]
    pub include_comments: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseResult {
    pub file_path: String,
    pub language: String,
    pub parse_time_ms: i64,
    pub total_lines: u64,
    pub total_functions: u64,
    pub total_classes: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub language_version: String,
    pub ast_bytes: usize,
    pub errors: Vec<String>,
}
