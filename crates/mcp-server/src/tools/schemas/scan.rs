use audit_protocol::ErrorKind;
use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct ScanRequest {
    /// File or directory to index
    #[schemars(description = "File or directory to index. Directories are walked recursively.")]
    pub path: String,

    /// Language override
    #[schemars(
        description = "Language override (go, javascript, typescript, python). Defaults to detection by file extension."
    )]
    pub language: Option<String>,

    #[schemars(description = "Ask the engine for an incremental index build (default: true)")]
    pub incremental: Option<bool>,
}

/// Outcome of indexing one file. Success and failure are recorded per file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemResult {
    pub file_path: String,
    pub language: String,
    pub indexed: bool,
    pub functions_indexed: u64,
    pub classes_indexed: u64,
    pub variables_indexed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanTotals {
    pub functions: u64,
    pub classes: u64,
    pub variables: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub path: String,
    pub files_scanned: usize,
    pub successes: usize,
    pub failures: usize,
    pub totals: ScanTotals,
    pub results: Vec<ItemResult>,
    pub message: String,
    pub elapsed_ms: u64,
}
