use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct TraceTaintRequest {
    #[schemars(description = "Function where untrusted data enters")]
    pub source: String,

    #[schemars(description = "Function where the data must not arrive unsanitized")]
    pub sink: String,

    #[schemars(description = "Maximum number of paths to return (default: 3, max: 100)")]
    pub max_paths: Option<u32>,

    #[schemars(description = "Restrict the trace to one file")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowNode {
    pub node_id: String,
    pub function_name: String,
    pub file_path: String,
    pub line_number: i32,
    pub operation: String,
    pub variable_name: String,
    pub data_flow: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaintPath {
    pub path_index: i32,
    pub nodes: Vec<FlowNode>,
    pub has_sanitizer: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaintResult {
    pub source: String,
    pub sink: String,
    pub paths: Vec<TaintPath>,
    pub total_paths: usize,
}
