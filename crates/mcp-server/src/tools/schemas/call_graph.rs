use rmcp::schemars;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, schemars::JsonSchema)]
pub struct CallGraphRequest {
    #[schemars(description = "Source file to build the call graph from")]
    pub path: String,

    #[schemars(description = "Entry point function (default: every top-level function)")]
    pub entry_point: Option<String>,

    #[schemars(description = "Maximum call depth to follow (default: 10)")]
    pub max_depth: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallGraphResult {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
    pub max_depth: u32,
    pub graph_id: String,
    pub node_count: u64,
    pub edge_count: u64,
    pub build_time_ms: i64,
}
