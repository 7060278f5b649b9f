use super::error::{ToolError, ToolResult};
use super::scan::count;
use super::schemas::call_graph::{CallGraphRequest, CallGraphResult};
use super::AuditTools;
use audit_engine::proto::BuildCallGraphRequest;

pub const DEFAULT_MAX_DEPTH: u32 = 10;

pub(super) async fn analyze_call_graph(
    tools: &AuditTools,
    request: CallGraphRequest,
) -> ToolResult<CallGraphResult> {
    let path = request.path.trim().to_string();
    let entry_point = request
        .entry_point
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty());
    let max_depth = request.max_depth.unwrap_or(DEFAULT_MAX_DEPTH).max(1);

    let client = tools.engine_client()?;
    let response = client
        .build_call_graph(BuildCallGraphRequest {
            file_path: path.clone(),
            entry_points: entry_point.iter().cloned().collect(),
            include_external: false,
            max_depth: i32::try_from(max_depth).unwrap_or(i32::MAX),
        })
        .await?;

    if !response.success {
        let reason = if response.error_message.trim().is_empty() {
            "engine could not build the call graph".to_string()
        } else {
            response.error_message
        };
        return Err(ToolError::Remote(format!("BuildCallGraph {path}: {reason}")));
    }

    log::info!(
        "analyze_call_graph: {path} -> {} nodes, {} edges",
        response.node_count,
        response.edge_count
    );
    Ok(CallGraphResult {
        path,
        entry_point,
        max_depth,
        graph_id: response.graph_id,
        node_count: count(response.node_count),
        edge_count: count(response.edge_count),
        build_time_ms: response.build_time_ms,
    })
}
