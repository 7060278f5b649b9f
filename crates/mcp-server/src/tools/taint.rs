//! Taint tracing: consume the engine's path stream in arrival order, up to a limit.

use super::error::{ToolError, ToolResult};
use super::schemas::taint::{FlowNode, TaintPath, TaintResult, TraceTaintRequest};
use super::AuditTools;
use audit_engine::proto::{PathNode, PathSegment, TracePathRequest};
use audit_engine::EngineError;
use tokio_stream::{Stream, StreamExt};
use tonic::Status;

pub const DEFAULT_MAX_PATHS: u32 = 3;
pub const MAX_TRACE_PATHS: u32 = 100;

/// Collect segments in arrival order until the stream ends or `max_paths` are held.
///
/// Stops reading as soon as the limit is reached even if the server keeps sending. Any error
/// element fails the whole collection.
pub async fn collect_paths<S>(mut stream: S, max_paths: usize) -> Result<Vec<PathSegment>, Status>
where
    S: Stream<Item = Result<PathSegment, Status>> + Unpin,
{
    let mut paths = Vec::new();
    if max_paths == 0 {
        return Ok(paths);
    }
    while let Some(segment) = stream.next().await {
        paths.push(segment?);
        log::debug!("trace_taint: received {} path(s)", paths.len());
        if paths.len() >= max_paths {
            break;
        }
    }
    Ok(paths)
}

pub(super) async fn trace_taint(
    tools: &AuditTools,
    request: TraceTaintRequest,
) -> ToolResult<TaintResult> {
    let max_paths = effective_max_paths(request.max_paths)?;
    let source = request.source.trim().to_string();
    let sink = request.sink.trim().to_string();

    let client = tools.engine_client()?;
    let stream = client
        .trace_path(TracePathRequest {
            source_function: source.clone(),
            sink_function: sink.clone(),
            max_paths: max_paths as i32,
            file_path: request
                .file_path
                .map(|path| path.trim().to_string())
                .unwrap_or_default(),
        })
        .await?;

    let segments = collect_paths(stream, max_paths as usize)
        .await
        .map_err(|status| EngineError::from_status("TracePath", client.endpoint(), status))?;

    let paths: Vec<TaintPath> = segments.into_iter().map(TaintPath::from).collect();
    log::info!(
        "trace_taint: {} path(s) from {source} to {sink}",
        paths.len()
    );
    Ok(TaintResult {
        total_paths: paths.len(),
        source,
        sink,
        paths,
    })
}

fn effective_max_paths(requested: Option<u32>) -> ToolResult<u32> {
    match requested {
        None => Ok(DEFAULT_MAX_PATHS),
        Some(0) => Err(ToolError::invalid("max_paths must be at least 1")),
        Some(value) => Ok(value.min(MAX_TRACE_PATHS)),
    }
}

impl From<PathNode> for FlowNode {
    fn from(node: PathNode) -> Self {
        Self {
            node_id: node.node_id,
            function_name: node.function_name,
            file_path: node.file_path,
            line_number: node.line_number,
            operation: node.operation,
            variable_name: node.variable_name,
            data_flow: node.data_flow,
        }
    }
}

impl From<PathSegment> for TaintPath {
    fn from(segment: PathSegment) -> Self {
        Self {
            path_index: segment.path_index,
            nodes: segment.nodes.into_iter().map(FlowNode::from).collect(),
            has_sanitizer: segment.has_sanitizer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn segment(index: i32) -> PathSegment {
        PathSegment {
            path_index: index,
            nodes: Vec::new(),
            has_sanitizer: false,
        }
    }

    #[tokio::test]
    async fn keeps_arrival_order_without_sorting() {
        let stream = tokio_stream::iter(vec![Ok(segment(2)), Ok(segment(1)), Ok(segment(2))]);
        let paths = collect_paths(stream, 10).await.unwrap();
        let indices: Vec<i32> = paths.iter().map(|p| p.path_index).collect();
        assert_eq!(indices, vec![2, 1, 2]);
    }

    #[tokio::test]
    async fn stops_reading_at_the_limit() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&pulled);
        let stream = tokio_stream::iter((1..=50).map(Ok::<i32, Status>)).map(move |result| {
            counter.fetch_add(1, Ordering::SeqCst);
            result.map(segment)
        });
        let paths = collect_paths(stream, 3).await.unwrap();
        assert_eq!(paths.len(), 3);
        assert_eq!(pulled.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn mid_stream_error_discards_partial_paths() {
        let stream = tokio_stream::iter(vec![
            Ok(segment(1)),
            Err(Status::unavailable("engine went away")),
            Ok(segment(2)),
        ]);
        let err = collect_paths(stream, 5).await.unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unavailable);
    }

    #[tokio::test]
    async fn empty_stream_is_an_empty_result() {
        let stream = tokio_stream::iter(Vec::<Result<PathSegment, Status>>::new());
        assert!(collect_paths(stream, 3).await.unwrap().is_empty());
    }

    #[test]
    fn max_paths_defaults_and_caps() {
        assert_eq!(effective_max_paths(None).unwrap(), DEFAULT_MAX_PATHS);
        assert_eq!(effective_max_paths(Some(7)).unwrap(), 7);
        assert_eq!(effective_max_paths(Some(5000)).unwrap(), MAX_TRACE_PATHS);
        assert!(effective_max_paths(Some(0)).is_err());
    }
}
