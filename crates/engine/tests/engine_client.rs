use anyhow::{Context, Result};
use audit_engine::proto::indexer_server::{Indexer, IndexerServer};
use audit_engine::proto::taint_analyzer_server::{TaintAnalyzer, TaintAnalyzerServer};
use audit_engine::proto::{
    BuildIndexRequest, BuildIndexResponse, PathNode, PathSegment, TracePathRequest,
};
use audit_engine::{ConnectionManager, EngineSettings};
use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::{Request, Response, Status};

#[derive(Default)]
struct FakeEngine;

#[tonic::async_trait]
impl Indexer for FakeEngine {
    async fn build_index(
        &self,
        request: Request<BuildIndexRequest>,
    ) -> Result<Response<BuildIndexResponse>, Status> {
        let req = request.into_inner();
        if req.content.is_empty() {
            return Ok(Response::new(BuildIndexResponse {
                success: false,
                error_message: format!("{}: empty content", req.file_path),
                ..Default::default()
            }));
        }
        let functions = String::from_utf8_lossy(&req.content).matches("def ").count() as i32;
        Ok(Response::new(BuildIndexResponse {
            success: true,
            index_id: format!("idx:{}", req.file_path),
            functions_indexed: functions,
            classes_indexed: 0,
            variables_indexed: 1,
            error_message: String::new(),
        }))
    }
}

#[tonic::async_trait]
impl TaintAnalyzer for FakeEngine {
    type TracePathStream = ReceiverStream<Result<PathSegment, Status>>;

    async fn trace_path(
        &self,
        request: Request<TracePathRequest>,
    ) -> Result<Response<Self::TracePathStream>, Status> {
        let req = request.into_inner();
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        tokio::spawn(async move {
            for index in 1..=req.max_paths {
                let segment = PathSegment {
                    path_index: index,
                    nodes: vec![
                        PathNode {
                            node_id: format!("n{index}a"),
                            function_name: req.source_function.clone(),
                            file_path: "app.py".to_string(),
                            line_number: 10,
                            operation: "call".to_string(),
                            variable_name: "data".to_string(),
                            data_flow: "source".to_string(),
                        },
                        PathNode {
                            node_id: format!("n{index}b"),
                            function_name: req.sink_function.clone(),
                            file_path: "app.py".to_string(),
                            line_number: 20,
                            operation: "call".to_string(),
                            variable_name: "query".to_string(),
                            data_flow: "sink".to_string(),
                        },
                    ],
                    has_sanitizer: index % 2 == 0,
                };
                if tx.send(Ok(segment)).await.is_err() {
                    break;
                }
            }
        });
        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

async fn spawn_fake_engine() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("bind fake engine")?;
    let port = listener.local_addr()?.port();
    tokio::spawn(async move {
        let _ = tonic::transport::Server::builder()
            .add_service(IndexerServer::new(FakeEngine))
            .add_service(TaintAnalyzerServer::new(FakeEngine))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await;
    });
    Ok(port)
}

fn manager_for(port: u16) -> ConnectionManager {
    ConnectionManager::new(EngineSettings {
        host: "127.0.0.1".to_string(),
        port,
        connect_timeout: Duration::from_secs(2),
        request_timeout: Duration::from_secs(5),
        ..EngineSettings::default()
    })
}

#[tokio::test]
async fn build_index_round_trips_through_the_shared_channel() -> Result<()> {
    let port = spawn_fake_engine().await?;
    let manager = manager_for(port);
    let client = manager.client()?;

    let reply = client
        .build_index(BuildIndexRequest {
            file_path: "app.py".to_string(),
            language: "python".to_string(),
            content: b"def a():\n    pass\ndef b():\n    pass\n".to_vec(),
            incremental: true,
        })
        .await?;
    assert!(reply.success);
    assert_eq!(reply.index_id, "idx:app.py");
    assert_eq!(reply.functions_indexed, 2);

    let failed = client
        .build_index(BuildIndexRequest {
            file_path: "empty.py".to_string(),
            language: "python".to_string(),
            content: Vec::new(),
            incremental: false,
        })
        .await?;
    assert!(!failed.success);
    assert_eq!(failed.error_message, "empty.py: empty content");
    Ok(())
}

#[tokio::test]
async fn trace_path_streams_segments_in_order() -> Result<()> {
    let port = spawn_fake_engine().await?;
    let manager = manager_for(port);
    let client = manager.client()?;

    let mut stream = client
        .trace_path(TracePathRequest {
            source_function: "read_input".to_string(),
            sink_function: "db.query".to_string(),
            max_paths: 3,
            file_path: String::new(),
        })
        .await?;

    let mut indices = Vec::new();
    while let Some(segment) = stream.message().await? {
        assert_eq!(segment.nodes.len(), 2);
        indices.push(segment.path_index);
    }
    assert_eq!(indices, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn unreachable_engine_is_reported_as_unavailable() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);

    let manager = manager_for(port);
    let client = manager.client()?;
    let err = client
        .build_index(BuildIndexRequest {
            file_path: "app.py".to_string(),
            language: "python".to_string(),
            content: b"x = 1".to_vec(),
            incremental: true,
        })
        .await
        .expect_err("nothing listens on the port");
    assert!(err.is_unavailable(), "{err}");
    Ok(())
}
