use crate::error::{EngineError, Result};
use crate::proto::ast_parser_client::AstParserClient;
use crate::proto::call_chain_analyzer_client::CallChainAnalyzerClient;
use crate::proto::indexer_client::IndexerClient;
use crate::proto::taint_analyzer_client::TaintAnalyzerClient;
use crate::proto::{
    BuildCallGraphRequest, BuildCallGraphResponse, BuildIndexRequest, BuildIndexResponse,
    ParseRequest, ParseResponse, PathSegment, TracePathRequest,
};
use tonic::transport::Channel;
use tonic::Streaming;

/// Typed calls against the analysis engine over a borrowed channel.
///
/// Cloning is cheap; every call builds its stub from a clone of the channel, so a client never
/// outlives the call that needs it in any meaningful way.
#[derive(Clone)]
pub struct EngineClient {
    channel: Channel,
    endpoint: String,
    max_message_size: usize,
}

impl EngineClient {
    pub fn new(channel: Channel, endpoint: String, max_message_size: usize) -> Self {
        Self {
            channel,
            endpoint,
            max_message_size,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn parse_file(&self, request: ParseRequest) -> Result<ParseResponse> {
        log::debug!("ParseFile {} ({})", request.file_path, request.language);
        let mut stub = AstParserClient::new(self.channel.clone())
            .max_decoding_message_size(self.max_message_size)
            .max_encoding_message_size(self.max_message_size);
        stub.parse_file(request)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| EngineError::from_status("ParseFile", &self.endpoint, status))
    }

    pub async fn build_index(&self, request: BuildIndexRequest) -> Result<BuildIndexResponse> {
        log::debug!("BuildIndex {} ({})", request.file_path, request.language);
        let mut stub = IndexerClient::new(self.channel.clone())
            .max_decoding_message_size(self.max_message_size)
            .max_encoding_message_size(self.max_message_size);
        stub.build_index(request)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| EngineError::from_status("BuildIndex", &self.endpoint, status))
    }

    pub async fn build_call_graph(
        &self,
        request: BuildCallGraphRequest,
    ) -> Result<BuildCallGraphResponse> {
        log::debug!(
            "BuildCallGraph {} (entry points: {:?})",
            request.file_path,
            request.entry_points
        );
        let mut stub = CallChainAnalyzerClient::new(self.channel.clone())
            .max_decoding_message_size(self.max_message_size)
            .max_encoding_message_size(self.max_message_size);
        stub.build_call_graph(request)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| EngineError::from_status("BuildCallGraph", &self.endpoint, status))
    }

    /// Open the server-streamed taint trace. The caller owns the returned stream; dropping it
    /// cancels the call.
    pub async fn trace_path(&self, request: TracePathRequest) -> Result<Streaming<PathSegment>> {
        log::debug!(
            "TracePath {} -> {} (max_paths={})",
            request.source_function,
            request.sink_function,
            request.max_paths
        );
        let mut stub = TaintAnalyzerClient::new(self.channel.clone())
            .max_decoding_message_size(self.max_message_size)
            .max_encoding_message_size(self.max_message_size);
        stub.trace_path(request)
            .await
            .map(tonic::Response::into_inner)
            .map_err(|status| EngineError::from_status("TracePath", &self.endpoint, status))
    }
}
