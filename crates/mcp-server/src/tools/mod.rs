//! Code audit tools.
//!
//! Each MCP tool builds one [`ToolRequest`] and hands it to [`AuditTools::execute`], which
//! validates it, runs it against the engine or a degrading backend, and returns an
//! [`Envelope`]. Failures are converted to envelopes there and nowhere else.

mod call_graph;
mod capabilities;
mod envelope_router;
pub mod error;
mod explain;
mod parse;
mod poc;
mod router;
pub mod scan;
pub mod schemas;
mod search_code;
pub mod taint;
pub mod vulnerabilities;

use crate::config::AuditConfig;
use audit_ai::{SimilarityBackend, TextGenerator};
use audit_engine::{ConnectionManager, EngineClient};
use audit_protocol::Envelope;
use envelope_router::EnvelopeToolRouter;
use error::{ToolError, ToolResult};
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{tool_handler, ServerHandler};
use schemas::call_graph::CallGraphRequest;
use schemas::explain::ExplainCodeRequest;
use schemas::parse::ParseFileRequest;
use schemas::poc::GeneratePocRequest;
use schemas::scan::ScanRequest;
use schemas::search_code::SearchCodeRequest;
use schemas::taint::TraceTaintRequest;
use schemas::vulnerabilities::SearchVulnerabilitiesRequest;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use vulnerabilities::AdvisoryClient;

pub use explain::code_metrics;

/// One validated-on-entry tool invocation.
#[derive(Debug, Clone)]
pub enum ToolRequest {
    Scan(ScanRequest),
    GeneratePoc(GeneratePocRequest),
    AnalyzeCallGraph(CallGraphRequest),
    TraceTaint(TraceTaintRequest),
    ExplainCode(ExplainCodeRequest),
    SearchVulnerabilities(SearchVulnerabilitiesRequest),
    SearchCode(SearchCodeRequest),
    ParseFile(ParseFileRequest),
    Capabilities,
}

impl ToolRequest {
    pub const NAMES: [&'static str; 9] = [
        "scan",
        "generate_poc",
        "analyze_call_graph",
        "trace_taint",
        "explain_code",
        "search_vulnerabilities",
        "search_code",
        "parse_file",
        "capabilities",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolRequest::Scan(_) => "scan",
            ToolRequest::GeneratePoc(_) => "generate_poc",
            ToolRequest::AnalyzeCallGraph(_) => "analyze_call_graph",
            ToolRequest::TraceTaint(_) => "trace_taint",
            ToolRequest::ExplainCode(_) => "explain_code",
            ToolRequest::SearchVulnerabilities(_) => "search_vulnerabilities",
            ToolRequest::SearchCode(_) => "search_code",
            ToolRequest::ParseFile(_) => "parse_file",
            ToolRequest::Capabilities => "capabilities",
        }
    }

    /// Check required arguments. Runs before any remote call.
    pub fn validate(&self) -> ToolResult<()> {
        match self {
            ToolRequest::Scan(req) => required("path", &req.path),
            ToolRequest::GeneratePoc(req) => required("vulnerability_id", &req.vulnerability_id),
            ToolRequest::AnalyzeCallGraph(req) => required("path", &req.path),
            ToolRequest::TraceTaint(req) => {
                required("source", &req.source)?;
                required("sink", &req.sink)?;
                if req.max_paths == Some(0) {
                    return Err(ToolError::invalid("max_paths must be at least 1"));
                }
                Ok(())
            }
            ToolRequest::ExplainCode(req) => required("code", &req.code),
            ToolRequest::SearchVulnerabilities(req) => required("package_name", &req.package_name),
            ToolRequest::SearchCode(req) => {
                required("query", &req.query)?;
                required("path", &req.path)
            }
            ToolRequest::ParseFile(req) => required("path", &req.path),
            ToolRequest::Capabilities => Ok(()),
        }
    }
}

fn required(field: &str, value: &str) -> ToolResult<()> {
    if value.trim().is_empty() {
        return Err(ToolError::invalid(format!("`{field}` is required")));
    }
    Ok(())
}

/// Shared state behind every tool: the engine connection and the degrading backends.
pub struct AuditTools {
    config: AuditConfig,
    connection: ConnectionManager,
    generator: TextGenerator,
    similarity: SimilarityBackend,
    advisories: Option<AdvisoryClient>,
}

impl AuditTools {
    pub fn new(config: AuditConfig) -> Self {
        let generator = TextGenerator::new(&config.generation);
        let similarity = SimilarityBackend::new(&config.embedding);
        Self::with_backends(config, generator, similarity)
    }

    pub fn with_backends(
        config: AuditConfig,
        generator: TextGenerator,
        similarity: SimilarityBackend,
    ) -> Self {
        let advisories = match AdvisoryClient::new(&config.osv_url) {
            Ok(client) => Some(client),
            Err(err) => {
                log::warn!("Advisory lookups disabled: {err}");
                None
            }
        };
        Self {
            connection: ConnectionManager::new(config.engine.clone()),
            config,
            generator,
            similarity,
            advisories,
        }
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn generator(&self) -> &TextGenerator {
        &self.generator
    }

    pub fn similarity(&self) -> &SimilarityBackend {
        &self.similarity
    }

    pub fn advisories(&self) -> Option<&AdvisoryClient> {
        self.advisories.as_ref()
    }

    /// Client over the shared channel, created on first use.
    pub fn engine_client(&self) -> ToolResult<EngineClient> {
        Ok(self.connection.client()?)
    }

    pub async fn execute(&self, request: ToolRequest) -> Envelope {
        let tool = request.name();
        let started = Instant::now();
        let outcome = match request.validate() {
            Ok(()) => self.dispatch(request).await,
            Err(err) => Err(err),
        };
        match outcome {
            Ok(data) => {
                log::debug!("{tool} finished in {:?}", started.elapsed());
                Envelope::success(data)
            }
            Err(err) => {
                log::warn!("{tool} failed ({}): {err}", err.kind());
                err.into_envelope()
            }
        }
    }

    async fn dispatch(&self, request: ToolRequest) -> ToolResult<serde_json::Value> {
        match request {
            ToolRequest::Scan(req) => to_data(scan::scan(self, req).await?),
            ToolRequest::GeneratePoc(req) => to_data(poc::generate_poc(self, req).await?),
            ToolRequest::AnalyzeCallGraph(req) => {
                to_data(call_graph::analyze_call_graph(self, req).await?)
            }
            ToolRequest::TraceTaint(req) => to_data(taint::trace_taint(self, req).await?),
            ToolRequest::ExplainCode(req) => to_data(explain::explain_code(self, req).await?),
            ToolRequest::SearchVulnerabilities(req) => {
                to_data(vulnerabilities::search_vulnerabilities(self, req).await?)
            }
            ToolRequest::SearchCode(req) => to_data(search_code::search_code(self, req).await?),
            ToolRequest::ParseFile(req) => to_data(parse::parse_file(self, req).await?),
            ToolRequest::Capabilities => to_data(capabilities::capabilities(self)),
        }
    }
}

fn to_data<T: Serialize>(value: T) -> ToolResult<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}

/// Render an envelope as a tool result: JSON text plus the same value as structured content.
pub fn envelope_result(envelope: &Envelope) -> CallToolResult {
    let content = vec![Content::text(envelope.to_json_string())];
    let mut result = if envelope.is_success() {
        CallToolResult::success(content)
    } else {
        CallToolResult::error(content)
    };
    result.structured_content = serde_json::to_value(envelope).ok();
    result
}

/// MCP service exposing the audit tools over one shared [`AuditTools`].
#[derive(Clone)]
pub struct AuditService {
    tool_router: EnvelopeToolRouter<AuditService>,
    tools: Arc<AuditTools>,
}

impl AuditService {
    pub fn new(config: AuditConfig) -> Self {
        Self::from_tools(AuditTools::new(config))
    }

    pub fn from_tools(tools: AuditTools) -> Self {
        Self {
            tool_router: router::build_envelope_router(),
            tools: Arc::new(tools),
        }
    }

    pub fn tools(&self) -> &AuditTools {
        &self.tools
    }

    async fn run(&self, request: ToolRequest) -> CallToolResult {
        envelope_result(&self.tools.execute(request).await)
    }
}

#[tool_handler]
impl ServerHandler for AuditService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Code audit tools backed by a remote analysis engine. Use 'scan' to index a project, 'trace_taint' and 'analyze_call_graph' for data and control flow, 'generate_poc' and 'explain_code' for AI-assisted write-ups (heuristic when no model is configured), 'search_vulnerabilities' for published advisories, and 'capabilities' to see which backends are live. Every tool returns a JSON envelope {success, data | error, error_kind}.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_protocol::ErrorKind;
    use pretty_assertions::assert_eq;

    fn offline_tools() -> AuditTools {
        AuditTools::with_backends(
            AuditConfig::default(),
            TextGenerator::unavailable("test"),
            SimilarityBackend::unavailable("test"),
        )
    }

    #[test]
    fn names_match_variants() {
        let request = ToolRequest::TraceTaint(TraceTaintRequest {
            source: "read_input".to_string(),
            sink: "execute".to_string(),
            max_paths: None,
            file_path: None,
        });
        assert_eq!(request.name(), "trace_taint");
        assert!(ToolRequest::NAMES.contains(&request.name()));
        assert_eq!(ToolRequest::Capabilities.name(), "capabilities");
    }

    #[tokio::test]
    async fn blank_required_field_fails_without_touching_the_engine() {
        let tools = offline_tools();
        let envelope = tools
            .execute(ToolRequest::TraceTaint(TraceTaintRequest {
                source: "read_input".to_string(),
                sink: "   ".to_string(),
                max_paths: Some(2),
                file_path: None,
            }))
            .await;
        assert!(!envelope.success);
        assert_eq!(envelope.error_kind, Some(ErrorKind::InvalidArgument));
        assert_eq!(envelope.error.as_deref(), Some("`sink` is required"));
        assert!(!tools.connection().is_connected());
    }

    #[tokio::test]
    async fn zero_max_paths_is_invalid() {
        let envelope = offline_tools()
            .execute(ToolRequest::TraceTaint(TraceTaintRequest {
                source: "a".to_string(),
                sink: "b".to_string(),
                max_paths: Some(0),
                file_path: None,
            }))
            .await;
        assert_eq!(envelope.error_kind, Some(ErrorKind::InvalidArgument));
    }

    #[tokio::test]
    async fn explain_falls_back_with_metrics() {
        let envelope = offline_tools()
            .execute(ToolRequest::ExplainCode(ExplainCodeRequest {
                code: "import os\nos.system(cmd)\n".to_string(),
                language: Some("python".to_string()),
            }))
            .await;
        assert!(envelope.success);
        let data = envelope.data.unwrap();
        assert_eq!(data["ai_mode"], "heuristic");
        assert_eq!(data["metrics"]["lines"], 2);
        assert!(data["explanation"]
            .as_str()
            .unwrap()
            .contains("os.system(cmd)"));
        assert!(data["llm_prompt"]["user"]
            .as_str()
            .unwrap()
            .contains("os.system(cmd)"));
        assert!(data["llm_prompt"]["system"].is_string());
    }

    #[tokio::test]
    async fn capabilities_report_unconfigured_backends() {
        let envelope = offline_tools().execute(ToolRequest::Capabilities).await;
        assert!(envelope.success);
        let data = envelope.data.unwrap();
        assert_eq!(data["engine"]["endpoint"], "http://localhost:50051");
        assert_eq!(data["engine"]["connected"], false);
        assert_eq!(data["text_generation"]["available"], false);
        assert_eq!(data["text_generation"]["mode"], "unavailable");
        assert_eq!(data["text_generation"]["error_kind"], "not_configured");
        assert_eq!(data["tools"].as_array().unwrap().len(), 9);
    }

    #[test]
    fn failed_envelope_renders_as_tool_error() {
        let result = envelope_result(&Envelope::failure(ErrorKind::Io, "disk gone"));
        assert_eq!(result.is_error, Some(true));
        let structured = result.structured_content.unwrap();
        assert_eq!(structured["error_kind"], "io");
        assert_eq!(structured["success"], false);
    }
}
