use super::envelope_router::EnvelopeToolRouter;
use super::schemas::call_graph::CallGraphRequest;
use super::schemas::explain::ExplainCodeRequest;
use super::schemas::parse::ParseFileRequest;
use super::schemas::poc::GeneratePocRequest;
use super::schemas::scan::ScanRequest;
use super::schemas::search_code::SearchCodeRequest;
use super::schemas::taint::TraceTaintRequest;
use super::schemas::vulnerabilities::SearchVulnerabilitiesRequest;
use super::{AuditService, ToolRequest};
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::{tool, tool_router, ErrorData as McpError};

pub(super) fn build_envelope_router() -> EnvelopeToolRouter<AuditService> {
    EnvelopeToolRouter::new(AuditService::tool_router())
}

#[tool_router]
impl AuditService {
    /// Index every source file under a path with the analysis engine.
    #[tool(
        description = "Index a file or every Go/JavaScript/TypeScript/Python file under a directory with the analysis engine. Returns per-file results (success or error) plus function/class/variable totals."
    )]
    pub async fn scan(
        &self,
        Parameters(request): Parameters<ScanRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.run(ToolRequest::Scan(request)).await)
    }

    #[tool(
        description = "Write a minimal proof of concept for a vulnerability id. Falls back to a heuristic template when no model is configured; `ai_mode` says which one answered."
    )]
    pub async fn generate_poc(
        &self,
        Parameters(request): Parameters<GeneratePocRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.run(ToolRequest::GeneratePoc(request)).await)
    }

    #[tool(
        description = "Build the call graph of a source file from an optional entry point. Returns graph id, node/edge counts and build time."
    )]
    pub async fn analyze_call_graph(
        &self,
        Parameters(request): Parameters<CallGraphRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.run(ToolRequest::AnalyzeCallGraph(request)).await)
    }

    /// Streamed taint paths, in arrival order.
    #[tool(
        description = "Trace how data flows from a source function to a sink function. Returns up to max_paths paths in the order the engine found them, each flagged when it passes a sanitizer."
    )]
    pub async fn trace_taint(
        &self,
        Parameters(request): Parameters<TraceTaintRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.run(ToolRequest::TraceTaint(request)).await)
    }

    #[tool(
        description = "Explain a code snippet with a focus on security risks and improvements. Includes line metrics; `ai_mode` says whether a model or the heuristic fallback answered."
    )]
    pub async fn explain_code(
        &self,
        Parameters(request): Parameters<ExplainCodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.run(ToolRequest::ExplainCode(request)).await)
    }

    #[tool(
        description = "Look up published security advisories for a package (and optionally a version) in the OSV database."
    )]
    pub async fn search_vulnerabilities(
        &self,
        Parameters(request): Parameters<SearchVulnerabilitiesRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.run(ToolRequest::SearchVulnerabilities(request)).await)
    }

    #[tool(
        description = "Rank source files under a path by similarity to a query. Uses embeddings when configured, keyword counting otherwise."
    )]
    pub async fn search_code(
        &self,
        Parameters(request): Parameters<SearchCodeRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.run(ToolRequest::SearchCode(request)).await)
    }

    #[tool(
        description = "Parse one source file with the analysis engine and return its parse metadata (lines, functions, classes, errors)."
    )]
    pub async fn parse_file(
        &self,
        Parameters(request): Parameters<ParseFileRequest>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.run(ToolRequest::ParseFile(request)).await)
    }

    #[tool(
        description = "Report the engine endpoint, which AI backends are live, and the scan concurrency."
    )]
    pub async fn capabilities(&self) -> Result<CallToolResult, McpError> {
        Ok(self.run(ToolRequest::Capabilities).await)
    }
}
