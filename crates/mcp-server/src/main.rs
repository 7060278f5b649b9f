//! Code Audit MCP Server
//!
//! Exposes code audit tools to AI agents over MCP (stdio).
//!
//! ## Tools
//!
//! - `scan` - Index a file or directory with the analysis engine
//! - `trace_taint` - Trace data flow from a source to a sink
//! - `analyze_call_graph` - Build a call graph from an entry point
//! - `generate_poc` / `explain_code` - AI write-ups with heuristic fallback
//! - `search_vulnerabilities` - Published advisories for a package
//!
//! ## Usage
//!
//! Add to your MCP client configuration:
//! ```json
//! {
//!   "mcpServers": {
//!     "code-audit": {
//!       "command": "code-audit-mcp",
//!       "env": { "CODE_AUDIT_ENGINE_HOST": "localhost", "CODE_AUDIT_ENGINE_PORT": "50051" }
//!     }
//!   }
//! }
//! ```

use anyhow::Result;
use code_audit_mcp::{AuditConfig, AuditService};
use rmcp::transport::stdio;
use rmcp::ServiceExt;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the MCP protocol.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = AuditConfig::from_env();
    log::info!(
        "Starting Code Audit MCP server (engine {})",
        config.engine.endpoint_uri()
    );

    let service = AuditService::new(config);
    let server = service.serve(stdio()).await?;

    server.waiting().await?;

    log::info!("Code Audit MCP server stopped");
    Ok(())
}
