//! MCP server exposing code audit tools.
//!
//! Structural work (parsing, indexing, call graphs, taint tracing) is delegated to a remote
//! analysis engine over gRPC; write-ups and similarity search use AI backends that degrade to
//! local heuristics. See [`tools`] for the tool contract.

pub mod config;
pub mod tools;

pub use config::AuditConfig;
pub use tools::{envelope_result, AuditService, AuditTools, ToolRequest};
