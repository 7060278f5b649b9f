use audit_ai::Capability;
use audit_protocol::ErrorKind;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ServerDescriptor {
    pub name: String,
    pub version: String,
    pub envelope_schema_version: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineDescriptor {
    pub endpoint: String,
    pub connected: bool,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendDescriptor {
    pub available: bool,
    #[serde(flatten)]
    pub capability: Capability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CapabilitiesResult {
    pub server: ServerDescriptor,
    pub engine: EngineDescriptor,
    pub text_generation: BackendDescriptor,
    pub similarity: BackendDescriptor,
    pub advisories: bool,
    pub scan_concurrency: usize,
    pub tools: Vec<String>,
}
