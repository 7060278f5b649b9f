use super::schemas::capabilities::{
    BackendDescriptor, CapabilitiesResult, EngineDescriptor, ServerDescriptor,
};
use super::{AuditTools, ToolRequest};
use audit_ai::Capability;
use audit_protocol::{ErrorKind, ENVELOPE_SCHEMA_VERSION};

pub(super) fn capabilities(tools: &AuditTools) -> CapabilitiesResult {
    let engine = tools.connection();
    CapabilitiesResult {
        server: ServerDescriptor {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            envelope_schema_version: ENVELOPE_SCHEMA_VERSION,
        },
        engine: EngineDescriptor {
            endpoint: engine.endpoint(),
            connected: engine.is_connected(),
            request_timeout_ms: u64::try_from(engine.settings().request_timeout.as_millis())
                .unwrap_or(u64::MAX),
        },
        text_generation: describe(tools.generator().capability()),
        similarity: describe(tools.similarity().capability()),
        advisories: tools.advisories().is_some(),
        scan_concurrency: tools.config().scan_concurrency,
        tools: ToolRequest::NAMES.iter().map(ToString::to_string).collect(),
    }
}

fn describe(capability: &Capability) -> BackendDescriptor {
    BackendDescriptor {
        available: capability.is_ready(),
        capability: capability.clone(),
        error_kind: (!capability.is_ready()).then_some(ErrorKind::NotConfigured),
    }
}
