use super::{envelope_result, AuditService};
use audit_protocol::{Envelope, ErrorKind};
use rmcp::handler::server::tool::{ToolCallContext, ToolRouter};
use rmcp::model::{CallToolResult, ErrorCode, Tool};
use rmcp::ErrorData;
use serde_json::{Map, Value};

/// Tool router whose argument errors come back as `invalid_argument` envelopes.
///
/// rmcp rejects arguments that fail to deserialize with `INVALID_PARAMS` before the handler
/// runs. For known tools that error is rewritten into a normal tool result so callers see the
/// same envelope shape as every other failure.
#[derive(Clone)]
pub(super) struct EnvelopeToolRouter<S> {
    inner: ToolRouter<S>,
}

impl<S> EnvelopeToolRouter<S>
where
    S: Send + Sync + 'static,
{
    pub(super) fn new(inner: ToolRouter<S>) -> Self {
        Self { inner }
    }

    pub(super) fn list_all(&self) -> Vec<Tool> {
        self.inner.list_all()
    }
}

impl EnvelopeToolRouter<AuditService> {
    pub(super) async fn call(
        &self,
        context: ToolCallContext<'_, AuditService>,
    ) -> Result<CallToolResult, ErrorData> {
        let tool_name = context.name.to_string();
        match self.inner.call(context).await {
            Ok(result) => Ok(result),
            Err(err) if err.code == ErrorCode::INVALID_PARAMS => {
                let Some(route) = self.inner.map.get(tool_name.as_str()) else {
                    return Err(err);
                };
                let message = invalid_params_message(
                    &tool_name,
                    route.attr.input_schema.as_ref(),
                    err.message.as_ref(),
                );
                log::warn!("{message}");
                Ok(envelope_result(&Envelope::failure(
                    ErrorKind::InvalidArgument,
                    message,
                )))
            }
            Err(err) => Err(err),
        }
    }
}

fn invalid_params_message(tool_name: &str, schema: &Map<String, Value>, raw: &str) -> String {
    let mut message = match extract_serde_field(raw, "missing field `") {
        Some(field) => format!("`{field}` is required"),
        None => format!("invalid arguments for tool '{tool_name}': {raw}"),
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|fields| fields.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if !required.is_empty() {
        message.push_str(&format!(" (required: {})", required.join(", ")));
    }
    message
}

fn extract_serde_field(message: &str, prefix: &str) -> Option<String> {
    let start = message.find(prefix)? + prefix.len();
    let rest = &message[start..];
    let end = rest.find('`')?;
    let field = rest[..end].trim();
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}
