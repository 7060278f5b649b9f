use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ENVELOPE_SCHEMA_VERSION: u32 = 1;

/// Coarse failure category carried by a failed [`Envelope`].
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The engine channel could not be established or the call failed at the transport level.
    ConnectionUnavailable,
    /// The engine answered, but reported an application-level failure.
    RemoteCallFailed,
    /// A preferred backend mode is missing a credential or component.
    NotConfigured,
    /// A required argument is missing or malformed.
    InvalidArgument,
    Io,
    Internal,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ConnectionUnavailable => "connection_unavailable",
            ErrorKind::RemoteCallFailed => "remote_call_failed",
            ErrorKind::NotConfigured => "not_configured",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Io => "io",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform result of every tool invocation.
///
/// A successful envelope carries `data`; a failed one carries `error` and `error_kind`.
/// The two halves are never populated together.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl Envelope {
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = kind.as_str().to_string();
        }
        Self {
            success: false,
            data: None,
            error: Some(message),
            error_kind: Some(kind),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|err| {
            format!(
                "{{\"success\":false,\"error\":\"envelope serialization failed: {err}\",\"error_kind\":\"internal\"}}"
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn failure_populates_error_and_kind_only() {
        let envelope = Envelope::failure(ErrorKind::InvalidArgument, "missing `path`");
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.error.as_deref(), Some("missing `path`"));
        assert_eq!(envelope.error_kind, Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn blank_failure_message_falls_back_to_kind_name() {
        let envelope = Envelope::failure(ErrorKind::RemoteCallFailed, "  ");
        assert_eq!(envelope.error.as_deref(), Some("remote_call_failed"));
    }

    #[test]
    fn success_serializes_without_error_fields() {
        let envelope = Envelope::success(json!({ "files_scanned": 0 }));
        let raw = envelope.to_json_string();
        assert_eq!(raw, r#"{"success":true,"data":{"files_scanned":0}}"#);
    }

    #[test]
    fn error_kind_uses_snake_case_on_the_wire() {
        let envelope = Envelope::failure(ErrorKind::ConnectionUnavailable, "engine down");
        let value = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(value["error_kind"], json!("connection_unavailable"));
        let back: Envelope = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, envelope);
    }
}
