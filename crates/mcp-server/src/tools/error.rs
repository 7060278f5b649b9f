use audit_engine::EngineError;
use audit_protocol::{Envelope, ErrorKind};
use thiserror::Error;

pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// Every way a tool invocation can fail. Converted to an [`Envelope`] exactly once.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine answered but reported an in-band failure.
    #[error("{0}")]
    Remote(String),

    #[error("advisory service unavailable: {0}")]
    AdvisoryUnavailable(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Internal(String),
}

impl ToolError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ToolError::InvalidArgument(message.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ToolError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ToolError::Engine(err) if err.is_unavailable() => ErrorKind::ConnectionUnavailable,
            ToolError::Engine(_) | ToolError::Remote(_) => ErrorKind::RemoteCallFailed,
            ToolError::AdvisoryUnavailable(_) => ErrorKind::ConnectionUnavailable,
            ToolError::Io { .. } => ErrorKind::Io,
            ToolError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn into_envelope(self) -> Envelope {
        Envelope::failure(self.kind(), self.to_string())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        ToolError::Internal(format!("failed to serialize result: {err}"))
    }
}

impl From<tokio::task::JoinError> for ToolError {
    fn from(err: tokio::task::JoinError) -> Self {
        ToolError::Internal(format!("background task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn engine_errors_split_by_reachability() {
        let down = ToolError::from(EngineError::Unavailable {
            endpoint: "http://localhost:50051".to_string(),
            message: "connection refused".to_string(),
        });
        assert_eq!(down.kind(), ErrorKind::ConnectionUnavailable);

        let rejected = ToolError::from(EngineError::RemoteCall {
            call: "BuildCallGraph",
            message: "InvalidArgument: no such file".to_string(),
        });
        assert_eq!(rejected.kind(), ErrorKind::RemoteCallFailed);
    }

    #[test]
    fn envelope_carries_kind_and_message() {
        let envelope = ToolError::invalid("sink is required").into_envelope();
        assert!(!envelope.is_success());
        assert_eq!(envelope.error_kind, Some(ErrorKind::InvalidArgument));
        assert_eq!(envelope.error.as_deref(), Some("sink is required"));
        assert!(envelope.data.is_none());
    }

    #[test]
    fn io_errors_keep_their_context() {
        let err = ToolError::io(
            "failed to read src/app.py",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.to_string(), "failed to read src/app.py: denied");
    }
}
