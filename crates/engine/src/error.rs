use thiserror::Error;
use tonic::{Code, Status};

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("analysis engine unavailable at {endpoint}: {message}")]
    Unavailable { endpoint: String, message: String },

    #[error("analysis engine call {call} failed: {message}")]
    RemoteCall { call: &'static str, message: String },
}

impl EngineError {
    /// Classify a gRPC status: transport-level codes mean the engine could not be reached,
    /// everything else is a failure reported by the engine itself.
    pub fn from_status(call: &'static str, endpoint: &str, status: Status) -> Self {
        match status.code() {
            Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled | Code::Unknown => {
                EngineError::Unavailable {
                    endpoint: endpoint.to_string(),
                    message: format!("{call}: {}", status_message(&status)),
                }
            }
            _ => EngineError::RemoteCall {
                call,
                message: status_message(&status),
            },
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, EngineError::Unavailable { .. })
    }
}

fn status_message(status: &Status) -> String {
    let message = status.message().trim();
    if message.is_empty() {
        format!("{:?}", status.code())
    } else {
        format!("{:?}: {message}", status.code())
    }
}
