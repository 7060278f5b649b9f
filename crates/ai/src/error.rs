use thiserror::Error;

pub type Result<T> = std::result::Result<T, AiError>;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("engine returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid engine response: {0}")]
    InvalidResponse(String),
}
