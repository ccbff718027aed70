use reqwest::StatusCode;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Rejected credentials (HTTP {0})")]
    Unauthorized(u16),
    #[error("Unexpected status: HTTP {0}")]
    Status(u16),
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("No answer within {0:?}")]
    Timeout(Duration),
}

impl SourceError {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(status.as_u16()),
            _ => Self::Status(status.as_u16()),
        }
    }
}
