use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type UploadResult<T> = Result<T, UploadError>;

/// Errors raised synchronously, before any upload request is sent.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid upload context: {0}")]
    InvalidContext(String),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl UploadError {
    pub fn config(msg: impl Into<String>) -> Self {
        UploadError::Config(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UploadError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Per-file failure while talking to the upload endpoint.
///
/// These never escape the orchestrator; their `Display` text becomes the
/// failure reason of the matching outcome.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Network(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("{0}")]
    Rejected(String),

    #[error("response did not contain an identifier")]
    MissingReference,

    #[error("invalid response: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(timeout)
        } else {
            TransportError::Network(err.to_string())
        }
    }

    pub fn status(status: u16, message: Option<String>) -> Self {
        TransportError::Status {
            status,
            message: message.unwrap_or_else(|| format!("upload failed with status {}", status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_falls_back_to_code() {
        let err = TransportError::status(502, None);
        assert_eq!(err.to_string(), "upload failed with status 502");

        let err = TransportError::status(400, Some("bad gestion".into()));
        assert_eq!(err.to_string(), "bad gestion");
    }

    #[test]
    fn timeout_message_names_the_limit() {
        let err = TransportError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "request timed out after 30s");
    }

    #[test]
    fn invalid_request_is_not_a_network_error() {
        let err = TransportError::InvalidRequest("invalid MIME type: bad".into());
        assert_eq!(err.to_string(), "invalid request: invalid MIME type: bad");
        assert!(!matches!(err, TransportError::Network(_)));
    }
}
