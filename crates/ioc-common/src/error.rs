//! Error types for IOC ingestion

use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Main error type for the ingestion pipeline
///
/// Every variant except the per-indicator ones ([`IngestError::is_per_object`])
/// is fatal for a run and leaves the persisted cursor untouched, so the next
/// invocation resumes from the last checkpoint.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Checkpoint store failed for a reason other than "no value yet"
    #[error("Checkpoint unavailable: {0}")]
    CheckpointUnavailable(String),

    /// Source feed answered with a non-success status
    #[error("Feed request failed with status {status}: {body}")]
    FetchFailed { status: u16, body: String },

    /// IPv4 indicator whose name carries no dotted quad
    #[error("Malformed indicator {id}: no IPv4 address in '{name}'")]
    MalformedIndicator { id: String, name: String },

    /// Supported indicator whose shape does not decode
    #[error("Invalid indicator {id}: {reason}")]
    InvalidIndicator { id: String, reason: String },

    /// Ingestion endpoint rejected a batch
    #[error("Upload failed with status {status}: {body}")]
    UploadFailed { status: u16, body: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    /// Create a checkpoint error
    pub fn checkpoint(msg: impl Into<String>) -> Self {
        Self::CheckpointUnavailable(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Status and body reported by a remote endpoint, if the error carries one
    pub fn remote_response(&self) -> Option<(u16, &str)> {
        match self {
            Self::FetchFailed { status, body } | Self::UploadFailed { status, body } => {
                Some((*status, body.as_str()))
            },
            _ => None,
        }
    }

    /// Whether the error only concerns a single indicator
    pub fn is_per_object(&self) -> bool {
        matches!(
            self,
            Self::MalformedIndicator { .. } | Self::InvalidIndicator { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_failed_exposes_status_and_body() {
        let err = IngestError::UploadFailed {
            status: 500,
            body: "backend unavailable".to_string(),
        };
        assert_eq!(err.remote_response(), Some((500, "backend unavailable")));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_checkpoint_error_has_no_remote_response() {
        let err = IngestError::checkpoint("permission denied");
        assert!(err.remote_response().is_none());
        assert_eq!(err.to_string(), "Checkpoint unavailable: permission denied");
    }

    #[test]
    fn test_only_indicator_errors_are_per_object() {
        let malformed = IngestError::MalformedIndicator {
            id: "indicator--1".to_string(),
            name: "no address".to_string(),
        };
        let invalid = IngestError::InvalidIndicator {
            id: "indicator--2".to_string(),
            reason: "missing field `pattern`".to_string(),
        };
        assert!(malformed.is_per_object());
        assert!(invalid.is_per_object());
        assert!(!IngestError::config("x").is_per_object());
        assert!(!IngestError::FetchFailed {
            status: 502,
            body: String::new()
        }
        .is_per_object());
    }
}
