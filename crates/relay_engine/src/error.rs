use thiserror::Error;

/// Failure taxonomy surfaced by every relay operation. Nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Missing or unusable input; the mailbox is left untouched.
    #[error("{0}")]
    Validation(String),
    /// The workflow answered with a non-success status.
    #[error("{message} (upstream status {status})")]
    Upstream {
        status: u16,
        message: String,
        body: String,
    },
    /// The workflow answered, but not with the JSON we expected.
    #[error("invalid response from workflow: {details}")]
    UpstreamParse { details: String },
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn validation(message: impl Into<String>) -> Self {
        RelayError::Validation(message.into())
    }

    /// HTTP status the caller should see.
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::Validation(_) => 400,
            RelayError::Upstream { status, .. } => *status,
            RelayError::UpstreamParse { .. } | RelayError::Internal(_) => 500,
        }
    }

    /// Short human-readable message for the `error` field.
    pub fn public_message(&self) -> String {
        match self {
            RelayError::Validation(message) => message.clone(),
            RelayError::Upstream { message, .. } => message.clone(),
            RelayError::UpstreamParse { .. } => "Invalid response from workflow".to_string(),
            RelayError::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Optional extra context for the `details` field.
    pub fn details(&self) -> Option<String> {
        match self {
            RelayError::Validation(_) | RelayError::Upstream { .. } => None,
            RelayError::UpstreamParse { details } => Some(format!(
                "The response could not be parsed as JSON: {details}"
            )),
            RelayError::Internal(message) => Some(message.clone()),
        }
    }
}
