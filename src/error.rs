use thiserror::Error;

/// Message used when the service reports a failure without a `msg`.
pub const GENERIC_FAILURE_MESSAGE: &str = "request failed";

/// ClientError
///
/// Every failure the console can surface. Transport failures (`Transport`, `Timeout`)
/// happen before a response exists; `Rejected` is a response that arrived with
/// `success=false`. Callers that need to tell the two apart use [`ClientError::is_transport`].
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection refused, DNS failure, non-2xx HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The fixed per-call timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// The service answered with `success=false`.
    #[error("{message}")]
    Rejected {
        message: String,
        error_code: Option<String>,
    },

    /// The body was not a valid response envelope.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Persistent session store I/O failed.
    #[error("session store error: {0}")]
    Store(String),

    /// A navigation kept redirecting without settling on a route.
    #[error("navigation to {0} did not settle")]
    NavigationLoop(String),
}

impl ClientError {
    /// Builds a logical failure, substituting the generic message for an empty one.
    pub fn rejected(message: impl Into<String>, error_code: Option<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            GENERIC_FAILURE_MESSAGE.to_string()
        } else {
            message
        };
        ClientError::Rejected {
            message,
            error_code,
        }
    }

    /// True for failures that happened before any response was obtained.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Timeout)
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            ClientError::Rejected { error_code, .. } => error_code.as_deref(),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for ClientError {
    fn from(err: sqlx::Error) -> Self {
        ClientError::Store(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_keeps_message() {
        let err = ClientError::rejected("bad credentials", Some("LOGIN_FAILED".to_string()));
        assert_eq!(err.to_string(), "bad credentials");
        assert_eq!(err.error_code(), Some("LOGIN_FAILED"));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_rejected_falls_back_to_generic_message() {
        let err = ClientError::rejected("  ", None);
        assert_eq!(err.to_string(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_transport_classification() {
        assert!(ClientError::Transport("connection refused".to_string()).is_transport());
        assert!(ClientError::Timeout.is_transport());
        assert!(!ClientError::Store("disk full".to_string()).is_transport());
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("not valid json").unwrap_err();
        let err: ClientError = json_err.into();
        assert!(matches!(err, ClientError::Decode(_)));
        assert!(err.to_string().starts_with("malformed response:"));
    }
}
