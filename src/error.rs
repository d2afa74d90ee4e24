use reqwest::StatusCode;
use thiserror::Error;

use crate::navigation::Navigation;

/// Errors surfaced by the client library.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("network error on {endpoint}: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("session expired on {endpoint}, please log in again")]
    Unauthorized { endpoint: String },

    #[error("access denied on {endpoint}: {message}")]
    Forbidden { endpoint: String, message: String },

    #[error("{endpoint} not found")]
    NotFound { endpoint: String },

    #[error("server returned {status} on {endpoint}: {message}")]
    Status {
        endpoint: String,
        status: StatusCode,
        message: String,
    },

    #[error("server returned an HTML page on {endpoint}; check the API base URL")]
    HtmlResponse { endpoint: String },

    #[error("could not parse response from {endpoint}: {message}")]
    Parse { endpoint: String, message: String },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    Validation(String),

    #[error("session store error: {0}")]
    Store(String),

    #[error("cannot access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// Where the user should be sent after this error, if anywhere.
    pub fn navigation(&self) -> Option<Navigation> {
        match self {
            ClientError::Unauthorized { .. } | ClientError::Forbidden { .. } => {
                Some(Navigation::Login)
            }
            _ => None,
        }
    }

    /// Failures the user may retry by hand (network blips, bad gateway pages).
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network { .. }
            | ClientError::HtmlResponse { .. }
            | ClientError::Parse { .. } => true,
            ClientError::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        ClientError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_routes_to_login() {
        let err = ClientError::Unauthorized {
            endpoint: "/documents/".into(),
        };
        assert_eq!(err.navigation(), Some(Navigation::Login));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("/documents/"));
    }

    #[test]
    fn server_errors_are_retryable_client_errors_are_not() {
        let server = ClientError::Status {
            endpoint: "/analyze/".into(),
            status: StatusCode::BAD_GATEWAY,
            message: "bad gateway".into(),
        };
        let client = ClientError::Status {
            endpoint: "/analyze/".into(),
            status: StatusCode::BAD_REQUEST,
            message: "No file provided".into(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert_eq!(client.navigation(), None);
    }
}
