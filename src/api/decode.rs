use bytes::Bytes;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::ClientError;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    detail: Option<String>,
}

/// Parses a body that should be JSON, telling HTML error pages apart from garbage.
pub fn parse_body<T: DeserializeOwned>(endpoint: &str, text: &str) -> Result<T, ClientError> {
    serde_json::from_str(text).map_err(|e| {
        if looks_like_html(text) {
            error!(endpoint, "expected JSON, got an HTML page");
            ClientError::HtmlResponse {
                endpoint: endpoint.to_string(),
            }
        } else {
            error!(endpoint, error = %e, "response is not valid JSON");
            ClientError::Parse {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            }
        }
    })
}

/// Application-level `{error}` / `{detail}` message carried by an error body.
pub fn error_message(text: &str) -> Option<String> {
    let body: ErrorBody = serde_json::from_str(text).ok()?;
    body.error.or(body.detail).filter(|m| !m.is_empty())
}

/// Reads the body of a finished request and maps non-2xx statuses onto [`ClientError`].
pub async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    resp: Response,
) -> Result<T, ClientError> {
    let text = read_success_text(endpoint, resp).await?;
    parse_body(endpoint, &text)
}

/// Like [`read_json`] but ignores the body of a successful response.
pub async fn read_empty(endpoint: &str, resp: Response) -> Result<(), ClientError> {
    read_success_text(endpoint, resp).await.map(|_| ())
}

/// Body of a successful file download; error statuses map like JSON calls.
pub async fn read_bytes(endpoint: &str, resp: Response) -> Result<Bytes, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.map_err(|e| network(endpoint, e))?;
        return Err(status_error(endpoint, status, &text));
    }
    let body = resp.bytes().await.map_err(|e| network(endpoint, e))?;
    debug!(endpoint, %status, bytes = body.len(), "file received");
    Ok(body)
}

fn network(endpoint: &str, source: reqwest::Error) -> ClientError {
    ClientError::Network {
        endpoint: endpoint.to_string(),
        source,
    }
}

async fn read_success_text(endpoint: &str, resp: Response) -> Result<String, ClientError> {
    let status = resp.status();
    let text = resp.text().await.map_err(|e| network(endpoint, e))?;
    debug!(endpoint, %status, bytes = text.len(), "response received");

    if status.is_success() {
        return Ok(text);
    }
    Err(status_error(endpoint, status, &text))
}

pub fn status_error(endpoint: &str, status: StatusCode, text: &str) -> ClientError {
    let message = error_message(text).unwrap_or_else(|| {
        if looks_like_html(text) {
            "server returned an HTML error page".to_string()
        } else {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        }
    });
    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized {
            endpoint: endpoint.to_string(),
        },
        StatusCode::FORBIDDEN => ClientError::Forbidden {
            endpoint: endpoint.to_string(),
            message,
        },
        // An HTML 404 comes from whatever serves the host, not the API.
        StatusCode::NOT_FOUND if looks_like_html(text) => {
            error!(endpoint, "404 page is HTML, base URL looks wrong");
            ClientError::HtmlResponse {
                endpoint: endpoint.to_string(),
            }
        }
        StatusCode::NOT_FOUND => ClientError::NotFound {
            endpoint: endpoint.to_string(),
        },
        _ => ClientError::Status {
            endpoint: endpoint.to_string(),
            status,
            message,
        },
    }
}

pub fn looks_like_html(text: &str) -> bool {
    let lower: String = text
        .trim_start()
        .chars()
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    lower.starts_with("<!doctype html") || lower.starts_with("<html")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Health {
        status: String,
    }

    #[test]
    fn parses_json_body() {
        let h: Health = parse_body("/health/", r#"{"status":"ok"}"#).unwrap();
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn html_page_is_reported_as_misrouted() {
        let err = parse_body::<Health>("/health/", "<!DOCTYPE html><html></html>").unwrap_err();
        assert!(matches!(err, ClientError::HtmlResponse { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = parse_body::<Health>("/health/", "oops").unwrap_err();
        assert!(matches!(err, ClientError::Parse { .. }));
    }

    #[test]
    fn error_payload_message_is_surfaced() {
        let err = status_error(
            "/analyze/",
            StatusCode::BAD_REQUEST,
            r#"{"error":"No file provided"}"#,
        );
        match err {
            ClientError::Status {
                status, message, ..
            } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "No file provided");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            status_error("/x/", StatusCode::UNAUTHORIZED, ""),
            ClientError::Unauthorized { .. }
        ));
        assert!(matches!(
            status_error("/x/", StatusCode::NOT_FOUND, r#"{"detail":"Not found."}"#),
            ClientError::NotFound { .. }
        ));
        assert!(matches!(
            status_error("/x/", StatusCode::NOT_FOUND, "<html>"),
            ClientError::HtmlResponse { .. }
        ));
        match status_error("/x/", StatusCode::FORBIDDEN, r#"{"detail":"Limit reached"}"#) {
            ClientError::Forbidden { message, .. } => assert_eq!(message, "Limit reached"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
