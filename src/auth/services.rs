use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Method, StatusCode};
use tracing::{error, info, instrument, warn};

use crate::{
    api::{decode, ApiClient, AuthMode},
    auth::dto::{AuthResponse, CredentialsRequest},
    error::ClientError,
    navigation::Navigation,
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> Result<String, ClientError> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ClientError::Validation("Invalid email".into()));
    }
    Ok(email)
}

#[instrument(skip(api, password))]
pub async fn login(api: &ApiClient, email: &str, password: &str) -> Result<Navigation, ClientError> {
    let email = normalize_email(email)?;
    if password.is_empty() {
        return Err(ClientError::Validation("Password is required".into()));
    }
    exchange_credentials(api, "/auth/login/", &email, password, "Login failed").await?;
    info!(email = %email, "user logged in");
    Ok(Navigation::Dashboard)
}

#[instrument(skip(api, password))]
pub async fn register(
    api: &ApiClient,
    email: &str,
    password: &str,
) -> Result<Navigation, ClientError> {
    let email = normalize_email(email)?;
    if password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ClientError::Validation("Password too short".into()));
    }
    exchange_credentials(api, "/auth/register/", &email, password, "Registration failed").await?;
    info!(email = %email, "user registered");
    Ok(Navigation::Dashboard)
}

async fn exchange_credentials(
    api: &ApiClient,
    endpoint: &str,
    email: &str,
    password: &str,
    fallback: &str,
) -> Result<(), ClientError> {
    let body = CredentialsRequest {
        email,
        password,
        username: email,
    };
    let resp = api
        .send(Method::POST, endpoint, AuthMode::Anonymous, |r| r.json(&body))
        .await?;

    let status = resp.status();
    // Bad credentials come back as 400/401 with an `{error}` body; anything
    // else (404 page from a wrong base URL, 5xx) goes through the usual mapping.
    if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) {
        let text = resp.text().await.map_err(|e| ClientError::Network {
            endpoint: endpoint.to_string(),
            source: e,
        })?;
        if decode::looks_like_html(&text) {
            return Err(decode::status_error(endpoint, status, &text));
        }
        let message = decode::error_message(&text).unwrap_or_else(|| fallback.to_string());
        warn!(endpoint, %status, message = %message, "credentials rejected");
        return Err(ClientError::Validation(message));
    }

    let auth: AuthResponse = decode::read_json(endpoint, resp).await?;
    if auth.token.is_empty() {
        error!(endpoint, "backend returned an empty token");
        return Err(ClientError::InvalidPayload("empty token".into()));
    }
    api.sessions().save(&auth.token, &auth.user_summary(email))?;
    Ok(())
}

/// Tells the backend the token is done with, then always drops the local session.
#[instrument(skip(api))]
pub async fn logout(api: &ApiClient) -> Result<Navigation, ClientError> {
    match api.sessions().token() {
        Ok(Some(_)) => {
            match api
                .send(Method::POST, "/auth/logout/", AuthMode::Required, |r| r)
                .await
            {
                Ok(resp) if resp.status().is_success() => info!("backend session closed"),
                Ok(resp) => warn!(status = %resp.status(), "logout call rejected; ignoring"),
                Err(e) => warn!(error = %e, "logout call failed; ignoring"),
            }
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "could not read token before logout"),
    }
    api.sessions().clear()?;
    Ok(Navigation::Entry)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{routing::post, Json, Router};
    use serde_json::{json, Value};

    use super::*;
    use crate::session::{SessionManager, UserSummary};
    use crate::storage::FileStore;
    use crate::testing::{client_for, spawn_backend};

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.com"));
        assert_eq!(normalize_email("  A@B.com ").unwrap(), "a@b.com");
    }

    #[tokio::test]
    async fn login_persists_session_and_goes_to_dashboard() {
        let app = Router::new().route(
            "/api/auth/login/",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["email"], "a@b.com");
                assert_eq!(body["password"], "x");
                assert_eq!(body["username"], "a@b.com");
                Json(json!({ "token": "T1", "username": "a@b.com", "email": "a@b.com" }))
            }),
        );
        let base = spawn_backend(app).await;
        let api = client_for(&base);

        let next = login(&api, "a@b.com", "x").await.unwrap();
        assert_eq!(next, Navigation::Dashboard);

        let session = api.sessions().load().unwrap().expect("session");
        assert_eq!(session.token, "T1");
        assert_eq!(
            session.user,
            Some(UserSummary {
                username: "a@b.com".into(),
                email: "a@b.com".into(),
            })
        );
    }

    #[tokio::test]
    async fn rejected_login_surfaces_backend_message() {
        let app = Router::new().route(
            "/api/auth/login/",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "Invalid credentials" })),
                )
            }),
        );
        let base = spawn_backend(app).await;
        let api = client_for(&base);

        let err = login(&api, "a@b.com", "bad").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(api.sessions().load().unwrap(), None);
    }

    #[tokio::test]
    async fn misrouted_login_is_not_reported_as_bad_credentials() {
        let app = Router::new().route(
            "/api/auth/login/",
            post(|| async {
                (
                    StatusCode::NOT_FOUND,
                    axum::response::Html("<!DOCTYPE html><html><body>Not Found</body></html>"),
                )
            }),
        );
        let api = client_for(&spawn_backend(app).await);

        let err = login(&api, "a@b.com", "x").await.unwrap_err();
        assert!(matches!(err, ClientError::HtmlResponse { .. }), "{err:?}");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn register_rejects_short_password_locally() {
        let api = client_for("http://127.0.0.1:1/api");
        let err = register(&api, "a@b.com", "short").await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn logout_clears_session_even_when_backend_is_down() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let api = client_for(&format!("http://{}/api", addr));
        api.sessions()
            .save(
                "T1",
                &UserSummary {
                    username: "u".into(),
                    email: "u@x.io".into(),
                },
            )
            .unwrap();

        let next = logout(&api).await.unwrap();
        assert_eq!(next, Navigation::Entry);
        assert_eq!(api.sessions().token().unwrap(), None);
        assert_eq!(api.sessions().user().unwrap(), None);
    }

    #[tokio::test]
    async fn logout_recovers_from_corrupt_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, r#"{"cc_token":"T1","cc_us"#).unwrap();
        let sessions = SessionManager::new(Arc::new(FileStore::new(&path)));
        let api = ApiClient::new("http://127.0.0.1:1/api", Duration::from_secs(1), sessions).unwrap();

        assert_eq!(logout(&api).await.unwrap(), Navigation::Entry);
        assert_eq!(api.sessions().token().unwrap(), None);
        assert!(!std::fs::read_to_string(&path).unwrap().contains("T1"));
    }

    #[tokio::test]
    async fn logout_notifies_backend_with_token() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/api/auth/logout/",
            post(move |headers: axum::http::HeaderMap| {
                let counter = counter.clone();
                async move {
                    assert_eq!(headers["authorization"], "Token T1");
                    counter.fetch_add(1, Ordering::SeqCst);
                    StatusCode::OK
                }
            }),
        );
        let base = spawn_backend(app).await;
        let api = client_for(&base);
        api.sessions()
            .save(
                "T1",
                &UserSummary {
                    username: "u".into(),
                    email: "u@x.io".into(),
                },
            )
            .unwrap();

        logout(&api).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!api.sessions().is_authenticated());
    }
}
