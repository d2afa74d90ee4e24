use serde::{Deserialize, Serialize};

use crate::session::UserSummary;

/// Request body for both login and registration.
///
/// The backend keys accounts by username, so the email doubles as one.
#[derive(Debug, Serialize)]
pub struct CredentialsRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub username: &'a str,
}

/// Response returned after login or register.
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl AuthResponse {
    /// Cached summary, falling back to the submitted email for missing fields.
    pub fn user_summary(&self, submitted_email: &str) -> UserSummary {
        let email = self
            .email
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| submitted_email.to_string());
        UserSummary {
            username: self
                .username
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| email.clone()),
            email,
        }
    }
}
