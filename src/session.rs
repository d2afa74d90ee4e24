use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ClientError;
use crate::storage::KeyValueStore;

pub const TOKEN_KEY: &str = "cc_token";
pub const USER_KEY: &str = "cc_user";

/// Cached summary of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: Option<UserSummary>,
}

/// Reads and writes the session entries of a [`KeyValueStore`].
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn token(&self) -> Result<Option<String>, ClientError> {
        Ok(self.store.get(TOKEN_KEY)?.filter(|t| !t.is_empty()))
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.token(), Ok(Some(_)))
    }

    pub fn user(&self) -> Result<Option<UserSummary>, ClientError> {
        let Some(raw) = self.store.get(USER_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                // A garbled summary is not worth failing a command over.
                warn!(error = %e, "cached user summary unreadable");
                Ok(None)
            }
        }
    }

    pub fn load(&self) -> Result<Option<Session>, ClientError> {
        let Some(token) = self.token()? else {
            return Ok(None);
        };
        Ok(Some(Session {
            token,
            user: self.user()?,
        }))
    }

    pub fn save(&self, token: &str, user: &UserSummary) -> Result<(), ClientError> {
        let user_json = serde_json::to_string(user)
            .map_err(|e| ClientError::Store(format!("encode user summary: {}", e)))?;
        self.store.set(TOKEN_KEY, token)?;
        self.store.set(USER_KEY, &user_json)?;
        info!(username = %user.username, "session saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        self.store.remove(TOKEN_KEY)?;
        self.store.remove(USER_KEY)?;
        info!("session cleared");
        Ok(())
    }
}
