//! Fake backend plumbing shared by the unit tests.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::api::ApiClient;
use crate::session::SessionManager;
use crate::storage::MemoryStore;

/// Serves `app` on an ephemeral port and returns the API base URL (`.../api`).
pub async fn spawn_backend(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test backend");
    });
    format!("http://{}/api", addr)
}

pub fn client_for(base: &str) -> ApiClient {
    let sessions = SessionManager::new(Arc::new(MemoryStore::default()));
    ApiClient::new(base, Duration::from_secs(5), sessions).expect("client")
}
