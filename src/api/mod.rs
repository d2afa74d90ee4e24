pub mod client;
pub mod decode;

use serde::Deserialize;
use tracing::{info, instrument};

pub use client::{ApiClient, AuthMode};

use crate::error::ClientError;

#[derive(Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// `GET /health/` liveness probe.
#[instrument(skip(api))]
pub async fn health(api: &ApiClient) -> Result<HealthStatus, ClientError> {
    let status: HealthStatus = api.get_json("/health/", AuthMode::Anonymous).await?;
    info!(status = %status.status, "backend health");
    Ok(status)
}
