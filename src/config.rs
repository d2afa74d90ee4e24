use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use reqwest::Url;

pub const LOCAL_API_URL: &str = "http://127.0.0.1:8000/api";
pub const PRODUCTION_API_URL: &str = "https://contractcheck.ru/api";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_url: String,
    pub session_file: PathBuf,
    pub poll_interval_ms: u64,
    pub http_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url = match std::env::var("CC_API_URL") {
            Ok(url) => url,
            Err(_) => api_url_for_origin(
                &std::env::var("CC_ORIGIN").unwrap_or_else(|_| "http://localhost".into()),
            )
            .to_string(),
        };
        let api_url = normalize_base_url(&api_url)?;

        let session_file = match std::env::var("CC_SESSION_FILE") {
            Ok(p) => PathBuf::from(p),
            Err(_) => default_session_file(),
        };

        Ok(Self {
            api_url,
            session_file,
            poll_interval_ms: positive_var("CC_POLL_INTERVAL_MS", 5000)?,
            http_timeout_secs: positive_var("CC_HTTP_TIMEOUT_SECS", 120)?,
        })
    }

    pub fn with_api_url(mut self, url: &str) -> anyhow::Result<Self> {
        self.api_url = normalize_base_url(url)?;
        Ok(self)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Local development origins talk to the dev backend, everything else to production.
pub fn api_url_for_origin(origin: &str) -> &'static str {
    if origin.contains("localhost") || origin.contains("127.0.0.1") {
        LOCAL_API_URL
    } else {
        PRODUCTION_API_URL
    }
}

fn positive_var(name: &str, default: u64) -> anyhow::Result<u64> {
    parse_positive(name, std::env::var(name).ok().as_deref(), default)
}

/// Unset or blank falls back to `default`; zero is rejected.
fn parse_positive(name: &str, raw: Option<&str>, default: u64) -> anyhow::Result<u64> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(default),
        Some(v) => v,
    };
    let value: u64 = raw
        .parse()
        .with_context(|| format!("{} must be a positive integer, got {:?}", name, raw))?;
    if value == 0 {
        anyhow::bail!("{} must be greater than zero", name);
    }
    Ok(value)
}

fn normalize_base_url(url: &str) -> anyhow::Result<String> {
    Url::parse(url).with_context(|| format!("invalid API base URL {}", url))?;
    Ok(url.trim_end_matches('/').to_string())
}

fn default_session_file() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".contractcheck").join("session.json")
}
