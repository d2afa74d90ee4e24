use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::session::SessionManager;
use crate::storage::{FileStore, KeyValueStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub api: ApiClient,
}

impl AppState {
    pub fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(FileStore::new(&config.session_file)) as Arc<dyn KeyValueStore>;
        Self::from_parts(Arc::new(config), store)
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        let api = ApiClient::new(
            &config.api_url,
            config.http_timeout(),
            SessionManager::new(store),
        )?;
        Ok(Self { config, api })
    }
}
