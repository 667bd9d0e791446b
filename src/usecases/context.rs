use std::path::PathBuf;

use crate::{
    api::ApiAdapter,
    infra::{
        config::AppConfig, logging::LoggingGuard, preferences::FilePreferencesStore,
        storage_layout::StorageLayout, token_store::FileTokenStore,
    },
};

#[derive(Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub layout: StorageLayout,
    pub api: ApiAdapter,
    pub token_store: FileTokenStore,
    pub preferences: FilePreferencesStore,
    _logging: LoggingGuard,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        config_path: PathBuf,
        layout: StorageLayout,
        api: ApiAdapter,
        logging: LoggingGuard,
    ) -> Self {
        Self {
            token_store: FileTokenStore::new(layout.token_file()),
            preferences: FilePreferencesStore::new(config_path),
            config,
            layout,
            api,
            _logging: logging,
        }
    }
}
