use serde::Deserialize;

use crate::infra::config::{
    AppConfig, LogConfig, PreferencesConfig, RealtimeConfig, ServerConfig, StartupConfig,
    UiConfig,
};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub server: Option<FileServerConfig>,
    pub realtime: Option<FileRealtimeConfig>,
    pub startup: Option<FileStartupConfig>,
    pub ui: Option<FileUiConfig>,
    pub preferences: Option<FilePreferencesConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(server) = self.server {
            server.merge_into(&mut config.server);
        }

        if let Some(realtime) = self.realtime {
            realtime.merge_into(&mut config.realtime);
        }

        if let Some(startup) = self.startup {
            startup.merge_into(&mut config.startup);
        }

        if let Some(ui) = self.ui {
            ui.merge_into(&mut config.ui);
        }

        if let Some(preferences) = self.preferences {
            preferences.merge_into(&mut config.preferences);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
    pub file: Option<bool>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }

        if let Some(file) = self.file {
            config.file = file;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileServerConfig {
    pub base_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
}

impl FileServerConfig {
    fn merge_into(self, config: &mut ServerConfig) {
        if let Some(base_url) = self.base_url {
            config.base_url = base_url.trim_end_matches('/').to_owned();
        }

        if let Some(timeout_ms) = self.request_timeout_ms {
            config.request_timeout_ms = timeout_ms;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileRealtimeConfig {
    pub path: Option<String>,
    pub reconnect_initial_ms: Option<u64>,
    pub reconnect_max_ms: Option<u64>,
}

impl FileRealtimeConfig {
    fn merge_into(self, config: &mut RealtimeConfig) {
        if let Some(path) = self.path {
            config.path = path;
        }

        if let Some(initial_ms) = self.reconnect_initial_ms {
            config.reconnect_initial_ms = initial_ms;
        }

        if let Some(max_ms) = self.reconnect_max_ms {
            config.reconnect_max_ms = max_ms;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileStartupConfig {
    pub session_probe_timeout_ms: Option<u64>,
}

impl FileStartupConfig {
    fn merge_into(self, config: &mut StartupConfig) {
        if let Some(timeout_ms) = self.session_probe_timeout_ms {
            config.session_probe_timeout_ms = timeout_ms;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileUiConfig {
    pub toast_ttl_ms: Option<u64>,
    pub show_archived: Option<bool>,
}

impl FileUiConfig {
    fn merge_into(self, config: &mut UiConfig) {
        if let Some(ttl_ms) = self.toast_ttl_ms {
            config.toast_ttl_ms = ttl_ms;
        }

        if let Some(show_archived) = self.show_archived {
            config.show_archived = show_archived;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FilePreferencesConfig {
    pub default_model: Option<String>,
}

impl FilePreferencesConfig {
    fn merge_into(self, config: &mut PreferencesConfig) {
        if let Some(model) = self.default_model.filter(|model| !model.trim().is_empty()) {
            config.default_model = Some(model);
        }
    }
}
