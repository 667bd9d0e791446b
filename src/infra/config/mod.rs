mod app_config;
mod file_config;
mod loader;

pub use app_config::{
    AppConfig, LogConfig, PreferencesConfig, RealtimeConfig, ServerConfig, StartupConfig,
    UiConfig,
};
pub use loader::{load, resolve_path};
