use std::path::Path;

use crate::{
    api::ApiAdapter,
    infra::{
        self,
        config::{self, resolve_path, AppConfig},
        contracts::TokenStore,
        error::AppError,
        storage_layout::StorageLayout,
    },
    usecases::context::AppContext,
};

/// Where the process talks to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// The TUI owns stdout; logs may go to a file.
    Tui,
    /// One-shot commands print results; logs always go to stderr.
    Cli,
}

pub fn bootstrap(config_path: Option<&Path>, surface: Surface) -> Result<AppContext, AppError> {
    let mut config = load_config(config_path)?;
    if surface == Surface::Cli {
        config.logging.file = false;
    }

    let layout = StorageLayout::resolve()?;
    layout.ensure_dirs()?;
    let logging = infra::logging::init(&config.logging, &layout.logs_dir())?;

    let api = ApiAdapter::new(&config.server).map_err(|error| AppError::Other(error.into()))?;
    let context = AppContext::new(config, resolve_path(config_path), layout, api, logging);
    context.api.set_token(context.token_store.load()?);

    tracing::debug!(
        base_url = context.api.base_url(),
        surface = ?surface,
        "application context ready"
    );
    Ok(context)
}

fn load_config(config_path: Option<&Path>) -> Result<AppConfig, AppError> {
    config::load(config_path)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn loads_default_config_when_file_is_missing() {
        let config = load_config(Some(Path::new("./missing-config.toml")))
            .expect("config should fall back to defaults");

        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[server]\nbase_url = \"https://chat.example.com\"\n\n[ui]\nshow_archived = true\n",
        )
        .expect("write config");

        let config = load_config(Some(&path)).expect("config should load");

        assert_eq!(config.server.base_url, "https://chat.example.com");
        assert!(config.ui.show_archived);
        assert_eq!(config.realtime, AppConfig::default().realtime);
    }
}
