use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::infra::{
    config::{file_config::FileConfig, AppConfig},
    error::AppError,
};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Config file used when no explicit path is given.
pub fn resolve_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn load(path: Option<&Path>) -> Result<AppConfig, AppError> {
    let config_path = resolve_path(path);

    let mut config = AppConfig::default();

    if !config_path.exists() {
        return Ok(config);
    }

    let raw = fs::read_to_string(&config_path).map_err(|source| AppError::ConfigRead {
        path: config_path.clone(),
        source,
    })?;

    let file_config: FileConfig = toml::from_str(&raw).map_err(|source| AppError::ConfigParse {
        path: config_path,
        source,
    })?;

    file_config.merge_into(&mut config);
    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), AppError> {
    let base_url = config.server.base_url.as_str();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(AppError::ConfigInvalid {
            field: "server.base_url",
            details: "must start with http:// or https://".to_owned(),
        });
    }

    if config.realtime.reconnect_initial_ms == 0
        || config.realtime.reconnect_initial_ms > config.realtime.reconnect_max_ms
    {
        return Err(AppError::ConfigInvalid {
            field: "realtime.reconnect_initial_ms",
            details: "must be positive and not exceed realtime.reconnect_max_ms".to_owned(),
        });
    }

    Ok(())
}
