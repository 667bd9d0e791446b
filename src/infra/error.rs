use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config value for {field}: {details}")]
    ConfigInvalid { field: &'static str, details: String },
    #[error("failed to initialize logging: {0}")]
    LoggingInit(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("failed to resolve storage path: {details}")]
    StoragePathResolution { details: String },
    #[error("failed to create storage directory {path}: {source}")]
    StorageDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session store at {path} is used by another vchat process")]
    SessionStoreBusy { path: PathBuf },
    #[error("failed to create session lock at {path}: {source}")]
    SessionLockCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to access token file at {path}: {source}")]
    TokenStore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to update preferences in {path}: {details}")]
    PreferencesWrite { path: PathBuf, details: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
