use std::{
    env,
    fs::DirBuilder,
    path::{Path, PathBuf},
};

use crate::infra::error::AppError;

const APP_DIR_NAME: &str = "vchat";

/// On-disk locations owned by the client:
///
/// ```text
/// <config base>/vchat/
///   session/token         bearer token (0600)
///   session/session.lock  single-instance lock
///   logs/vchat.log.*      daily rolling log
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    /// `$XDG_CONFIG_HOME/vchat` when set and non-empty, else the platform config dir.
    pub fn resolve() -> Result<Self, AppError> {
        let base = env::var_os("XDG_CONFIG_HOME")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::config_dir)
            .ok_or_else(|| AppError::StoragePathResolution {
                details: "neither XDG_CONFIG_HOME nor a platform config dir is available".into(),
            })?;

        Ok(Self::at(base.join(APP_DIR_NAME)))
    }

    pub fn at(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn session_dir(&self) -> PathBuf {
        self.root.join("session")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn token_file(&self) -> PathBuf {
        self.session_dir().join("token")
    }

    pub fn session_lock_file(&self) -> PathBuf {
        self.session_dir().join("session.lock")
    }

    /// Creates the tree. The session directory holds the token, so it is
    /// owner-only on unix.
    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        create_dir(&self.root, false)?;
        create_dir(&self.session_dir(), true)?;
        create_dir(&self.logs_dir(), false)
    }
}

fn create_dir(path: &Path, private: bool) -> Result<(), AppError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);

    if private {
        owner_only(&mut builder);
    }

    builder
        .create(path)
        .map_err(|source| AppError::StorageDirCreate {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(unix)]
fn owner_only(builder: &mut DirBuilder) {
    use std::os::unix::fs::DirBuilderExt;
    builder.mode(0o700);
}

#[cfg(not(unix))]
fn owner_only(_builder: &mut DirBuilder) {}
