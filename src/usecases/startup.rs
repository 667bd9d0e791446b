use std::{
    fs::{File, OpenOptions},
    io::ErrorKind,
    path::PathBuf,
    time::Duration,
};

use fs2::FileExt;

use crate::{
    domain::user::User,
    infra::{
        contracts::TokenStore, error::AppError, storage_layout::StorageLayout,
        token_store::token_is_fresh,
    },
};

use super::contracts::SourceError;

const STARTUP_TOKEN_EXPIRED: &str = "STARTUP_TOKEN_EXPIRED";
const STARTUP_SESSION_REJECTED: &str = "STARTUP_SESSION_REJECTED";
const STARTUP_PROBE_UNAVAILABLE: &str = "STARTUP_SESSION_PROBE_UNAVAILABLE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidedAuthReason {
    NoToken,
    TokenExpired,
    SessionRejected,
}

impl GuidedAuthReason {
    pub fn as_message(self) -> &'static str {
        match self {
            Self::NoToken => "No saved session.",
            Self::TokenExpired => "Saved session has expired.",
            Self::SessionRejected => "The server no longer accepts the saved session.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupFlowState {
    LaunchTui,
    GuidedAuth { reason: GuidedAuthReason },
}

/// Checks a stored token against the server within a deadline.
pub trait SessionProbe {
    fn probe_session(&self, token: &str, timeout: Duration) -> Result<User, SourceError>;
}

/// Exclusive lock on the session directory, released when dropped.
#[derive(Debug)]
pub struct SessionLockGuard {
    file: File,
}

impl Drop for SessionLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

pub struct StartupPlan {
    pub layout: StorageLayout,
    pub lock_guard: SessionLockGuard,
    pub state: StartupFlowState,
}

pub fn plan_startup(
    layout: StorageLayout,
    token_store: &dyn TokenStore,
    probe: &dyn SessionProbe,
    probe_timeout: Duration,
    now_unix_s: i64,
) -> Result<StartupPlan, AppError> {
    layout.ensure_dirs()?;
    let lock_guard = acquire_session_lock(layout.session_lock_file())?;
    let state = plan_session(token_store, probe, probe_timeout, now_unix_s)?;

    Ok(StartupPlan {
        layout,
        lock_guard,
        state,
    })
}

/// Decides whether the stored token is good enough to open the TUI.
///
/// An unreachable server does not force a new sign-in: the TUI opens and reports
/// the outage itself.
pub fn plan_session(
    token_store: &dyn TokenStore,
    probe: &dyn SessionProbe,
    probe_timeout: Duration,
    now_unix_s: i64,
) -> Result<StartupFlowState, AppError> {
    let Some(token) = token_store.load()? else {
        return Ok(StartupFlowState::GuidedAuth {
            reason: GuidedAuthReason::NoToken,
        });
    };

    if !token_is_fresh(&token, now_unix_s) {
        tracing::info!(code = STARTUP_TOKEN_EXPIRED, "stored token has expired");
        token_store.clear()?;
        return Ok(StartupFlowState::GuidedAuth {
            reason: GuidedAuthReason::TokenExpired,
        });
    }

    match probe.probe_session(&token, probe_timeout) {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "stored session accepted");
            Ok(StartupFlowState::LaunchTui)
        }
        Err(SourceError::Unauthorized) => {
            tracing::info!(code = STARTUP_SESSION_REJECTED, "server rejected stored token");
            token_store.clear()?;
            Ok(StartupFlowState::GuidedAuth {
                reason: GuidedAuthReason::SessionRejected,
            })
        }
        Err(error) => {
            tracing::warn!(
                code = STARTUP_PROBE_UNAVAILABLE,
                error = ?error,
                "session probe failed, opening with stored token"
            );
            Ok(StartupFlowState::LaunchTui)
        }
    }
}

pub fn acquire_session_lock(path: PathBuf) -> Result<SessionLockGuard, AppError> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .map_err(|source| AppError::SessionLockCreate {
            path: path.clone(),
            source,
        })?;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(SessionLockGuard { file }),
        Err(source) if source.kind() == ErrorKind::WouldBlock => {
            Err(AppError::SessionStoreBusy { path })
        }
        Err(source) if source.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(AppError::SessionStoreBusy { path })
        }
        Err(source) => Err(AppError::SessionLockCreate { path, source }),
    }
}
