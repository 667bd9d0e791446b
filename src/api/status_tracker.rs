use std::sync::{Arc, Mutex};

use crate::{
    domain::status::{
        now_unix_ms, AuthConnectivityStatus, AuthStatus, ConnectivityHealth, StatusError,
    },
    infra::secrets::sanitize_error_code,
    usecases::guided_auth::AuthBackendError,
};

use super::error::ApiError;

/// Sign-in progress and REST health, shared by every clone.
#[derive(Clone, Debug)]
pub struct StatusTracker {
    inner: Arc<Mutex<AuthConnectivityStatus>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(AuthConnectivityStatus::default())),
        }
    }

    pub fn snapshot(&self) -> AuthConnectivityStatus {
        self.inner
            .lock()
            .map(|snapshot| snapshot.clone())
            .unwrap_or_default()
    }

    pub fn on_request_succeeded(&self) {
        self.mutate(|snapshot| {
            snapshot.connectivity = ConnectivityHealth::Ok;
        });
    }

    pub fn on_request_failed(&self, error: &ApiError) {
        self.mutate(|snapshot| {
            snapshot.connectivity = map_request_error(error);
            if matches!(error, ApiError::Unauthorized) {
                snapshot.auth = AuthStatus::NotStarted;
            }
            snapshot.last_error = Some(StatusError {
                code: error.code().to_owned(),
                at_unix_ms: now_unix_ms(),
            });
        });
    }

    pub fn on_auth_start(&self) {
        self.mutate(|snapshot| {
            snapshot.auth = AuthStatus::InProgress;
            snapshot.last_error = None;
        });
    }

    pub fn on_auth_success(&self) {
        self.mutate(|snapshot| {
            snapshot.auth = AuthStatus::Success;
            snapshot.connectivity = ConnectivityHealth::Ok;
            snapshot.last_error = None;
        });
    }

    pub fn on_auth_error(&self, error: &AuthBackendError) {
        self.mutate(|snapshot| {
            snapshot.auth = map_auth_error(error);
            snapshot.last_error = Some(StatusError {
                code: auth_error_code(error),
                at_unix_ms: now_unix_ms(),
            });
        });
    }

    pub fn on_logout_reset(&self) {
        self.mutate(|snapshot| {
            snapshot.auth = AuthStatus::NotStarted;
            snapshot.connectivity = ConnectivityHealth::Unknown;
            snapshot.last_error = None;
        });
    }

    fn mutate<F>(&self, mutator: F)
    where
        F: FnOnce(&mut AuthConnectivityStatus),
    {
        if let Ok(mut snapshot) = self.inner.lock() {
            mutator(&mut snapshot);
            snapshot.updated_at_unix_ms = now_unix_ms();
        }
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn map_request_error(error: &ApiError) -> ConnectivityHealth {
    match error {
        ApiError::Transport(_) => ConnectivityHealth::Unavailable,
        ApiError::Server { status, .. } if *status >= 500 => ConnectivityHealth::Degraded,
        _ => ConnectivityHealth::Ok,
    }
}

fn map_auth_error(error: &AuthBackendError) -> AuthStatus {
    if matches!(
        error,
        AuthBackendError::Transient {
            code: "AUTH_BACKEND_UNAVAILABLE",
            ..
        }
    ) {
        return AuthStatus::FatalFailure;
    }

    AuthStatus::TransientFailure
}

fn auth_error_code(error: &AuthBackendError) -> String {
    match error {
        AuthBackendError::InvalidCredentials => "AUTH_INVALID_CREDENTIALS".to_owned(),
        AuthBackendError::Timeout => "AUTH_TIMEOUT".to_owned(),
        AuthBackendError::Transient { code, .. } => sanitize_error_code(code),
    }
}
