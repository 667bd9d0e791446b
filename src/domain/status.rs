use std::time::{SystemTime, UNIX_EPOCH};

/// Where sign-in stands for the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    NotStarted,
    InProgress,
    Success,
    TransientFailure,
    FatalFailure,
}

/// REST reachability as seen by the last request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityHealth {
    Unknown,
    Ok,
    Degraded,
    Unavailable,
}

/// Last failure, as a stable code safe to show to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    pub code: String,
    pub at_unix_ms: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConnectivityStatus {
    pub auth: AuthStatus,
    pub connectivity: ConnectivityHealth,
    pub updated_at_unix_ms: u128,
    pub last_error: Option<StatusError>,
}

impl Default for AuthConnectivityStatus {
    fn default() -> Self {
        Self {
            auth: AuthStatus::NotStarted,
            connectivity: ConnectivityHealth::Unknown,
            updated_at_unix_ms: now_unix_ms(),
            last_error: None,
        }
    }
}

pub fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// Seconds since the epoch, the unit chat and message timestamps use.
pub fn now_unix_s() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_starts_unknown() {
        let status = AuthConnectivityStatus::default();

        assert_eq!(status.auth, AuthStatus::NotStarted);
        assert_eq!(status.connectivity, ConnectivityHealth::Unknown);
        assert!(status.updated_at_unix_ms > 0);
    }

    #[test]
    fn clocks_agree_on_the_second() {
        let seconds = now_unix_s();
        let millis = now_unix_ms();

        assert!((millis / 1000) as i64 - seconds <= 1);
    }
}
