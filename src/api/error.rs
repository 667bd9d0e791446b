use thiserror::Error;

/// Detail shown when the server gives no usable error payload.
pub const GENERIC_SERVER_DETAIL: &str = "Server connection failed";

pub const TIMEOUT_DETAIL: &str = "request timed out";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("session is not authorized")]
    Unauthorized,
    #[error("resource not found")]
    NotFound,
    #[error("server error {status}: {detail}")]
    Server { status: u16, detail: String },
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("unexpected response payload: {0}")]
    Decode(String),
}

impl ApiError {
    /// Stable code used in logs and status lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "API_UNAUTHORIZED",
            Self::NotFound => "API_NOT_FOUND",
            Self::Server { .. } => "API_SERVER_ERROR",
            Self::Transport(_) => "API_TRANSPORT_FAILED",
            Self::Decode(_) => "API_DECODE_FAILED",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(detail) if detail == TIMEOUT_DETAIL)
    }

    /// Text suitable for a toast.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => "Session expired, please sign in again".to_owned(),
            Self::NotFound => "Not found".to_owned(),
            Self::Server { detail, .. } => detail.clone(),
            Self::Transport(_) => GENERIC_SERVER_DETAIL.to_owned(),
            Self::Decode(_) => "Unexpected response from server".to_owned(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::Decode(error.to_string());
        }
        if error.is_timeout() {
            return Self::Transport(TIMEOUT_DETAIL.to_owned());
        }
        Self::Transport(error.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}
