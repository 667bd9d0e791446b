use crate::infra::{contracts::TokenStore, error::AppError};

use super::contracts::SessionSource;

const SIGN_OUT_FAILED: &str = "LOGOUT_SIGN_OUT_FAILED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub token_removed: bool,
    pub server_signed_out: bool,
}

/// Ends the server session and forgets the local token. The token is removed
/// even when the server cannot be reached.
pub fn logout(
    session: &dyn SessionSource,
    token_store: &dyn TokenStore,
) -> Result<LogoutOutcome, AppError> {
    let has_token = token_store.load()?.is_some();

    let server_signed_out = has_token
        && match session.sign_out() {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(code = SIGN_OUT_FAILED, error = ?error, "server sign-out failed");
                false
            }
        };

    let token_removed = token_store.clear()?;

    Ok(LogoutOutcome {
        token_removed,
        server_signed_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        infra::stubs::MemoryTokenStore,
        usecases::{contracts::SourceError, stubs::StubBackend},
    };

    #[test]
    fn logout_signs_out_and_removes_token() {
        let backend = StubBackend::default();
        let store = MemoryTokenStore::with_token("tok");

        let outcome = logout(&backend, &store).expect("logout should succeed");

        assert!(outcome.token_removed);
        assert!(outcome.server_signed_out);
        assert!(backend.was_called("sign_out"));
        assert_eq!(store.load().expect("load"), None);
    }

    #[test]
    fn token_is_removed_when_server_is_unreachable() {
        let backend = StubBackend::default();
        backend.fail("sign_out", SourceError::Unavailable("offline".to_owned()));
        let store = MemoryTokenStore::with_token("tok");

        let outcome = logout(&backend, &store).expect("logout should succeed");

        assert!(outcome.token_removed);
        assert!(!outcome.server_signed_out);
    }

    #[test]
    fn logout_is_idempotent_without_token() {
        let backend = StubBackend::default();
        let store = MemoryTokenStore::default();

        let outcome = logout(&backend, &store).expect("logout should succeed");

        assert!(!outcome.token_removed);
        assert!(!outcome.server_signed_out);
        assert!(!backend.was_called("sign_out"));
    }
}
