use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::api::{ApiClient, ApiError};
use crate::routes::{Navigation, ADMIN_ROUTE};

use super::store::{TokenKey, TokenStore};

/// Shown when the backend rejects the login without a `detail` message
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Username and password required")]
    MissingFields,

    /// Backend rejected the credentials; carries its human-readable message
    #[error("{0}")]
    Rejected(String),

    #[error("Network error. Please try again.")]
    Network(#[source] ApiError),
}

impl LoginError {
    /// Message suitable for display on the login view
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Username/password login against the token issuance endpoint.
pub struct LoginFlow {
    client: ApiClient,
    store: Arc<dyn TokenStore>,
    clear_on_failure: bool,
}

impl LoginFlow {
    pub fn new(client: ApiClient) -> Self {
        let store = Arc::clone(client.store());
        Self {
            client,
            store,
            clear_on_failure: false,
        }
    }

    /// Whether a failed login also discards any previously stored session
    pub fn clear_on_failure(mut self, clear: bool) -> Self {
        self.clear_on_failure = clear;
        self
    }

    /// Log in and seed the token store. On success returns the navigation
    /// to the protected landing view.
    pub async fn login(&self, username: &str, password: &str) -> Result<Navigation, LoginError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(LoginError::MissingFields);
        }

        match self.client.obtain_token_pair(username, password).await {
            Ok(pair) => {
                self.store.set(TokenKey::Access, &pair.access);
                self.store.set(TokenKey::Refresh, &pair.refresh);
                info!(username, "Login successful");
                Ok(Navigation::push(ADMIN_ROUTE))
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                if self.clear_on_failure {
                    self.store.clear_all();
                }
                if e.is_rejection() {
                    let message = e
                        .detail()
                        .unwrap_or_else(|| INVALID_CREDENTIALS_MESSAGE.to_string());
                    Err(LoginError::Rejected(message))
                } else {
                    Err(LoginError::Network(e))
                }
            }
        }
    }

    /// Forget both credentials
    pub fn logout(&self) {
        self.store.clear_all();
        info!("Logged out");
    }

    /// Whether an access credential is present (not whether it is valid)
    pub fn is_logged_in(&self) -> bool {
        self.store.get(TokenKey::Access).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;

    fn flow() -> LoginFlow {
        let store = Arc::new(MemoryTokenStore::with_pair("a", "r"));
        let client = ApiClient::new("http://127.0.0.1:9", store).unwrap();
        LoginFlow::new(client)
    }

    #[tokio::test]
    async fn test_missing_fields_rejected_locally() {
        let flow = flow();
        assert!(matches!(flow.login("", "pw").await, Err(LoginError::MissingFields)));
        assert!(matches!(flow.login("  ", "pw").await, Err(LoginError::MissingFields)));
        assert!(matches!(flow.login("admin", "").await, Err(LoginError::MissingFields)));
        assert!(flow.is_logged_in());
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            LoginError::MissingFields.user_message(),
            "Username and password required"
        );
        assert_eq!(
            LoginError::Rejected("No active account".into()).user_message(),
            "No active account"
        );
        assert_eq!(
            LoginError::Network(ApiError::InvalidResponse("eof".into())).user_message(),
            "Network error. Please try again."
        );
    }

    #[test]
    fn test_logout_clears_both() {
        let flow = flow();
        assert!(flow.is_logged_in());
        flow.logout();
        assert!(!flow.is_logged_in());
        assert_eq!(flow.store.get(TokenKey::Refresh), None);
    }
}
