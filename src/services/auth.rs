//! Credential checks and signed, time-limited bearer tokens.
//!
//! Two configuration-selectable strategies share one token format: the
//! shared strategy compares a single administrator password, the account
//! strategy verifies an Argon2id hash stored in `admin_users` and records
//! `last_login`.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::{AuthConfig, AuthStrategy};
use crate::db::Store;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required credential field was absent from the request.
    #[error("{0}")]
    MissingCredentials(&'static str),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// JWT claims carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username, or "admin" under the shared strategy.
    pub sub: String,

    /// Store id of the admin account; absent under the shared strategy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<i32>,

    pub role: String,

    /// Expiry as a unix timestamp.
    pub exp: usize,
}

/// Successful login: the encoded token plus its claims for the response body.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub claims: Claims,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

pub struct AuthService {
    config: AuthConfig,
    store: Store,
}

impl AuthService {
    #[must_use]
    pub const fn new(config: AuthConfig, store: Store) -> Self {
        Self { config, store }
    }

    /// Validates credentials per the configured strategy and issues a token.
    ///
    /// Whether an account exists is never distinguishable from a wrong
    /// password in the result; the difference only shows up in logs.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome, AuthError> {
        match self.config.strategy {
            AuthStrategy::Shared => self.login_shared(request),
            AuthStrategy::Account => self.login_account(request).await,
        }
    }

    fn login_shared(&self, request: LoginRequest) -> Result<LoginOutcome, AuthError> {
        let password = request
            .password
            .filter(|p| !p.is_empty())
            .ok_or(AuthError::MissingCredentials("Password required"))?;

        if password != self.config.admin_password {
            warn!("Login rejected: wrong shared password");
            return Err(AuthError::InvalidCredentials);
        }

        self.issue("admin".to_string(), None, "admin".to_string())
    }

    async fn login_account(&self, request: LoginRequest) -> Result<LoginOutcome, AuthError> {
        let username = request
            .username
            .filter(|u| !u.is_empty())
            .ok_or(AuthError::MissingCredentials("Username and password required"))?;
        let password = request
            .password
            .filter(|p| !p.is_empty())
            .ok_or(AuthError::MissingCredentials("Username and password required"))?;

        let Some(user) = self.store.get_admin_by_username(&username).await? else {
            warn!(username, "Login rejected: unknown admin user");
            return Err(AuthError::InvalidCredentials);
        };

        let is_valid = self.store.verify_admin_password(&username, &password).await?;
        if !is_valid {
            warn!(username, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        self.store.touch_admin_last_login(&username).await?;

        self.issue(user.username, Some(user.id), user.role)
    }

    fn issue(&self, sub: String, uid: Option<i32>, role: String) -> Result<LoginOutcome, AuthError> {
        let expiry = chrono::Utc::now() + chrono::Duration::hours(self.config.token_ttl_hours);
        let claims = Claims {
            sub,
            uid,
            role,
            exp: usize::try_from(expiry.timestamp())
                .map_err(|_| AuthError::Internal("Token expiry overflow".to_string()))?,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_ref()),
        )
        .map_err(|e| AuthError::Internal(format!("Failed to sign token: {e}")))?;

        Ok(LoginOutcome { token, claims })
    }

    /// Decodes and validates signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|e| {
            warn!(error = %e, "Token verification failed");
            AuthError::InvalidToken
        })?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    async fn service(strategy: AuthStrategy) -> AuthService {
        // One pooled connection keeps the in-memory database shared.
        let store = Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .unwrap();
        let config = AuthConfig {
            strategy,
            jwt_secret: "test-secret".to_string(),
            admin_password: "hunter2".to_string(),
            ..AuthConfig::default()
        };
        AuthService::new(config, store)
    }

    #[tokio::test]
    async fn shared_login_roundtrip() {
        let auth = service(AuthStrategy::Shared).await;

        let outcome = auth
            .login(LoginRequest {
                username: None,
                password: Some("hunter2".to_string()),
            })
            .await
            .unwrap();

        let claims = auth.verify(&outcome.token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.uid, None);
    }

    #[tokio::test]
    async fn shared_login_rejects_wrong_password() {
        let auth = service(AuthStrategy::Shared).await;

        let err = auth
            .login(LoginRequest {
                username: None,
                password: Some("nope".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = auth
            .login(LoginRequest {
                username: None,
                password: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials(_)));
    }

    #[tokio::test]
    async fn account_login_records_last_login() {
        let auth = service(AuthStrategy::Account).await;
        auth.store.create_admin("ops", "correct horse").await.unwrap();

        let outcome = auth
            .login(LoginRequest {
                username: Some("ops".to_string()),
                password: Some("correct horse".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(outcome.claims.sub, "ops");
        assert!(outcome.claims.uid.is_some());

        let user = auth
            .store
            .get_admin_by_username("ops")
            .await
            .unwrap()
            .unwrap();
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn account_login_hides_unknown_users() {
        let auth = service(AuthStrategy::Account).await;
        auth.store.create_admin("ops", "correct horse").await.unwrap();

        let wrong_password = auth
            .login(LoginRequest {
                username: Some("ops".to_string()),
                password: Some("wrong".to_string()),
            })
            .await
            .unwrap_err();
        let unknown_user = auth
            .login(LoginRequest {
                username: Some("ghost".to_string()),
                password: Some("wrong".to_string()),
            })
            .await
            .unwrap_err();

        // Same error either way; no user enumeration through the API.
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn verify_rejects_forged_and_expired_tokens() {
        let auth = service(AuthStrategy::Shared).await;

        assert!(matches!(
            auth.verify("not-a-token"),
            Err(AuthError::InvalidToken)
        ));

        // Signed with a different secret
        let forged = encode(
            &Header::default(),
            &Claims {
                sub: "admin".to_string(),
                uid: None,
                role: "admin".to_string(),
                exp: usize::try_from(chrono::Utc::now().timestamp()).unwrap() + 3600,
            },
            &EncodingKey::from_secret(b"other-secret"),
        )
        .unwrap();
        assert!(matches!(auth.verify(&forged), Err(AuthError::InvalidToken)));

        // Expired an hour ago
        let expired = encode(
            &Header::default(),
            &Claims {
                sub: "admin".to_string(),
                uid: None,
                role: "admin".to_string(),
                exp: usize::try_from(chrono::Utc::now().timestamp() - 3600).unwrap(),
            },
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(matches!(auth.verify(&expired), Err(AuthError::InvalidToken)));
    }
}
