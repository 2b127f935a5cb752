//! Caller authentication.
//!
//! One [`AuthProvider`] is chosen at startup: the hosted provider verifies
//! session JWTs issued by the hosted auth product, the development provider
//! returns a fixed stand-in user so the service runs without it.

use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use service_core::error::AppError;

use crate::config::{AuthConfig, AuthMode};
use crate::models::UserProfile;

/// Identity of the caller as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Provider-side user id (stored as `users.external_id`).
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
}

impl AuthUser {
    /// Profile for upserting the local user row. A missing email is stored
    /// as an empty string.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            external_id: self.id.clone(),
            email: self.email.clone().unwrap_or_default(),
            name: UserProfile::display_name(self.first_name.as_deref(), self.last_name.as_deref()),
            avatar: self.image_url.clone(),
        }
    }
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Resolve the caller from request headers; `None` when unauthenticated.
    async fn authenticate(&self, headers: &HeaderMap) -> Option<AuthUser>;
}

/// Session claims read from hosted-auth tokens.
#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// Verifies `Authorization: Bearer <jwt>` against the hosted provider's
/// RS256 public key.
pub struct HostedAuthProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl HostedAuthProvider {
    pub fn from_pem(public_key_pem: &[u8], issuer: Option<&str>) -> Result<Self, AppError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("Failed to parse auth public key: {}", e))
        })?;

        let mut validation = Validation::new(Algorithm::RS256);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    pub fn from_file(path: &str, issuer: Option<&str>) -> Result<Self, AppError> {
        let pem = fs::read(path).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!(
                "Failed to read auth public key from {}: {}",
                path,
                e
            ))
        })?;
        Self::from_pem(&pem, issuer)
    }

    fn verify(&self, token: &str) -> Option<AuthUser> {
        match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => {
                let claims = data.claims;
                Some(AuthUser {
                    id: claims.sub,
                    email: claims.email,
                    first_name: claims.given_name,
                    last_name: claims.family_name,
                    image_url: claims.picture,
                })
            }
            Err(e) => {
                tracing::debug!(error = %e, "Rejected session token");
                None
            }
        }
    }
}

#[async_trait]
impl AuthProvider for HostedAuthProvider {
    fn name(&self) -> &'static str {
        "hosted"
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Option<AuthUser> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))?;

        self.verify(token.trim())
    }
}

/// Development stand-in: every request is the same local user.
#[derive(Debug, Default)]
pub struct DevAuthProvider;

impl DevAuthProvider {
    pub fn user() -> AuthUser {
        AuthUser {
            id: "dev_user".to_string(),
            email: Some("dev@example.com".to_string()),
            first_name: Some("Dev".to_string()),
            last_name: Some("User".to_string()),
            image_url: None,
        }
    }
}

#[async_trait]
impl AuthProvider for DevAuthProvider {
    fn name(&self) -> &'static str {
        "dev"
    }

    async fn authenticate(&self, _headers: &HeaderMap) -> Option<AuthUser> {
        Some(Self::user())
    }
}

/// Pick the provider for this process from configuration.
pub fn build_auth_provider(config: &AuthConfig) -> Result<Arc<dyn AuthProvider>, AppError> {
    let effective = config.effective_mode();

    if config.mode == AuthMode::Hosted && effective == AuthMode::Dev {
        tracing::warn!(
            "Hosted auth keys missing or placeholders; using development identity for all requests"
        );
    }

    match (effective, config.jwt_public_key_path.as_deref()) {
        (AuthMode::Hosted, Some(path)) => {
            let provider = HostedAuthProvider::from_file(path, config.jwt_issuer.as_deref())?;
            tracing::info!(key_path = %path, "Using hosted auth provider");
            Ok(Arc::new(provider))
        }
        _ => {
            tracing::info!("Using development auth provider");
            Ok(Arc::new(DevAuthProvider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dev_provider_always_authenticates() {
        let user = DevAuthProvider.authenticate(&HeaderMap::new()).await;
        assert_eq!(user, Some(DevAuthProvider::user()));
    }

    #[test]
    fn profile_joins_name_and_defaults_email() {
        let user = AuthUser {
            id: "user_1".into(),
            email: None,
            first_name: Some("Ada".into()),
            last_name: None,
            image_url: None,
        };
        let profile = user.profile();
        assert_eq!(profile.external_id, "user_1");
        assert_eq!(profile.email, "");
        assert_eq!(profile.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn hosted_provider_rejects_garbage_key() {
        assert!(HostedAuthProvider::from_pem(b"not a pem", None).is_err());
    }

    #[test]
    fn placeholder_config_builds_dev_provider() {
        let config = AuthConfig {
            mode: AuthMode::Hosted,
            publishable_key: Some("pk_test_your_key".into()),
            secret_key: Some("sk_test_your_key".into()),
            jwt_public_key_path: Some("/nonexistent.pem".into()),
            jwt_issuer: None,
            webhook_secret: None,
        };
        let provider = build_auth_provider(&config).unwrap();
        assert_eq!(provider.name(), "dev");
    }
}
