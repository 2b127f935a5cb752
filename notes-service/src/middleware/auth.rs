//! Caller identity extractors.
//!
//! Both resolve the caller through the [`AuthProvider`](crate::services::AuthProvider)
//! held in [`AppState`]. `CurrentUser` never rejects; `RequireUser` rejects
//! with 401 when nobody is signed in.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use std::convert::Infallible;

use crate::services::AuthUser;
use crate::startup::AppState;

/// The caller, if any.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<AuthUser>);

/// An authenticated caller.
#[derive(Debug, Clone)]
pub struct RequireUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = state.auth.authenticate(&parts.headers).await;

        if let Some(ref user) = user {
            tracing::Span::current().record("user_id", user.id.as_str());
        }

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});

        user.map(RequireUser)
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Unauthorized")))
    }
}
