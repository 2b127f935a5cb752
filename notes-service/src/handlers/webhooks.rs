//! Auth provider webhook: keeps the local `users` table in sync with the
//! hosted identity product.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use service_core::error::AppError;
use service_core::utils::signature::{verify_webhook, SignatureError};

use crate::models::UserProfile;
use crate::services::metrics::WEBHOOK_EVENTS_TOTAL;
use crate::startup::AppState;

const SVIX_ID: &str = "svix-id";
const SVIX_TIMESTAMP: &str = "svix-timestamp";
const SVIX_SIGNATURE: &str = "svix-signature";

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct WebhookUser {
    id: String,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeletedUser {
    id: String,
}

impl WebhookUser {
    fn into_profile(self) -> Result<UserProfile, AppError> {
        let email = self
            .email_addresses
            .into_iter()
            .next()
            .map(|e| e.email_address)
            .ok_or_else(|| anyhow::anyhow!("User {} has no email address", self.id))?;

        Ok(UserProfile {
            name: UserProfile::display_name(self.first_name.as_deref(), self.last_name.as_deref()),
            external_id: self.id,
            email,
            avatar: self.image_url,
        })
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing webhook headers")))
}

fn verify(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<(), AppError> {
    let msg_id = header(headers, SVIX_ID)?;
    let timestamp = header(headers, SVIX_TIMESTAMP)?;
    let signature = header(headers, SVIX_SIGNATURE)?;

    let secret = state.config.auth.webhook_secret.as_deref().ok_or_else(|| {
        AppError::ConfigError(anyhow::anyhow!("AUTH_WEBHOOK_SECRET is not set"))
    })?;

    let now = chrono::Utc::now().timestamp();
    verify_webhook(secret, msg_id, timestamp, signature, body, now).map_err(|e| match e {
        SignatureError::InvalidSecret => {
            AppError::ConfigError(anyhow::anyhow!("AUTH_WEBHOOK_SECRET is malformed"))
        }
        other => {
            tracing::warn!(error = %other, msg_id = %msg_id, "Rejected webhook delivery");
            AppError::BadRequest(anyhow::anyhow!("Invalid webhook signature"))
        }
    })
}

#[tracing::instrument(skip(state, headers, body), fields(event_type))]
pub async fn auth_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    if let Err(e) = verify(&state, &headers, &body) {
        WEBHOOK_EVENTS_TOTAL
            .with_label_values(&["unknown", "rejected"])
            .inc();
        return Err(e);
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid webhook payload: {}", e)))?;

    tracing::Span::current().record("event_type", event.event_type.as_str());

    let result = handle_event(&state, &event).await;

    let status = match &result {
        Ok(true) => "processed",
        Ok(false) => "ignored",
        Err(_) => "failed",
    };
    WEBHOOK_EVENTS_TOTAL
        .with_label_values(&[event.event_type.as_str(), status])
        .inc();

    result.map(|_| StatusCode::OK)
}

/// Apply one event. Returns `false` for event types this service ignores.
async fn handle_event(state: &AppState, event: &WebhookEvent) -> Result<bool, AppError> {
    let parse_err =
        |e: serde_json::Error| AppError::BadRequest(anyhow::anyhow!("Invalid webhook payload: {}", e));

    match event.event_type.as_str() {
        "user.created" | "user.updated" => {
            let user: WebhookUser = serde_json::from_value(event.data.clone()).map_err(parse_err)?;
            let profile = user.into_profile()?;
            let stored = state.db.upsert_user(&profile).await?;
            tracing::info!(user_id = %stored.id, external_id = %stored.external_id, "User synced");
            Ok(true)
        }
        "user.deleted" => {
            let user: DeletedUser = serde_json::from_value(event.data.clone()).map_err(parse_err)?;
            if state.db.delete_user_by_external_id(&user.id).await? {
                tracing::info!(external_id = %user.id, "User deleted");
            } else {
                tracing::info!(external_id = %user.id, "Delete for unknown user ignored");
            }
            Ok(true)
        }
        other => {
            tracing::debug!(event_type = %other, "Ignoring webhook event");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_takes_first_email_and_joins_name() {
        let user: WebhookUser = serde_json::from_value(json!({
            "id": "user_2abc",
            "email_addresses": [
                { "email_address": "ada@example.com" },
                { "email_address": "other@example.com" }
            ],
            "first_name": "Ada",
            "last_name": "Lovelace",
            "image_url": "https://img.example.com/ada.png"
        }))
        .unwrap();

        let profile = user.into_profile().unwrap();
        assert_eq!(profile.external_id, "user_2abc");
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.name.as_deref(), Some("Ada Lovelace"));
    }

    #[test]
    fn profile_without_email_is_an_internal_error() {
        let user: WebhookUser = serde_json::from_value(json!({ "id": "user_2abc" })).unwrap();
        assert!(matches!(
            user.into_profile(),
            Err(AppError::InternalError(_))
        ));
    }
}
