//! HTTP handlers for notes-service.

pub mod ai;
pub mod health;
pub mod notebooks;
pub mod notes;
pub mod webhooks;

use axum::{extract::rejection::JsonRejection, Json};
use service_core::error::AppError;
use uuid::Uuid;

use crate::services::{AuthUser, NotesDb};

/// Local id of an already-synced caller. Callers that have never been
/// upserted get a 404.
pub(crate) async fn existing_user_id(db: &NotesDb, user: &AuthUser) -> Result<Uuid, AppError> {
    db.find_user_by_external_id(&user.id)
        .await?
        .map(|u| u.id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))
}

/// Unwrap a JSON body, turning axum's plain-text rejection into a JSON 400.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        AppError::BadRequest(anyhow::anyhow!(
            "Invalid request body: {}",
            rejection.body_text()
        ))
    })
}
