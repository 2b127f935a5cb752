use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use service_core::error::AppError;
use uuid::Uuid;

use super::{existing_user_id, json_body};
use crate::middleware::RequireUser;
use crate::models::NoteInput;
use crate::startup::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteBody {
    pub title: Option<String>,
    pub content: Option<String>,
    pub notebook_id: Option<String>,
}

impl NoteBody {
    fn into_input(self) -> Result<NoteInput, AppError> {
        NoteInput::parse(self.title, self.content, self.notebook_id)
    }
}

fn note_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Note not found"))
}

#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_notes(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<impl IntoResponse, AppError> {
    let local = state.db.upsert_user(&user.profile()).await?;
    let notes = state.db.list_notes(local.id).await?;

    Ok(Json(json!({ "notes": notes })))
}

#[tracing::instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create_note(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    body: Result<Json<NoteBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let input = json_body(body)?.into_input()?;
    let local = state.db.upsert_user(&user.profile()).await?;
    let note = state.db.create_note(local.id, &input).await?;

    Ok((StatusCode::CREATED, Json(json!({ "note": note }))))
}

#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_note(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(note_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = existing_user_id(&state.db, &user).await?;
    let note = state
        .db
        .get_note(user_id, note_id)
        .await?
        .ok_or_else(note_not_found)?;

    Ok(Json(json!({ "note": note })))
}

#[tracing::instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update_note(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(note_id): Path<Uuid>,
    body: Result<Json<NoteBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let input = json_body(body)?.into_input()?;
    let user_id = existing_user_id(&state.db, &user).await?;
    let note = state
        .db
        .update_note(user_id, note_id, &input)
        .await?
        .ok_or_else(note_not_found)?;

    Ok(Json(json!({ "note": note })))
}

#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_note(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(note_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = existing_user_id(&state.db, &user).await?;

    if !state.db.delete_note(user_id, note_id).await? {
        return Err(note_not_found());
    }

    Ok(Json(json!({ "success": true })))
}
