use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use service_core::error::AppError;
use validator::Validate;

use super::json_body;
use crate::middleware::RequireUser;
use crate::models::NotebookInput;
use crate::startup::AppState;

#[tracing::instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_notebooks(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<impl IntoResponse, AppError> {
    let local = state.db.upsert_user(&user.profile()).await?;
    let notebooks = state.db.list_notebooks(local.id).await?;

    Ok(Json(json!({ "notebooks": notebooks })))
}

#[tracing::instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create_notebook(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    body: Result<Json<NotebookInput>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let input = json_body(body)?;
    input.validate()?;

    let local = state.db.upsert_user(&user.profile()).await?;
    let notebook = state.db.create_notebook(local.id, &input).await?;

    Ok((StatusCode::CREATED, Json(json!({ "notebook": notebook }))))
}
