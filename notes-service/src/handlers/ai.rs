//! `POST /api/ai/generate`: the HTTP face of the generation gateway.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::middleware::CurrentUser;
use crate::models::{GenerationRequest, GenerationResult, NoteType};
use crate::services::GenerationError;
use crate::startup::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct GenerateNoteBody {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default, rename = "type")]
    pub note_type: NoteType,
}

/// HTTP status for a gateway failure.
pub fn status_for(err: &GenerationError) -> StatusCode {
    match err {
        GenerationError::Unauthorized => StatusCode::UNAUTHORIZED,
        GenerationError::InvalidInput => StatusCode::BAD_REQUEST,
        GenerationError::Configuration
        | GenerationError::ProviderAuth
        | GenerationError::ProviderRateLimit
        | GenerationError::ProviderService
        | GenerationError::ProviderOther(_)
        | GenerationError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[tracing::instrument(skip(state, user, body))]
pub async fn generate_note(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    body: Result<Json<GenerateNoteBody>, JsonRejection>,
) -> Response {
    // An unreadable body carries no prompt; the gateway still checks the caller first.
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "Unreadable generate body");
            GenerateNoteBody::default()
        }
    };
    let request = GenerationRequest::new(body.prompt.unwrap_or_default(), body.note_type);

    match state.gateway.generate(user.as_ref(), &request).await {
        Ok(generation) => (
            StatusCode::OK,
            Json(GenerationResult::success(generation.text, generation.usage)),
        )
            .into_response(),
        Err(err) => (status_for(&err), Json(json!({ "error": err.to_string() }))).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_errors_are_4xx_and_the_rest_500() {
        assert_eq!(
            status_for(&GenerationError::Unauthorized),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&GenerationError::InvalidInput),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&GenerationError::ProviderRateLimit),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&GenerationError::Transport("eof".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn body_type_defaults_to_general() {
        let body: GenerateNoteBody = serde_json::from_value(json!({ "prompt": "x" })).unwrap();
        assert_eq!(body.note_type, NoteType::General);

        let body: GenerateNoteBody =
            serde_json::from_value(json!({ "prompt": "x", "type": "recipe" })).unwrap();
        assert_eq!(body.note_type, NoteType::General);

        let body: GenerateNoteBody =
            serde_json::from_value(json!({ "prompt": "x", "type": 5 })).unwrap();
        assert_eq!(body.note_type, NoteType::General);
    }
}
