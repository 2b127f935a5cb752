//! Note model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use service_core::error::AppError;
use sqlx::FromRow;
use uuid::Uuid;

use super::NotebookSummary;

/// A note as returned to callers, with its notebook (if any) embedded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notebook_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub notebook: Option<NotebookSummary>,
}

/// Flat row of `notes LEFT JOIN notebooks`.
#[derive(Debug, Clone, FromRow)]
pub struct NoteRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notebook_id: Option<Uuid>,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub notebook_title: Option<String>,
    pub notebook_color: Option<String>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        let notebook = row
            .notebook_id
            .zip(row.notebook_title)
            .map(|(id, title)| NotebookSummary {
                id,
                title,
                color: row.notebook_color,
            });

        Note {
            id: row.id,
            user_id: row.user_id,
            notebook_id: row.notebook_id,
            title: row.title,
            content: row.content,
            created_at: row.created_at,
            updated_at: row.updated_at,
            notebook,
        }
    }
}

/// Validated input for creating or replacing a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteInput {
    pub title: String,
    pub content: String,
    pub notebook_id: Option<Uuid>,
}

impl NoteInput {
    /// Build from loosely typed request fields.
    ///
    /// Title and content must be non-empty. An empty notebook id means
    /// "no notebook".
    pub fn parse(
        title: Option<String>,
        content: Option<String>,
        notebook_id: Option<String>,
    ) -> Result<Self, AppError> {
        let title = title.filter(|t| !t.trim().is_empty());
        let content = content.filter(|c| !c.trim().is_empty());

        let (title, content) = match (title, content) {
            (Some(title), Some(content)) => (title, content),
            _ => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Title and content are required"
                )))
            }
        };

        let notebook_id = match notebook_id.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| {
                AppError::BadRequest(anyhow::anyhow!("Invalid notebook id: {}", raw))
            })?),
        };

        Ok(Self {
            title,
            content,
            notebook_id,
        })
    }
}
