//! Notebook model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A user-owned notebook grouping notes.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Notebook fields embedded in note responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookSummary {
    pub id: Uuid,
    pub title: String,
    pub color: Option<String>,
}

/// Input for creating a notebook.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NotebookInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 2000, message = "Description is too long"))]
    pub description: Option<String>,
    #[validate(length(max = 32, message = "Color is too long"))]
    pub color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_title_fails_validation() {
        let input = NotebookInput {
            title: String::new(),
            description: None,
            color: Some("#3b82f6".into()),
        };
        assert!(input.validate().is_err());
    }
}
