//! User model mirrored from the auth provider.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields used to create or refresh a user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Join first and last name, skipping blanks. `None` if nothing is left.
    pub fn display_name(first_name: Option<&str>, last_name: Option<&str>) -> Option<String> {
        let name = [first_name, last_name]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if name.is_empty() {
            None
        } else {
            Some(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_joins_present_parts() {
        assert_eq!(
            UserProfile::display_name(Some("Ada"), Some("Lovelace")).as_deref(),
            Some("Ada Lovelace")
        );
        assert_eq!(
            UserProfile::display_name(Some("Ada"), None).as_deref(),
            Some("Ada")
        );
        assert_eq!(UserProfile::display_name(None, Some(" ")), None);
    }
}
