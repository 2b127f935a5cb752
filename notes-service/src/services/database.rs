//! PostgreSQL persistence for users, notebooks and notes.

use crate::models::{Note, NoteInput, NoteRow, Notebook, NotebookInput, User, UserProfile};
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

const NOTE_COLUMNS: &str = r#"
    n.id, n.user_id, n.notebook_id, n.title, n.content, n.created_at, n.updated_at,
    nb.title AS notebook_title, nb.color AS notebook_color
"#;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct NotesDb {
    pool: PgPool,
}

impl NotesDb {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "notes-service"))]
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Pool that only opens connections when first used.
    pub fn connect_lazy(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Invalid database URL: {}", e)))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Users
    // -------------------------------------------------------------------------

    /// Create the user or refresh its profile fields.
    #[instrument(skip(self, profile), fields(external_id = %profile.external_id))]
    pub async fn upsert_user(&self, profile: &UserProfile) -> Result<User, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, external_id, email, name, avatar)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (external_id) DO UPDATE
               SET email = EXCLUDED.email,
                   name = EXCLUDED.name,
                   avatar = EXCLUDED.avatar,
                   updated_at = NOW()
            RETURNING id, external_id, email, name, avatar, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&profile.external_id)
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(&profile.avatar)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to upsert user: {}", e)))?;

        timer.observe_duration();

        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn find_user_by_external_id(&self, external_id: &str) -> Result<Option<User>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_user"])
            .start_timer();

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, email, name, avatar, created_at, updated_at
            FROM users
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get user: {}", e)))?;

        timer.observe_duration();

        Ok(user)
    }

    /// Delete a user and (by cascade) their notebooks and notes.
    /// Returns `false` if no such user existed.
    #[instrument(skip(self))]
    pub async fn delete_user_by_external_id(&self, external_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE external_id = $1")
            .bind(external_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete user: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Notes
    // -------------------------------------------------------------------------

    /// All notes of a user, most recently updated first.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_notes(&self, user_id: Uuid) -> Result<Vec<Note>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_notes"])
            .start_timer();

        let rows = sqlx::query_as::<_, NoteRow>(&format!(
            r#"
            SELECT {NOTE_COLUMNS}
            FROM notes n
            LEFT JOIN notebooks nb ON nb.id = n.notebook_id
            WHERE n.user_id = $1
            ORDER BY n.updated_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list notes: {}", e)))?;

        timer.observe_duration();

        Ok(rows.into_iter().map(Note::from).collect())
    }

    #[instrument(skip(self), fields(user_id = %user_id, note_id = %note_id))]
    pub async fn get_note(&self, user_id: Uuid, note_id: Uuid) -> Result<Option<Note>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_note"])
            .start_timer();

        let row = sqlx::query_as::<_, NoteRow>(&format!(
            r#"
            SELECT {NOTE_COLUMNS}
            FROM notes n
            LEFT JOIN notebooks nb ON nb.id = n.notebook_id
            WHERE n.id = $1 AND n.user_id = $2
            "#
        ))
        .bind(note_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get note: {}", e)))?;

        timer.observe_duration();

        Ok(row.map(Note::from))
    }

    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn create_note(&self, user_id: Uuid, input: &NoteInput) -> Result<Note, AppError> {
        self.ensure_notebook_owned(user_id, input.notebook_id).await?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_note"])
            .start_timer();

        let row = sqlx::query_as::<_, NoteRow>(&format!(
            r#"
            WITH n AS (
                INSERT INTO notes (id, user_id, notebook_id, title, content)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
            )
            SELECT {NOTE_COLUMNS}
            FROM n
            LEFT JOIN notebooks nb ON nb.id = n.notebook_id
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(input.notebook_id)
        .bind(&input.title)
        .bind(&input.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create note: {}", e)))?;

        timer.observe_duration();

        info!(note_id = %row.id, "Note created");

        Ok(row.into())
    }

    /// Replace a note's fields. `None` if the note does not exist for this user.
    #[instrument(skip(self, input), fields(user_id = %user_id, note_id = %note_id))]
    pub async fn update_note(
        &self,
        user_id: Uuid,
        note_id: Uuid,
        input: &NoteInput,
    ) -> Result<Option<Note>, AppError> {
        self.ensure_notebook_owned(user_id, input.notebook_id).await?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_note"])
            .start_timer();

        let row = sqlx::query_as::<_, NoteRow>(&format!(
            r#"
            WITH n AS (
                UPDATE notes
                   SET title = $3, content = $4, notebook_id = $5, updated_at = NOW()
                 WHERE id = $1 AND user_id = $2
                RETURNING *
            )
            SELECT {NOTE_COLUMNS}
            FROM n
            LEFT JOIN notebooks nb ON nb.id = n.notebook_id
            "#
        ))
        .bind(note_id)
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.notebook_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update note: {}", e)))?;

        timer.observe_duration();

        Ok(row.map(Note::from))
    }

    /// Returns `false` if the note does not exist for this user.
    #[instrument(skip(self), fields(user_id = %user_id, note_id = %note_id))]
    pub async fn delete_note(&self, user_id: Uuid, note_id: Uuid) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_note"])
            .start_timer();

        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(note_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete note: {}", e)))?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }

    // -------------------------------------------------------------------------
    // Notebooks
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list_notebooks(&self, user_id: Uuid) -> Result<Vec<Notebook>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_notebooks"])
            .start_timer();

        let notebooks = sqlx::query_as::<_, Notebook>(
            r#"
            SELECT id, user_id, title, description, color, created_at, updated_at
            FROM notebooks
            WHERE user_id = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list notebooks: {}", e)))?;

        timer.observe_duration();

        Ok(notebooks)
    }

    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn create_notebook(
        &self,
        user_id: Uuid,
        input: &NotebookInput,
    ) -> Result<Notebook, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_notebook"])
            .start_timer();

        let notebook = sqlx::query_as::<_, Notebook>(
            r#"
            INSERT INTO notebooks (id, user_id, title, description, color)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, title, description, color, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.color)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create notebook: {}", e)))?;

        timer.observe_duration();

        info!(notebook_id = %notebook.id, "Notebook created");

        Ok(notebook)
    }

    /// A note may only reference a notebook owned by the same user.
    async fn ensure_notebook_owned(
        &self,
        user_id: Uuid,
        notebook_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let Some(notebook_id) = notebook_id else {
            return Ok(());
        };

        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM notebooks WHERE id = $1 AND user_id = $2)",
        )
        .bind(notebook_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to check notebook: {}", e)))?;

        if owned {
            Ok(())
        } else {
            Err(AppError::BadRequest(anyhow::anyhow!("Notebook not found")))
        }
    }
}
