use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::note::NoteRow;

/// Persistence contract for note content.
///
/// The sync service and the HTTP handlers only talk to this trait, so tests
/// can swap the Postgres pool for an in-memory store.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Fetch the most recently updated note across all owners
    ///
    /// # Returns
    /// * `Result<Option<NoteRow>, SqlxError>` - Newest note or None if the table is empty
    async fn find_latest(&self) -> Result<Option<NoteRow>, SqlxError>;

    /// Fetch the note belonging to a single owner
    ///
    /// # Arguments
    /// * `owner_id` - Owner identifier
    ///
    /// # Returns
    /// * `Result<Option<NoteRow>, SqlxError>` - The owner's note or None if they have none yet
    async fn find_by_owner(&self, owner_id: &str) -> Result<Option<NoteRow>, SqlxError>;

    /// Insert or overwrite the note for an owner
    ///
    /// Creates the row on first write and replaces the content on every write
    /// after that, bumping `updated_at` either way.
    ///
    /// # Arguments
    /// * `owner_id` - Owner identifier
    /// * `content` - Full replacement content
    ///
    /// # Returns
    /// * `Result<NoteRow, SqlxError>` - The stored row
    async fn upsert(&self, owner_id: &str, content: &str) -> Result<NoteRow, SqlxError>;

    /// Close the underlying connections, if any
    async fn close(&self);
}

/// Database connection pool
pub struct DbNotes {
    pool: PgPool,
}

impl DbNotes {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    ///
    /// # Returns
    /// * `Result<Self, SqlxError>` - Database connection pool or error
    pub async fn new(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20) // Support many concurrent sessions saving at once
            .min_connections(2) // Keep some connections alive
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600)) // Close idle connections after 10 minutes
            .max_lifetime(Duration::from_secs(1800)) // Recycle connections after 30 minutes
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }
}

#[async_trait]
impl NoteStore for DbNotes {
    async fn find_latest(&self) -> Result<Option<NoteRow>, SqlxError> {
        let query_sql = r#"
            SELECT owner_id, content, created_at, updated_at
            FROM notes
            ORDER BY updated_at DESC
            LIMIT 1
        "#;

        sqlx::query_as::<_, NoteRow>(query_sql)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Option<NoteRow>, SqlxError> {
        // Log pool stats before acquiring connection
        let pool_idle = self.pool.num_idle() as u32;
        let pool_size = self.pool.size();
        info!(
            "Loading note for owner {}. Pool connections: {} idle, {} in use",
            owner_id,
            pool_idle,
            pool_size.saturating_sub(pool_idle)
        );

        let query_sql = r#"
            SELECT owner_id, content, created_at, updated_at
            FROM notes
            WHERE owner_id = $1
        "#;

        sqlx::query_as::<_, NoteRow>(query_sql)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn upsert(&self, owner_id: &str, content: &str) -> Result<NoteRow, SqlxError> {
        // This runs on every edit, so keep the pool stats at debug
        debug!(
            "Saving note for owner {}. Pool connections: {} idle, {} total",
            owner_id,
            self.pool.num_idle(),
            self.pool.size()
        );

        let query_sql = r#"
            INSERT INTO notes (owner_id, content, created_at, updated_at)
            VALUES ($1, $2, NOW(), NOW())
            ON CONFLICT (owner_id)
            DO UPDATE SET content = EXCLUDED.content, updated_at = NOW()
            RETURNING owner_id, content, created_at, updated_at
        "#;

        sqlx::query_as::<_, NoteRow>(query_sql)
            .bind(owner_id)
            .bind(content)
            .fetch_one(&self.pool)
            .await
    }

    async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }
}
