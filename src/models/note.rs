use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Note row from the database.
///
/// At most one row exists per `owner_id`; `updated_at` reflects the last
/// completed write, whichever session issued it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NoteRow {
    pub owner_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
