use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// One logged workout, owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Routine {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: Uuid,
    pub duration: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub routine_type: String,
    pub level: String,
    /// Canonical ISO calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Long weekday name, derived from `date` at save time.
    pub weekday: String,
    pub exercises: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub struct NewRoutine {
    pub duration: String,
    pub routine_type: String,
    pub level: String,
    pub date: String,
    pub weekday: String,
    pub exercises: Vec<String>,
}

impl Routine {
    /// Single-statement append. Concurrent saves for the same user never
    /// read-modify-write a shared record, so no updates are lost.
    pub async fn insert(db: &PgPool, user_id: Uuid, new: NewRoutine) -> sqlx::Result<Routine> {
        sqlx::query_as::<_, Routine>(
            r#"
            INSERT INTO routines (user_id, duration, type, level, date, weekday, exercises)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, duration, type, level, date, weekday, exercises, created_at
            "#,
        )
        .bind(user_id)
        .bind(&new.duration)
        .bind(&new.routine_type)
        .bind(&new.level)
        .bind(&new.date)
        .bind(&new.weekday)
        .bind(&new.exercises)
        .fetch_one(db)
        .await
    }

    /// All routines for a user, in insertion order.
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Routine>> {
        sqlx::query_as::<_, Routine>(
            r#"
            SELECT id, user_id, duration, type, level, date, weekday, exercises, created_at
            FROM routines
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(db)
        .await
    }

    pub async fn find_one(
        db: &PgPool,
        user_id: Uuid,
        routine_id: Uuid,
    ) -> sqlx::Result<Option<Routine>> {
        sqlx::query_as::<_, Routine>(
            r#"
            SELECT id, user_id, duration, type, level, date, weekday, exercises, created_at
            FROM routines
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(routine_id)
        .bind(user_id)
        .fetch_optional(db)
        .await
    }
}
