use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::Row;
use tracing::debug;

use plusplus_core::points::{PointRecord, PointStore, StoreError};

use super::RepositoryError;
use crate::{connect_with_settings, migrations, DbPool};

/// SQLite-backed point store. The logical key lives in the `user_id` column so
/// databases written by earlier deployments keep working.
pub struct SqlPointStore {
    pool: DbPool,
}

impl SqlPointStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Connects and applies pending migrations, creating `user_points` on first use.
    pub async fn open(
        database_url: &str,
        max_connections: u32,
        timeout_secs: u64,
    ) -> Result<Self, RepositoryError> {
        let pool = connect_with_settings(database_url, max_connections, timeout_secs).await?;
        migrations::run_pending(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn upsert(&self, key: &str, delta: i64, is_user: bool) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO user_points (user_id, points, is_user, last_modified)
             VALUES (?, ?, ?, strftime('%Y-%m-%d %H:%M:%f', 'now'))
             ON CONFLICT (user_id) DO UPDATE SET
                 points = points + excluded.points,
                 is_user = excluded.is_user,
                 last_modified = excluded.last_modified",
        )
        .bind(key)
        .bind(delta)
        .bind(is_user)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_record(&self, key: &str) -> Result<Option<PointRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id,
                    COALESCE(points, 0) AS points,
                    CAST(COALESCE(is_user, 1) AS INTEGER) AS is_user,
                    CAST(last_modified AS TEXT) AS last_modified
             FROM user_points
             WHERE user_id = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_record).transpose()
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<PointRecord, RepositoryError> {
    let key: String = row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let points: i64 = row.try_get("points").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_user: i64 =
        row.try_get("is_user").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let last_modified: Option<String> =
        row.try_get("last_modified").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let last_modified = match last_modified {
        Some(raw) => parse_timestamp(&raw)?,
        None => DateTime::<Utc>::UNIX_EPOCH,
    };

    Ok(PointRecord { key, points, is_user: is_user != 0, last_modified })
}

/// SQLite stores UTC timestamps as `YYYY-MM-DD HH:MM:SS[.fff]`; RFC 3339 is
/// accepted for rows written by other tooling.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(parsed.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("last_modified `{raw}`: {error}")))
}

#[async_trait::async_trait]
impl PointStore for SqlPointStore {
    async fn add_points(&self, key: &str, delta: i64, is_user: bool) -> Result<(), StoreError> {
        self.upsert(key, delta, is_user).await?;
        debug!(event_name = "store.sqlite.points_added", key, delta, is_user, "points upserted");
        Ok(())
    }

    async fn get_points(&self, key: &str) -> Result<i64, StoreError> {
        let points = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT points FROM user_points WHERE user_id = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(points.flatten().unwrap_or(0))
    }

    async fn find_record(&self, key: &str) -> Result<Option<PointRecord>, StoreError> {
        Ok(self.fetch_record(key).await?)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
