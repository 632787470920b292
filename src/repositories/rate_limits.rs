use sqlx::PgPool;

use super::RepositoryError;

/// Centralized fixed-window counters. The upsert-increment is atomic at the
/// store, so concurrent gateway instances share one window per
/// identity/endpoint tuple.
#[derive(Clone)]
pub struct RateLimitRepository {
    conn: PgPool,
}

impl RateLimitRepository {
    pub fn new(conn: PgPool) -> Self {
        RateLimitRepository { conn }
    }

    /// Records one hit and returns the window's running count, this hit
    /// included.
    pub async fn hit(
        &self,
        identity: &str,
        endpoint: &str,
        window_start: i64,
    ) -> Result<i32, RepositoryError> {
        let count: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO rate_limit_counters (identity, endpoint, window_start, count)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (identity, endpoint, window_start)
            DO UPDATE SET count = rate_limit_counters.count + 1
            RETURNING count
            "#,
        )
        .bind(identity)
        .bind(endpoint)
        .bind(window_start)
        .fetch_one(&self.conn)
        .await?;

        Ok(count)
    }

    /// Drops counters from windows that ended before `cutoff`.
    pub async fn prune(&self, cutoff: i64) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM rate_limit_counters WHERE window_start < $1")
            .bind(cutoff)
            .execute(&self.conn)
            .await?;

        Ok(result.rows_affected())
    }
}
