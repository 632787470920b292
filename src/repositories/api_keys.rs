use sqlx::PgPool;

use super::RepositoryError;
use crate::models::api_keys::ApiKey;

#[derive(Clone)]
pub struct ApiKeyRepository {
    conn: PgPool,
}

impl ApiKeyRepository {
    pub fn new(conn: PgPool) -> Self {
        ApiKeyRepository { conn }
    }

    /// Candidate lookup by the public prefix. Hash verification and status
    /// checks stay with the caller so every rejection looks the same.
    pub async fn find_by_prefix(&self, prefix: &str) -> Result<Option<ApiKey>, RepositoryError> {
        let key = sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE key_prefix = $1")
            .bind(prefix)
            .fetch_optional(&self.conn)
            .await?;

        Ok(key)
    }

    /// Best-effort usage stamp; the caller spawns this and ignores failures.
    pub async fn touch_last_used(&self, key_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE api_keys SET last_used_at = CURRENT_TIMESTAMP WHERE id = $1")
            .bind(key_id)
            .execute(&self.conn)
            .await?;

        Ok(())
    }
}
