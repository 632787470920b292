use sqlx::PgPool;

use super::RepositoryError;
use crate::models::webhooks::WebhookRegistration;

/// Active notification endpoints registered by a merchant.
pub async fn active_for_user(
    conn: &PgPool,
    user_id: &str,
) -> Result<Vec<WebhookRegistration>, RepositoryError> {
    let registrations = sqlx::query_as::<_, WebhookRegistration>(
        "SELECT * FROM webhook_registrations WHERE user_id = $1 AND active",
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;

    Ok(registrations)
}
