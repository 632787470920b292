use sqlx::PgConnection;

use super::RepositoryError;
use crate::models::users::UserSettings;

/// Per-merchant fee settings, if the merchant has any. Callers fall back to
/// the platform defaults on `None`.
pub async fn fee_settings(
    conn: &mut PgConnection,
    user_id: &str,
) -> Result<Option<UserSettings>, RepositoryError> {
    let settings = sqlx::query_as::<_, UserSettings>(
        "SELECT user_id, deposit_fee_percent, withdrawal_fee_percent FROM user_settings WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;

    Ok(settings)
}
