use sqlx::PgConnection;

use super::RepositoryError;

/// Claims a provider event reference for processing. Backed by the primary
/// key on `processed_events`: the insert either lands (claimed) or hits the
/// constraint (someone already processed, or is processing, this event).
/// Runs on the caller's transaction so a failed pipeline releases the claim.
pub async fn try_claim(conn: &mut PgConnection, event_ref: &str) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        "INSERT INTO processed_events (event_ref) VALUES ($1) ON CONFLICT (event_ref) DO NOTHING",
    )
    .bind(event_ref)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
