use rust_decimal::Decimal;
use sqlx::PgConnection;

use super::RepositoryError;

/// Atomic balance increment. Always expressed as a store-level delta;
/// reading the balance and writing an absolute value back would lose
/// concurrent updates.
pub async fn credit(
    conn: &mut PgConnection,
    user_id: &str,
    amount: Decimal,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        "UPDATE users SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
    )
    .bind(amount)
    .bind(user_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound(format!("user {}", user_id)));
    }

    Ok(())
}

/// Atomic, sufficiency-checked balance decrement. The predicate makes the
/// check and the mutation one statement; zero rows affected means the
/// balance was short and nothing changed.
pub async fn debit(
    conn: &mut PgConnection,
    user_id: &str,
    amount: Decimal,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r#"
        UPDATE users SET balance = balance - $1, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2 AND balance >= $1
        "#,
    )
    .bind(amount)
    .bind(user_id)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::InsufficientBalance);
    }

    Ok(())
}
