use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use super::RepositoryError;
use crate::models::transactions::{self, Transaction, TransactionStatus, TransactionType};

/// Inserts the single pending transaction that accompanies a new deposit or
/// withdrawal. Later lifecycle changes mutate this row in place.
pub async fn insert_pending(
    conn: &mut PgConnection,
    user_id: &str,
    tx_type: TransactionType,
    amount: Decimal,
    description: &str,
    deposit_id: Option<&str>,
    withdrawal_id: Option<&str>,
) -> Result<Transaction, RepositoryError> {
    let transaction_id = Uuid::new_v4().hyphenated().to_string();
    let code = transactions::new_code();

    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions
        (id, code, user_id, tx_type, amount, status, description, deposit_id, withdrawal_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(&transaction_id)
    .bind(&code)
    .bind(user_id)
    .bind(tx_type.as_str())
    .bind(amount)
    .bind(TransactionStatus::Pending.as_str())
    .bind(description)
    .bind(deposit_id)
    .bind(withdrawal_id)
    .fetch_one(conn)
    .await?;

    Ok(transaction)
}

/// Approves the pending transaction belonging to a deposit, refreshing the
/// net amount and audit description computed at settlement time. The status
/// guard means a concurrent transition finds no row.
pub async fn approve_for_deposit(
    conn: &mut PgConnection,
    deposit_id: &str,
    amount: Decimal,
    description: &str,
) -> Result<Option<Transaction>, RepositoryError> {
    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET status = $4, amount = $2, description = $3, updated_at = CURRENT_TIMESTAMP
        WHERE deposit_id = $1 AND status = $5
        RETURNING *
        "#,
    )
    .bind(deposit_id)
    .bind(amount)
    .bind(description)
    .bind(TransactionStatus::Approved.as_str())
    .bind(TransactionStatus::Pending.as_str())
    .fetch_optional(conn)
    .await?;

    Ok(transaction)
}

pub async fn approve_for_withdrawal(
    conn: &mut PgConnection,
    withdrawal_id: &str,
    description: &str,
) -> Result<Option<Transaction>, RepositoryError> {
    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET status = $3, description = $2, updated_at = CURRENT_TIMESTAMP
        WHERE withdrawal_id = $1 AND status = $4
        RETURNING *
        "#,
    )
    .bind(withdrawal_id)
    .bind(description)
    .bind(TransactionStatus::Approved.as_str())
    .bind(TransactionStatus::Pending.as_str())
    .fetch_optional(conn)
    .await?;

    Ok(transaction)
}

pub async fn cancel_for_withdrawal(
    conn: &mut PgConnection,
    withdrawal_id: &str,
    description: &str,
) -> Result<Option<Transaction>, RepositoryError> {
    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET status = $3, description = $2, updated_at = CURRENT_TIMESTAMP
        WHERE withdrawal_id = $1 AND status = $4
        RETURNING *
        "#,
    )
    .bind(withdrawal_id)
    .bind(description)
    .bind(TransactionStatus::Cancelled.as_str())
    .bind(TransactionStatus::Pending.as_str())
    .fetch_optional(conn)
    .await?;

    Ok(transaction)
}
