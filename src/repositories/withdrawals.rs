use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{balances, transactions, users, RepositoryError};
use crate::fees::FeeSchedule;
use crate::models::transactions::{Transaction, TransactionType};
use crate::models::withdrawals::{Withdrawal, WithdrawalStatus};

#[derive(Clone)]
pub struct WithdrawalRepository {
    conn: PgPool,
}

impl WithdrawalRepository {
    pub fn new(conn: PgPool) -> Self {
        WithdrawalRepository { conn }
    }

    /// Persists a requested withdrawal and its pending transaction. No
    /// balance is touched until approval.
    pub async fn create(
        &self,
        user_id: &str,
        amount: Decimal,
        pix_key_type: &str,
        pix_key: &str,
    ) -> Result<(Withdrawal, Transaction), RepositoryError> {
        let withdrawal_id = Uuid::new_v4().hyphenated().to_string();
        let mut tx = self.conn.begin().await?;

        let withdrawal = sqlx::query_as::<_, Withdrawal>(
            r#"
            INSERT INTO withdrawals (id, user_id, amount, pix_key_type, pix_key, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&withdrawal_id)
        .bind(user_id)
        .bind(amount)
        .bind(pix_key_type)
        .bind(pix_key)
        .bind(WithdrawalStatus::Requested.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let description = format!("PIX withdrawal to {} key", pix_key_type);
        let transaction = transactions::insert_pending(
            &mut *tx,
            user_id,
            TransactionType::Withdrawal,
            amount,
            &description,
            None,
            Some(&withdrawal_id),
        )
        .await?;

        tx.commit().await?;

        Ok((withdrawal, transaction))
    }

    /// Approves a requested withdrawal: row lock, sufficiency-checked debit,
    /// status transition and transaction approval in one database
    /// transaction. Concurrent decisions serialize on the lock; the loser
    /// sees a terminal status and gets the conflict.
    pub async fn approve(
        &self,
        withdrawal_id: &str,
        defaults: &FeeSchedule,
    ) -> Result<(Withdrawal, Transaction), RepositoryError> {
        let mut tx = self.conn.begin().await?;

        let withdrawal = lock_requested(&mut *tx, withdrawal_id).await?;

        let schedule = withdrawal_schedule(&mut *tx, &withdrawal.user_id, defaults).await?;
        let fees = schedule
            .breakdown(withdrawal.amount)
            .map_err(|e| RepositoryError::Validation(e.to_string()))?;

        balances::debit(&mut *tx, &withdrawal.user_id, withdrawal.amount).await?;

        let withdrawal = sqlx::query_as::<_, Withdrawal>(
            r#"
            UPDATE withdrawals SET status = $2
            WHERE id = $1 AND status = $3
            RETURNING *
            "#,
        )
        .bind(withdrawal_id)
        .bind(WithdrawalStatus::Approved.as_str())
        .bind(WithdrawalStatus::Requested.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            RepositoryError::Conflict(format!("withdrawal {} is not requested", withdrawal_id))
        })?;

        let description = fees.describe("PIX withdrawal");
        let transaction = transactions::approve_for_withdrawal(&mut *tx, withdrawal_id, &description)
            .await?
            .ok_or_else(|| {
                RepositoryError::Conflict(format!(
                    "no pending transaction for withdrawal {}",
                    withdrawal_id
                ))
            })?;

        tx.commit().await?;

        Ok((withdrawal, transaction))
    }

    /// Rejects a requested withdrawal. Terminal states conflict rather than
    /// silently no-op so a racing caller can detect it lost.
    pub async fn reject(
        &self,
        withdrawal_id: &str,
    ) -> Result<(Withdrawal, Transaction), RepositoryError> {
        let mut tx = self.conn.begin().await?;

        lock_requested(&mut *tx, withdrawal_id).await?;

        let withdrawal = sqlx::query_as::<_, Withdrawal>(
            r#"
            UPDATE withdrawals SET status = $2
            WHERE id = $1 AND status = $3
            RETURNING *
            "#,
        )
        .bind(withdrawal_id)
        .bind(WithdrawalStatus::Rejected.as_str())
        .bind(WithdrawalStatus::Requested.as_str())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            RepositoryError::Conflict(format!("withdrawal {} is not requested", withdrawal_id))
        })?;

        let transaction = transactions::cancel_for_withdrawal(
            &mut *tx,
            withdrawal_id,
            "PIX withdrawal rejected",
        )
        .await?
        .ok_or_else(|| {
            RepositoryError::Conflict(format!(
                "no pending transaction for withdrawal {}",
                withdrawal_id
            ))
        })?;

        tx.commit().await?;

        Ok((withdrawal, transaction))
    }
}

async fn lock_requested(
    conn: &mut PgConnection,
    withdrawal_id: &str,
) -> Result<Withdrawal, RepositoryError> {
    let withdrawal =
        sqlx::query_as::<_, Withdrawal>("SELECT * FROM withdrawals WHERE id = $1 FOR UPDATE")
            .bind(withdrawal_id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("withdrawal {}", withdrawal_id)))?;

    if withdrawal.status != WithdrawalStatus::Requested.as_str() {
        return Err(RepositoryError::Conflict(format!(
            "withdrawal {} already {}",
            withdrawal_id, withdrawal.status
        )));
    }

    Ok(withdrawal)
}

async fn withdrawal_schedule(
    conn: &mut PgConnection,
    user_id: &str,
    defaults: &FeeSchedule,
) -> Result<FeeSchedule, RepositoryError> {
    let schedule = match users::fee_settings(conn, user_id).await? {
        Some(settings) => defaults
            .with_percent(settings.withdrawal_fee_percent)
            .map_err(|e| RepositoryError::Validation(e.to_string()))?,
        None => *defaults,
    };

    Ok(schedule)
}
