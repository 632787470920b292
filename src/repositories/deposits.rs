use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::{balances, events, transactions, users, RepositoryError};
use crate::fees::{FeeBreakdown, FeeSchedule};
use crate::models::deposits::{Deposit, DepositStatus, ProviderCharge};
use crate::models::transactions::{Transaction, TransactionType};

pub enum SettlementOutcome {
    /// The event reference was already claimed; nothing was changed.
    AlreadyProcessed,
    Credited {
        deposit: Deposit,
        transaction: Transaction,
        fees: FeeBreakdown,
    },
}

#[derive(Clone)]
pub struct DepositRepository {
    conn: PgPool,
}

impl DepositRepository {
    pub fn new(conn: PgPool) -> Self {
        DepositRepository { conn }
    }

    /// Persists a waiting deposit and its pending transaction in one
    /// database transaction. The transaction amount is the net under the
    /// merchant's current schedule; settlement recomputes it before approval.
    pub async fn create(
        &self,
        deposit_id: &str,
        user_id: &str,
        amount: Decimal,
        charge: &ProviderCharge,
        defaults: &FeeSchedule,
    ) -> Result<(Deposit, Transaction), RepositoryError> {
        let mut tx = self.conn.begin().await?;

        let schedule = deposit_schedule(&mut *tx, user_id, defaults).await?;
        let fees = schedule
            .breakdown(amount)
            .map_err(|e| RepositoryError::Validation(e.to_string()))?;

        let deposit = sqlx::query_as::<_, Deposit>(
            r#"
            INSERT INTO deposits (id, user_id, amount, status, qr_code, provider_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(deposit_id)
        .bind(user_id)
        .bind(amount)
        .bind(DepositStatus::Waiting.as_str())
        .bind(&charge.qr_code)
        .bind(&charge.id)
        .fetch_one(&mut *tx)
        .await?;

        let transaction = transactions::insert_pending(
            &mut *tx,
            user_id,
            TransactionType::Deposit,
            fees.net,
            &fees.describe("PIX deposit"),
            Some(deposit_id),
            None,
        )
        .await?;

        tx.commit().await?;

        Ok((deposit, transaction))
    }

    /// Applies an approved provider event exactly once: idempotency claim,
    /// fee computation, atomic balance credit, deposit completion and
    /// transaction approval all commit together or roll back together —
    /// including the claim, so a retried delivery can reprocess a failure.
    pub async fn settle_approved(
        &self,
        deposit_id: &str,
        event_ref: &str,
        defaults: &FeeSchedule,
    ) -> Result<SettlementOutcome, RepositoryError> {
        let mut tx = self.conn.begin().await?;

        if !events::try_claim(&mut *tx, event_ref).await? {
            return Ok(SettlementOutcome::AlreadyProcessed);
        }

        let deposit = sqlx::query_as::<_, Deposit>("SELECT * FROM deposits WHERE id = $1 FOR UPDATE")
            .bind(deposit_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("deposit {}", deposit_id)))?;

        if deposit.status != DepositStatus::Waiting.as_str() {
            return Ok(SettlementOutcome::AlreadyProcessed);
        }

        let schedule = deposit_schedule(&mut *tx, &deposit.user_id, defaults).await?;
        let fees = schedule
            .breakdown(deposit.amount)
            .map_err(|e| RepositoryError::Validation(e.to_string()))?;

        balances::credit(&mut *tx, &deposit.user_id, fees.net).await?;

        let deposit = sqlx::query_as::<_, Deposit>(
            "UPDATE deposits SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(deposit_id)
        .bind(DepositStatus::Completed.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let transaction = transactions::approve_for_deposit(
            &mut *tx,
            deposit_id,
            fees.net,
            &fees.describe("PIX deposit"),
        )
        .await?
        .ok_or_else(|| {
            RepositoryError::Conflict(format!("no pending transaction for deposit {}", deposit_id))
        })?;

        tx.commit().await?;

        Ok(SettlementOutcome::Credited {
            deposit,
            transaction,
            fees,
        })
    }
}

async fn deposit_schedule(
    conn: &mut sqlx::PgConnection,
    user_id: &str,
    defaults: &FeeSchedule,
) -> Result<FeeSchedule, RepositoryError> {
    let schedule = match users::fee_settings(conn, user_id).await? {
        Some(settings) => defaults
            .with_percent(settings.deposit_fee_percent)
            .map_err(|e| RepositoryError::Validation(e.to_string()))?,
        None => *defaults,
    };

    Ok(schedule)
}

pub fn new_deposit_id() -> String {
    Uuid::new_v4().hyphenated().to_string()
}
