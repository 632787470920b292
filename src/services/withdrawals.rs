use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::{mpsc, oneshot};

use super::notifications::NotificationRequest;
use super::{RequestHandler, Service, ServiceError};
use crate::fees::FeeSchedule;
use crate::models::transactions::Transaction;
use crate::models::withdrawals::{PixKeyType, Withdrawal};
use crate::repositories::withdrawals::WithdrawalRepository;

pub enum WithdrawalServiceRequest {
    NewWithdrawal {
        user_id: String,
        amount: Decimal,
        pix_key_type: String,
        pix_key: String,
        response: oneshot::Sender<Result<Withdrawal, ServiceError>>,
    },
    Approve {
        withdrawal_id: String,
        response: oneshot::Sender<Result<WithdrawalDecision, ServiceError>>,
    },
    Reject {
        withdrawal_id: String,
        response: oneshot::Sender<Result<WithdrawalDecision, ServiceError>>,
    },
}

pub struct WithdrawalDecision {
    pub withdrawal: Withdrawal,
    pub transaction: Transaction,
}

#[derive(Clone)]
pub struct WithdrawalRequestHandler {
    repository: WithdrawalRepository,
    withdrawal_fees: FeeSchedule,
    notification_channel: mpsc::Sender<NotificationRequest>,
}

impl WithdrawalRequestHandler {
    pub fn new(
        pool: PgPool,
        withdrawal_fees: FeeSchedule,
        notification_channel: mpsc::Sender<NotificationRequest>,
    ) -> Self {
        WithdrawalRequestHandler {
            repository: WithdrawalRepository::new(pool),
            withdrawal_fees,
            notification_channel,
        }
    }

    async fn new_withdrawal(
        &self,
        user_id: &str,
        amount: Decimal,
        pix_key_type: &str,
        pix_key: &str,
    ) -> Result<Withdrawal, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::Validation(
                "amount must be positive".to_string(),
            ));
        }

        let key_type = PixKeyType::parse(pix_key_type).ok_or_else(|| {
            ServiceError::Validation(format!("unknown pix key type: {}", pix_key_type))
        })?;

        if pix_key.trim().is_empty() {
            return Err(ServiceError::Validation("pix key must not be empty".to_string()));
        }

        let (withdrawal, _transaction) = self
            .repository
            .create(user_id, amount, key_type.as_str(), pix_key.trim())
            .await?;

        log::info!("Created withdrawal {} for user {}.", withdrawal.id, user_id);

        Ok(withdrawal)
    }

    async fn approve(&self, withdrawal_id: &str) -> Result<WithdrawalDecision, ServiceError> {
        let (withdrawal, transaction) = self
            .repository
            .approve(withdrawal_id, &self.withdrawal_fees)
            .await?;

        log::info!(
            "Withdrawal {} approved: debited {} from user {}.",
            withdrawal.id,
            withdrawal.amount,
            withdrawal.user_id
        );

        self.notify(&withdrawal, "withdrawal.approved").await;

        Ok(WithdrawalDecision {
            withdrawal,
            transaction,
        })
    }

    async fn reject(&self, withdrawal_id: &str) -> Result<WithdrawalDecision, ServiceError> {
        let (withdrawal, transaction) = self.repository.reject(withdrawal_id).await?;

        log::info!("Withdrawal {} rejected.", withdrawal.id);

        self.notify(&withdrawal, "withdrawal.rejected").await;

        Ok(WithdrawalDecision {
            withdrawal,
            transaction,
        })
    }

    async fn notify(&self, withdrawal: &Withdrawal, event: &str) {
        let notification = NotificationRequest::Dispatch {
            user_id: withdrawal.user_id.clone(),
            event: serde_json::json!({
                "event": event,
                "withdrawalId": withdrawal.id.clone(),
                "amount": withdrawal.amount,
            }),
        };

        if self.notification_channel.send(notification).await.is_err() {
            log::warn!(
                "Could not queue notification for withdrawal {}.",
                withdrawal.id
            );
        }
    }
}

#[async_trait]
impl RequestHandler<WithdrawalServiceRequest> for WithdrawalRequestHandler {
    async fn handle_request(&self, request: WithdrawalServiceRequest) {
        match request {
            WithdrawalServiceRequest::NewWithdrawal {
                user_id,
                amount,
                pix_key_type,
                pix_key,
                response,
            } => {
                let withdrawal = self
                    .new_withdrawal(&user_id, amount, &pix_key_type, &pix_key)
                    .await;
                let _ = response.send(withdrawal);
            }
            WithdrawalServiceRequest::Approve {
                withdrawal_id,
                response,
            } => {
                let decision = self.approve(&withdrawal_id).await;
                let _ = response.send(decision);
            }
            WithdrawalServiceRequest::Reject {
                withdrawal_id,
                response,
            } => {
                let decision = self.reject(&withdrawal_id).await;
                let _ = response.send(decision);
            }
        }
    }
}

pub struct WithdrawalService;

impl WithdrawalService {
    pub fn new() -> Self {
        WithdrawalService {}
    }
}

#[async_trait]
impl Service<WithdrawalServiceRequest, WithdrawalRequestHandler> for WithdrawalService {}
