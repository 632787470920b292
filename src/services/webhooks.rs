use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::{mpsc, oneshot};

use super::notifications::NotificationRequest;
use super::{RequestHandler, Service, ServiceError};
use crate::fees::FeeSchedule;
use crate::repositories::deposits::{DepositRepository, SettlementOutcome};

pub enum WebhookServiceRequest {
    /// A validated, normalized, approved provider event for a deposit.
    DepositApproved {
        deposit_id: String,
        event_ref: String,
        reported_amount: Option<Decimal>,
        response: oneshot::Sender<Result<DepositSettlement, ServiceError>>,
    },
}

pub enum DepositSettlement {
    AlreadyProcessed,
    Credited {
        deposit_id: String,
        transaction_id: String,
        net_amount: Decimal,
    },
}

#[derive(Clone)]
pub struct WebhookRequestHandler {
    repository: DepositRepository,
    deposit_fees: FeeSchedule,
    notification_channel: mpsc::Sender<NotificationRequest>,
}

impl WebhookRequestHandler {
    pub fn new(
        pool: PgPool,
        deposit_fees: FeeSchedule,
        notification_channel: mpsc::Sender<NotificationRequest>,
    ) -> Self {
        WebhookRequestHandler {
            repository: DepositRepository::new(pool),
            deposit_fees,
            notification_channel,
        }
    }

    async fn settle_deposit(
        &self,
        deposit_id: &str,
        event_ref: &str,
        reported_amount: Option<Decimal>,
    ) -> Result<DepositSettlement, ServiceError> {
        let outcome = self
            .repository
            .settle_approved(deposit_id, event_ref, &self.deposit_fees)
            .await?;

        match outcome {
            SettlementOutcome::AlreadyProcessed => {
                log::info!("Event {} already processed, acknowledging.", event_ref);
                Ok(DepositSettlement::AlreadyProcessed)
            }
            SettlementOutcome::Credited {
                deposit,
                transaction,
                fees,
            } => {
                if let Some(reported) = reported_amount {
                    // The stored gross is authoritative; a mismatch means the
                    // provider and our record disagree and needs eyes on it.
                    if reported != fees.gross {
                        log::warn!(
                            "Provider reported amount {} for deposit {}, stored gross is {}.",
                            reported,
                            deposit.id,
                            fees.gross
                        );
                    }
                }

                log::info!(
                    "Deposit {} settled: credited {} to user {}.",
                    deposit.id,
                    fees.net,
                    deposit.user_id
                );

                let notification = NotificationRequest::Dispatch {
                    user_id: deposit.user_id.clone(),
                    event: serde_json::json!({
                        "event": "deposit.completed",
                        "depositId": deposit.id.clone(),
                        "transactionId": transaction.id.clone(),
                        "transactionCode": transaction.code,
                        "grossAmount": fees.gross,
                        "netAmount": fees.net,
                    }),
                };
                if self.notification_channel.send(notification).await.is_err() {
                    log::warn!("Could not queue notification for deposit {}.", deposit.id);
                }

                Ok(DepositSettlement::Credited {
                    deposit_id: deposit.id,
                    transaction_id: transaction.id,
                    net_amount: fees.net,
                })
            }
        }
    }
}

#[async_trait]
impl RequestHandler<WebhookServiceRequest> for WebhookRequestHandler {
    async fn handle_request(&self, request: WebhookServiceRequest) {
        match request {
            WebhookServiceRequest::DepositApproved {
                deposit_id,
                event_ref,
                reported_amount,
                response,
            } => {
                let result = self
                    .settle_deposit(&deposit_id, &event_ref, reported_amount)
                    .await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct WebhookService;

impl WebhookService {
    pub fn new() -> Self {
        WebhookService {}
    }
}

#[async_trait]
impl Service<WebhookServiceRequest, WebhookRequestHandler> for WebhookService {}
