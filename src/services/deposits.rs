use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::fees::FeeSchedule;
use crate::models::deposits::Deposit;
use crate::repositories::deposits::{self, DepositRepository};
use crate::repositories::provider::PixProviderApi;

pub enum DepositServiceRequest {
    NewDeposit {
        user_id: String,
        amount: Decimal,
        response: oneshot::Sender<Result<Deposit, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct DepositRequestHandler {
    repository: DepositRepository,
    provider: Arc<PixProviderApi>,
    deposit_fees: FeeSchedule,
}

impl DepositRequestHandler {
    pub fn new(
        pool: PgPool,
        provider_auth_token: String,
        provider_url: String,
        deposit_fees: FeeSchedule,
    ) -> Self {
        DepositRequestHandler {
            repository: DepositRepository::new(pool),
            provider: Arc::new(PixProviderApi::new(provider_auth_token, provider_url)),
            deposit_fees,
        }
    }

    async fn new_deposit(&self, user_id: &str, amount: Decimal) -> Result<Deposit, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::Validation(
                "amount must be positive".to_string(),
            ));
        }

        let deposit_id = deposits::new_deposit_id();
        let reference = format!("deposit_{}", deposit_id);

        let charge = self
            .provider
            .create_charge(amount, &reference)
            .await
            .map_err(|e| {
                ServiceError::ExternalService(
                    "DepositService".to_string(),
                    "PixProvider".to_string(),
                    e.to_string(),
                )
            })?;

        let (deposit, _transaction) = self
            .repository
            .create(&deposit_id, user_id, amount, &charge, &self.deposit_fees)
            .await?;

        log::info!("Created deposit {} for user {}.", deposit.id, user_id);

        Ok(deposit)
    }
}

#[async_trait]
impl RequestHandler<DepositServiceRequest> for DepositRequestHandler {
    async fn handle_request(&self, request: DepositServiceRequest) {
        match request {
            DepositServiceRequest::NewDeposit {
                user_id,
                amount,
                response,
            } => {
                let deposit = self.new_deposit(&user_id, amount).await;
                let _ = response.send(deposit);
            }
        }
    }
}

pub struct DepositService;

impl DepositService {
    pub fn new() -> Self {
        DepositService {}
    }
}

#[async_trait]
impl Service<DepositServiceRequest, DepositRequestHandler> for DepositService {}
