use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::fees::FeeSchedule;
use crate::repositories::rate_limits::RateLimitRepository;
use crate::repositories::RepositoryError;
use crate::settings::Settings;

mod deposits;
mod http;
mod notifications;
mod webhooks;
mod withdrawals;

#[derive(Debug, thiserror::Error)]
enum ServiceError {
    #[error("Authentication failed")]
    Unauthorized,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Insufficient balance")]
    InsufficientBalance,
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Database error: {0}")]
    Database(String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
    #[error("External service error: {0} -> {1} => {2}")]
    ExternalService(String, String, String),
}

impl From<RepositoryError> for ServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(what) => ServiceError::NotFound(what),
            RepositoryError::Conflict(what) => ServiceError::Conflict(what),
            RepositoryError::InsufficientBalance => ServiceError::InsufficientBalance,
            RepositoryError::Validation(what) => ServiceError::Validation(what),
            RepositoryError::Sqlx(e) => ServiceError::Database(e.to_string()),
        }
    }
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

pub async fn start_services(pool: PgPool, settings: Settings) -> Result<(), anyhow::Error> {
    let deposit_fees = FeeSchedule::new(settings.fees.deposit_percent, settings.fees.fixed)
        .map_err(|e| anyhow::anyhow!("Invalid deposit fee settings: {}", e))?;
    let withdrawal_fees = FeeSchedule::new(settings.fees.withdrawal_percent, settings.fees.fixed)
        .map_err(|e| anyhow::anyhow!("Invalid withdrawal fee settings: {}", e))?;

    let (webhook_tx, mut webhook_rx) = mpsc::channel(512);
    let (deposit_tx, mut deposit_rx) = mpsc::channel(512);
    let (withdrawal_tx, mut withdrawal_rx) = mpsc::channel(512);
    let (notification_tx, mut notification_rx) = mpsc::channel(512);

    let mut webhook_service = webhooks::WebhookService::new();
    let mut deposit_service = deposits::DepositService::new();
    let mut withdrawal_service = withdrawals::WithdrawalService::new();
    let mut notification_service = notifications::NotificationService::new();

    log::info!("Starting notification service.");
    let notification_pool = pool.clone();
    tokio::spawn(async move {
        notification_service
            .run(
                notifications::NotificationRequestHandler::new(notification_pool),
                &mut notification_rx,
            )
            .await;
    });

    log::info!("Starting webhook service.");
    let webhook_pool = pool.clone();
    let webhook_notification_tx = notification_tx.clone();
    tokio::spawn(async move {
        webhook_service
            .run(
                webhooks::WebhookRequestHandler::new(
                    webhook_pool,
                    deposit_fees,
                    webhook_notification_tx,
                ),
                &mut webhook_rx,
            )
            .await;
    });

    log::info!("Starting deposit service.");
    let deposit_pool = pool.clone();
    let provider_auth_token = settings.provider.auth_token.clone();
    let provider_url = settings.provider.url.clone();
    tokio::spawn(async move {
        deposit_service
            .run(
                deposits::DepositRequestHandler::new(
                    deposit_pool,
                    provider_auth_token,
                    provider_url,
                    deposit_fees,
                ),
                &mut deposit_rx,
            )
            .await;
    });

    log::info!("Starting withdrawal service.");
    let withdrawal_pool = pool.clone();
    let withdrawal_notification_tx = notification_tx.clone();
    tokio::spawn(async move {
        withdrawal_service
            .run(
                withdrawals::WithdrawalRequestHandler::new(
                    withdrawal_pool,
                    withdrawal_fees,
                    withdrawal_notification_tx,
                ),
                &mut withdrawal_rx,
            )
            .await;
    });

    log::info!("Starting rate limit pruning task.");
    let prune_repository = RateLimitRepository::new(pool.clone());
    let window_secs = settings.rate_limit.window_secs;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            let cutoff = chrono::Utc::now().timestamp() - window_secs.max(1) * 2;
            match prune_repository.prune(cutoff).await {
                Ok(0) => {}
                Ok(n) => log::debug!("Pruned {} expired rate limit windows.", n),
                Err(e) => log::warn!("Could not prune rate limit windows: {}", e),
            }
        }
    });

    log::info!("Starting HTTP server.");
    http::start_http_server(pool, settings, webhook_tx, deposit_tx, withdrawal_tx).await?;

    Ok(())
}
