pub mod api_keys;
pub mod balances;
pub mod deposits;
pub mod events;
pub mod provider;
pub mod rate_limits;
pub mod registrations;
pub mod transactions;
pub mod users;
pub mod withdrawals;

/// Storage-layer error. Domain conditions stay typed so the service layer
/// can map them to the right response class without string matching.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("conflicting state: {0}")]
    Conflict(String),
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
