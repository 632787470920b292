pub mod api_keys;
pub mod deposits;
pub mod transactions;
pub mod users;
pub mod webhooks;
pub mod withdrawals;
