use serde::{Deserialize, Serialize};

/// Merchant-registered endpoint for outbound event notifications. Outbound
/// bodies are signed with `secret` the same way the provider signs ours.
#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct WebhookRegistration {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub secret: String,
    pub active: bool,
    pub created_at: chrono::NaiveDateTime,
}
