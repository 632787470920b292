use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    /// Mutated only through atomic ledger deltas; never overwritten.
    pub balance: Decimal,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

/// Per-merchant fee percentages. A missing row means platform defaults.
#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct UserSettings {
    pub user_id: String,
    pub deposit_fee_percent: Decimal,
    pub withdrawal_fee_percent: Decimal,
}
