use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Deposit {
    pub id: String,
    pub user_id: String,
    /// Gross amount charged to the payer. The merchant balance is credited
    /// with the fee-adjusted net, never this value.
    pub amount: Decimal,
    pub status: String,
    pub qr_code: String,
    pub provider_id: String,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewDeposit {
    pub amount: Decimal,
}

/// Charge created at the payment provider for a deposit request.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCharge {
    pub id: String,
    pub qr_code: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepositStatus {
    Waiting,
    Completed,
    Expired,
}

impl DepositStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DepositStatus::Waiting => "waiting",
            DepositStatus::Completed => "completed",
            DepositStatus::Expired => "expired",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "waiting" => Some(DepositStatus::Waiting),
            "completed" => Some(DepositStatus::Completed),
            "expired" => Some(DepositStatus::Expired),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            DepositStatus::Waiting,
            DepositStatus::Completed,
            DepositStatus::Expired,
        ] {
            assert_eq!(DepositStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DepositStatus::parse("paid"), None);
    }
}
