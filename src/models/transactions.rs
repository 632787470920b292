use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ledger-facing record. Exactly one non-terminal transaction exists per
/// originating deposit or withdrawal; lifecycle changes mutate the row in
/// place instead of inserting a second record.
#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: String,
    pub code: String,
    pub user_id: String,
    pub tx_type: String,
    /// Net amount, after platform fees.
    pub amount: Decimal,
    pub status: String,
    pub description: String,
    pub deposit_id: Option<String>,
    pub withdrawal_id: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Payment,
    Refund,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Payment => "payment",
            TransactionType::Refund => "refund",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "deposit" => Some(TransactionType::Deposit),
            "withdrawal" => Some(TransactionType::Withdrawal),
            "payment" => Some(TransactionType::Payment),
            "refund" => Some(TransactionType::Refund),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Approved,
    Cancelled,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Approved => "approved",
            TransactionStatus::Cancelled => "cancelled",
            TransactionStatus::Refunded => "refunded",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(TransactionStatus::Pending),
            "approved" => Some(TransactionStatus::Approved),
            "cancelled" => Some(TransactionStatus::Cancelled),
            "refunded" => Some(TransactionStatus::Refunded),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }

    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (
                TransactionStatus::Pending,
                TransactionStatus::Approved
                    | TransactionStatus::Cancelled
                    | TransactionStatus::Refunded
            )
        )
    }
}

/// Short human-readable code shown on statements, e.g. `TX-9F04A1BC`.
pub fn new_code() -> String {
    let id = Uuid::new_v4().simple().to_string();

    format!("TX-{}", id[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_is_the_only_non_terminal_status() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Approved.is_terminal());
        assert!(TransactionStatus::Cancelled.is_terminal());
        assert!(TransactionStatus::Refunded.is_terminal());
    }

    #[test]
    fn transitions_only_leave_pending() {
        let all = [
            TransactionStatus::Pending,
            TransactionStatus::Approved,
            TransactionStatus::Cancelled,
            TransactionStatus::Refunded,
        ];

        for next in all {
            assert_eq!(
                TransactionStatus::Pending.can_transition_to(next),
                next != TransactionStatus::Pending
            );
        }

        for terminal in [
            TransactionStatus::Approved,
            TransactionStatus::Cancelled,
            TransactionStatus::Refunded,
        ] {
            for next in all {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            TransactionStatus::Pending,
            TransactionStatus::Approved,
            TransactionStatus::Cancelled,
            TransactionStatus::Refunded,
        ] {
            assert_eq!(TransactionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TransactionStatus::parse("done"), None);
    }

    #[test]
    fn type_round_trips_through_strings() {
        for tx_type in [
            TransactionType::Deposit,
            TransactionType::Withdrawal,
            TransactionType::Payment,
            TransactionType::Refund,
        ] {
            assert_eq!(TransactionType::parse(tx_type.as_str()), Some(tx_type));
        }
    }

    #[test]
    fn codes_are_short_and_prefixed() {
        let code = new_code();

        assert!(code.starts_with("TX-"));
        assert_eq!(code.len(), 11);
        assert!(code[3..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
