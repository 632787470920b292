use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct Withdrawal {
    pub id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub pix_key_type: String,
    pub pix_key: String,
    pub status: String,
    pub request_date: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewWithdrawal {
    pub amount: Decimal,
    pub pix_key_type: String,
    pub pix_key: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WithdrawalStatus {
    Requested,
    Approved,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WithdrawalStatus::Requested => "requested",
            WithdrawalStatus::Approved => "approved",
            WithdrawalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "requested" => Some(WithdrawalStatus::Requested),
            "approved" => Some(WithdrawalStatus::Approved),
            "rejected" => Some(WithdrawalStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, WithdrawalStatus::Requested)
    }

    /// The balance is debited only on this transition, never on request or
    /// rejection.
    pub fn can_transition_to(self, next: WithdrawalStatus) -> bool {
        matches!(
            (self, next),
            (
                WithdrawalStatus::Requested,
                WithdrawalStatus::Approved | WithdrawalStatus::Rejected
            )
        )
    }
}

/// PIX key kinds accepted for payout destinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixKeyType {
    Cpf,
    Cnpj,
    Email,
    Phone,
    Random,
}

impl PixKeyType {
    pub fn as_str(self) -> &'static str {
        match self {
            PixKeyType::Cpf => "cpf",
            PixKeyType::Cnpj => "cnpj",
            PixKeyType::Email => "email",
            PixKeyType::Phone => "phone",
            PixKeyType::Random => "random",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "cpf" => Some(PixKeyType::Cpf),
            "cnpj" => Some(PixKeyType::Cnpj),
            "email" => Some(PixKeyType::Email),
            "phone" => Some(PixKeyType::Phone),
            "random" => Some(PixKeyType::Random),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approved_and_rejected_are_terminal() {
        assert!(!WithdrawalStatus::Requested.is_terminal());
        assert!(WithdrawalStatus::Approved.is_terminal());
        assert!(WithdrawalStatus::Rejected.is_terminal());
    }

    #[test]
    fn terminal_states_accept_no_further_transitions() {
        let all = [
            WithdrawalStatus::Requested,
            WithdrawalStatus::Approved,
            WithdrawalStatus::Rejected,
        ];

        assert!(WithdrawalStatus::Requested.can_transition_to(WithdrawalStatus::Approved));
        assert!(WithdrawalStatus::Requested.can_transition_to(WithdrawalStatus::Rejected));
        assert!(!WithdrawalStatus::Requested.can_transition_to(WithdrawalStatus::Requested));

        for terminal in [WithdrawalStatus::Approved, WithdrawalStatus::Rejected] {
            for next in all {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            WithdrawalStatus::Requested,
            WithdrawalStatus::Approved,
            WithdrawalStatus::Rejected,
        ] {
            assert_eq!(WithdrawalStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(WithdrawalStatus::parse("processed"), None);
    }

    #[test]
    fn pix_key_types_round_trip() {
        for key_type in [
            PixKeyType::Cpf,
            PixKeyType::Cnpj,
            PixKeyType::Email,
            PixKeyType::Phone,
            PixKeyType::Random,
        ] {
            assert_eq!(PixKeyType::parse(key_type.as_str()), Some(key_type));
        }
        assert_eq!(PixKeyType::parse("iban"), None);
    }
}
