use rust_decimal::Decimal;
use serde_json::Value;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("missing or malformed field: {0}")]
    MissingField(&'static str),
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// Provider event after boundary normalization. The provider's payload shape
/// varies (`status` vs `data.status`, `externalRef` vs `externalId`); nothing
/// downstream of this module sees the raw JSON.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderEvent {
    pub status: String,
    pub reference: String,
    pub amount: Option<Decimal>,
    status_nested: bool,
}

impl ProviderEvent {
    /// Statuses the provider uses for a settled PIX charge. `paid` counts
    /// only when carried under `data.status`, which is the shape the
    /// provider's newer callback format emits.
    pub fn is_approved(&self) -> bool {
        match self.status.as_str() {
            "approved" | "Compra Aprovada" => true,
            "paid" => self.status_nested,
            _ => false,
        }
    }
}

/// Structural validation plus normalization of an inbound event body.
/// Rejections carry the offending field; no side effects have happened yet.
pub fn normalize(body: &Value) -> Result<ProviderEvent, PayloadError> {
    let data = body.get("data");

    let (status, status_nested) = match body.get("status") {
        Some(Value::String(s)) => (s.clone(), false),
        _ => match data.and_then(|d| d.get("status")) {
            Some(Value::String(s)) => (s.clone(), true),
            _ => return Err(PayloadError::MissingField("status")),
        },
    };

    let reference = ["externalRef", "externalId"]
        .iter()
        .find_map(|key| {
            body.get(*key)
                .or_else(|| data.and_then(|d| d.get(*key)))
                .and_then(Value::as_str)
        })
        .ok_or(PayloadError::MissingField("externalRef"))?
        .to_string();

    if reference.is_empty() {
        return Err(PayloadError::MissingField("externalRef"));
    }

    let amount = match body
        .get("amount")
        .or_else(|| data.and_then(|d| d.get("amount")))
    {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_amount(value)?),
    };

    Ok(ProviderEvent {
        status,
        reference,
        amount,
        status_nested,
    })
}

fn parse_amount(value: &Value) -> Result<Decimal, PayloadError> {
    let parsed = match value {
        Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
        Value::String(s) => s.parse::<Decimal>().ok(),
        _ => None,
    };

    match parsed {
        Some(amount) if amount > Decimal::ZERO => Ok(amount),
        _ => Err(PayloadError::InvalidAmount(value.to_string())),
    }
}

/// Transaction reference grammar used by the provider callbacks. Deposits use
/// `deposit_<id>`; checkout sales use `checkout_<id>_<timestamp>` and belong
/// to the checkout handler. Anything a given handler does not recognize is
/// acknowledged with 200 so the provider stops retrying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventReference {
    Deposit { deposit_id: String },
    Checkout { checkout_id: String, timestamp: i64 },
    Unrecognized,
}

impl EventReference {
    pub fn parse(raw: &str) -> Self {
        if let Some(deposit_id) = raw.strip_prefix("deposit_") {
            if !deposit_id.is_empty() {
                return EventReference::Deposit {
                    deposit_id: deposit_id.to_string(),
                };
            }
        } else if let Some(rest) = raw.strip_prefix("checkout_") {
            if let Some((checkout_id, timestamp)) = rest.rsplit_once('_') {
                if !checkout_id.is_empty() {
                    if let Ok(timestamp) = timestamp.parse::<i64>() {
                        return EventReference::Checkout {
                            checkout_id: checkout_id.to_string(),
                            timestamp,
                        };
                    }
                }
            }
        }

        EventReference::Unrecognized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn normalizes_flat_payload() {
        let body = json!({
            "status": "approved",
            "externalRef": "deposit_42",
            "amount": 500.00
        });
        let event = normalize(&body).unwrap();

        assert_eq!(event.status, "approved");
        assert_eq!(event.reference, "deposit_42");
        assert_eq!(event.amount, Some(dec!(500.0)));
        assert!(event.is_approved());
    }

    #[test]
    fn normalizes_nested_payload() {
        let body = json!({
            "data": {
                "status": "paid",
                "externalId": "deposit_42",
                "amount": "150.25"
            }
        });
        let event = normalize(&body).unwrap();

        assert_eq!(event.reference, "deposit_42");
        assert_eq!(event.amount, Some(dec!(150.25)));
        assert!(event.is_approved());
    }

    #[test]
    fn top_level_ref_wins_over_nested() {
        let body = json!({
            "status": "approved",
            "externalRef": "deposit_outer",
            "data": { "externalRef": "deposit_inner" }
        });

        assert_eq!(normalize(&body).unwrap().reference, "deposit_outer");
    }

    #[test]
    fn paid_is_only_approved_when_nested() {
        let flat = json!({ "status": "paid", "externalRef": "deposit_1" });
        let nested = json!({ "data": { "status": "paid", "externalRef": "deposit_1" } });

        assert!(!normalize(&flat).unwrap().is_approved());
        assert!(normalize(&nested).unwrap().is_approved());
    }

    #[test]
    fn portuguese_approval_status_is_recognized() {
        let body = json!({ "status": "Compra Aprovada", "externalRef": "deposit_7" });

        assert!(normalize(&body).unwrap().is_approved());
    }

    #[test]
    fn pending_and_failed_statuses_are_not_approved() {
        for status in ["pending", "expired", "failed", "refunded", ""] {
            let body = json!({ "status": status, "externalRef": "deposit_7" });
            assert!(!normalize(&body).unwrap().is_approved(), "{}", status);
        }
    }

    #[test]
    fn missing_status_names_the_field() {
        let body = json!({ "externalRef": "deposit_1" });

        assert_eq!(normalize(&body), Err(PayloadError::MissingField("status")));
    }

    #[test]
    fn missing_reference_names_the_field() {
        let body = json!({ "status": "approved" });

        assert_eq!(
            normalize(&body),
            Err(PayloadError::MissingField("externalRef"))
        );
    }

    #[test]
    fn non_string_status_is_rejected() {
        let body = json!({ "status": 7, "externalRef": "deposit_1" });

        assert_eq!(normalize(&body), Err(PayloadError::MissingField("status")));
    }

    #[test]
    fn absent_amount_is_allowed() {
        let body = json!({ "status": "approved", "externalRef": "deposit_1" });

        assert_eq!(normalize(&body).unwrap().amount, None);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        for amount in [json!(0), json!(-10.5), json!("0.00"), json!(false)] {
            let body = json!({
                "status": "approved",
                "externalRef": "deposit_1",
                "amount": amount
            });
            assert!(
                matches!(normalize(&body), Err(PayloadError::InvalidAmount(_))),
                "{}",
                amount
            );
        }
    }

    #[test]
    fn parses_deposit_references() {
        assert_eq!(
            EventReference::parse("deposit_abc-123"),
            EventReference::Deposit {
                deposit_id: "abc-123".to_string()
            }
        );
        assert_eq!(EventReference::parse("deposit_"), EventReference::Unrecognized);
    }

    #[test]
    fn parses_checkout_references() {
        assert_eq!(
            EventReference::parse("checkout_xyz_1717171717"),
            EventReference::Checkout {
                checkout_id: "xyz".to_string(),
                timestamp: 1717171717
            }
        );
        assert_eq!(
            EventReference::parse("checkout_no-timestamp"),
            EventReference::Unrecognized
        );
    }

    #[test]
    fn foreign_references_are_unrecognized() {
        for raw in ["", "order_99", "deposit", "checkout__123"] {
            assert_eq!(EventReference::parse(raw), EventReference::Unrecognized, "{}", raw);
        }
    }
}
