use rust_decimal::Decimal;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FeeError {
    #[error("percentage fee must be between 0 and 100, got {0}")]
    PercentOutOfRange(Decimal),
    #[error("fixed fee must not be negative, got {0}")]
    NegativeFixed(Decimal),
    #[error("gross amount must be positive, got {0}")]
    NonPositiveGross(Decimal),
}

/// Platform fee parameters for a single charge class. Per-merchant
/// percentage overrides replace `percent` before a breakdown is taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeSchedule {
    pub percent: Decimal,
    pub fixed: Decimal,
}

impl FeeSchedule {
    pub fn new(percent: Decimal, fixed: Decimal) -> Result<Self, FeeError> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(FeeError::PercentOutOfRange(percent));
        }
        if fixed < Decimal::ZERO {
            return Err(FeeError::NegativeFixed(fixed));
        }

        Ok(FeeSchedule { percent, fixed })
    }

    pub fn with_percent(&self, percent: Decimal) -> Result<Self, FeeError> {
        FeeSchedule::new(percent, self.fixed)
    }

    pub fn breakdown(&self, gross: Decimal) -> Result<FeeBreakdown, FeeError> {
        if gross <= Decimal::ZERO {
            return Err(FeeError::NonPositiveGross(gross));
        }

        let percent_fee = (gross * self.percent / Decimal::ONE_HUNDRED).round_dp(2);
        let fixed_fee = self.fixed.round_dp(2);
        let net = (gross - percent_fee - fixed_fee)
            .max(Decimal::ZERO)
            .round_dp(2);

        Ok(FeeBreakdown {
            gross,
            percent_fee,
            fixed_fee,
            net,
        })
    }
}

/// Itemized result of a fee computation. The percentage and fixed components
/// stay separate so ledger descriptions can be audited against the schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub gross: Decimal,
    pub percent_fee: Decimal,
    pub fixed_fee: Decimal,
    pub net: Decimal,
}

impl FeeBreakdown {
    pub fn describe(&self, label: &str) -> String {
        format!(
            "{}: gross {} - percent fee {} - fixed fee {} = net {}",
            label, self.gross, self.percent_fee, self.fixed_fee, self.net
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn net_subtracts_percent_and_fixed_components() {
        let schedule = FeeSchedule::new(dec!(11.99), dec!(1.50)).unwrap();
        let breakdown = schedule.breakdown(dec!(1000.00)).unwrap();

        assert_eq!(breakdown.percent_fee, dec!(119.90));
        assert_eq!(breakdown.fixed_fee, dec!(1.50));
        assert_eq!(breakdown.net, dec!(878.60));
    }

    #[test]
    fn net_is_clamped_at_zero() {
        let schedule = FeeSchedule::new(dec!(50), dec!(10.00)).unwrap();
        let breakdown = schedule.breakdown(dec!(5.00)).unwrap();

        assert_eq!(breakdown.net, Decimal::ZERO);
    }

    #[test]
    fn zero_percent_zero_fixed_passes_gross_through() {
        let schedule = FeeSchedule::new(Decimal::ZERO, Decimal::ZERO).unwrap();
        let breakdown = schedule.breakdown(dec!(250.00)).unwrap();

        assert_eq!(breakdown.percent_fee, Decimal::ZERO);
        assert_eq!(breakdown.net, dec!(250.00));
    }

    #[test]
    fn percent_fee_is_rounded_to_cents() {
        let schedule = FeeSchedule::new(dec!(3.33), Decimal::ZERO).unwrap();
        let breakdown = schedule.breakdown(dec!(10.00)).unwrap();

        assert_eq!(breakdown.percent_fee, dec!(0.33));
        assert_eq!(breakdown.net, dec!(9.67));
    }

    #[test]
    fn rejects_percent_out_of_range() {
        assert_eq!(
            FeeSchedule::new(dec!(100.01), Decimal::ZERO),
            Err(FeeError::PercentOutOfRange(dec!(100.01)))
        );
        assert_eq!(
            FeeSchedule::new(dec!(-1), Decimal::ZERO),
            Err(FeeError::PercentOutOfRange(dec!(-1)))
        );
    }

    #[test]
    fn rejects_negative_fixed_fee() {
        assert_eq!(
            FeeSchedule::new(Decimal::ZERO, dec!(-0.01)),
            Err(FeeError::NegativeFixed(dec!(-0.01)))
        );
    }

    #[test]
    fn rejects_non_positive_gross() {
        let schedule = FeeSchedule::new(dec!(2.5), dec!(1.00)).unwrap();

        assert_eq!(
            schedule.breakdown(Decimal::ZERO),
            Err(FeeError::NonPositiveGross(Decimal::ZERO))
        );
        assert_eq!(
            schedule.breakdown(dec!(-10)),
            Err(FeeError::NonPositiveGross(dec!(-10)))
        );
    }

    #[test]
    fn merchant_override_replaces_percent_only() {
        let schedule = FeeSchedule::new(dec!(5), dec!(1.50)).unwrap();
        let overridden = schedule.with_percent(dec!(2)).unwrap();

        assert_eq!(overridden.percent, dec!(2));
        assert_eq!(overridden.fixed, dec!(1.50));
    }

    #[test]
    fn description_itemizes_components() {
        let schedule = FeeSchedule::new(dec!(10), dec!(1.00)).unwrap();
        let breakdown = schedule.breakdown(dec!(100.00)).unwrap();

        assert_eq!(
            breakdown.describe("PIX deposit"),
            "PIX deposit: gross 100.00 - percent fee 10.00 - fixed fee 1.00 = net 89.00"
        );
    }
}
