//! Platform commission calculation.
//!
//! A pure calculator with a fixed basis-point rate, applied at settlement
//! time. Integer arithmetic on minor units keeps the split exact: the
//! commission is rounded half-up and the net is derived by subtraction, so
//! `commission + net == gross` always holds.

use crate::domain::foundation::Money;

/// Default platform fee: 10%.
pub const DEFAULT_COMMISSION_RATE_BPS: u16 = 1_000;

/// Result of splitting a gross amount into platform fee and seller share.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionBreakdown {
    /// Platform fee deducted from the gross amount.
    pub commission: Money,

    /// Amount owed to the seller.
    pub net: Money,
}

/// Pure commission calculator with a fixed percentage rate.
#[derive(Debug, Clone, Copy)]
pub struct CommissionCalculator {
    rate_bps: u16,
}

impl CommissionCalculator {
    /// Creates a calculator with the given rate in basis points
    /// (100 bps = 1%).
    pub fn new(rate_bps: u16) -> Self {
        Self { rate_bps }
    }

    /// Returns the configured rate in basis points.
    pub fn rate_bps(&self) -> u16 {
        self.rate_bps
    }

    /// Splits a gross amount into commission and net.
    ///
    /// The commission is rounded half-up on minor units; the net is the
    /// exact remainder.
    pub fn calculate(&self, gross: Money) -> CommissionBreakdown {
        let gross_minor = i128::from(gross.minor());
        let rate = i128::from(self.rate_bps);
        let commission_minor = (gross_minor * rate + 5_000) / 10_000;
        let commission = Money::from_minor(commission_minor as i64);
        CommissionBreakdown {
            commission,
            net: gross - commission,
        }
    }
}

impl Default for CommissionCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_COMMISSION_RATE_BPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ten_percent_of_two_hundred() {
        let calc = CommissionCalculator::default();
        let split = calc.calculate(Money::from_major(200));
        assert_eq!(split.commission, Money::from_major(20));
        assert_eq!(split.net, Money::from_major(180));
    }

    #[test]
    fn ten_percent_of_fifty() {
        let calc = CommissionCalculator::default();
        let split = calc.calculate(Money::from_major(50));
        assert_eq!(split.commission, Money::from_major(5));
        assert_eq!(split.net, Money::from_major(45));
    }

    #[test]
    fn odd_amounts_round_half_up() {
        let calc = CommissionCalculator::default();
        // 10% of 0.05 is 0.005, rounds up to 0.01
        let split = calc.calculate(Money::from_minor(5));
        assert_eq!(split.commission, Money::from_minor(1));
        assert_eq!(split.net, Money::from_minor(4));
    }

    #[test]
    fn zero_rate_takes_nothing() {
        let calc = CommissionCalculator::new(0);
        let split = calc.calculate(Money::from_major(100));
        assert_eq!(split.commission, Money::ZERO);
        assert_eq!(split.net, Money::from_major(100));
    }

    proptest! {
        #[test]
        fn split_always_sums_to_gross(
            minor in 0i64..=1_000_000_000,
            rate_bps in 0u16..=10_000,
        ) {
            let gross = Money::from_minor(minor);
            let split = CommissionCalculator::new(rate_bps).calculate(gross);
            prop_assert_eq!(split.commission + split.net, gross);
            prop_assert!(split.commission >= Money::ZERO);
            prop_assert!(split.net >= Money::ZERO);
            prop_assert!(split.commission <= gross);
        }
    }
}
