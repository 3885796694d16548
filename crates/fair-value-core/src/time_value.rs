use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;

use crate::checked;
use crate::error::FairValueError;
use crate::types::{Money, Rate};
use crate::FairValueResult;

/// (1 + rate)^periods by repeated multiplication, so integer horizons stay exact.
/// None once the factor leaves the decimal range.
pub fn growth_factor(rate: Rate, periods: u32) -> Option<Decimal> {
    let one_plus_r = Decimal::ONE.checked_add(rate)?;
    let mut factor = Decimal::ONE;
    for _ in 0..periods {
        factor = factor.checked_mul(one_plus_r)?;
    }
    Some(factor)
}

fn horizon_too_long(periods: u32) -> FairValueError {
    FairValueError::invalid(
        "forecast_years",
        format!("Compounding over {periods} periods exceeds the representable decimal range"),
    )
}

/// Compound `amount` forward at `rate` for `periods` years.
pub fn compound(amount: Money, rate: Rate, periods: u32) -> FairValueResult<Money> {
    if rate <= Decimal::NEGATIVE_ONE {
        return Err(FairValueError::invalid(
            "growth_rate",
            "Growth rate must be greater than -100%",
        ));
    }
    let factor = growth_factor(rate, periods).ok_or_else(|| horizon_too_long(periods))?;
    amount
        .checked_mul(factor)
        .ok_or_else(|| horizon_too_long(periods))
}

/// Discount factor 1 / (1 + rate)^t.
///
/// With `mid_period` the cash flow is assumed to arrive half way through the
/// period, so t = periods - 0.5.
pub fn discount_factor(rate: Rate, periods: u32, mid_period: bool) -> FairValueResult<Decimal> {
    if rate <= Decimal::NEGATIVE_ONE {
        return Err(FairValueError::invalid(
            "discount_rate",
            "Discount rate must be greater than -100%",
        ));
    }

    let factor = if mid_period && periods > 0 {
        let one_plus_r = checked::add(Decimal::ONE, rate, "discount_rate")?;
        let half = one_plus_r.sqrt().ok_or_else(|| {
            FairValueError::invalid("discount_rate", "Square root of 1 + rate is undefined")
        })?;
        growth_factor(rate, periods - 1).and_then(|f| f.checked_mul(half))
    } else {
        growth_factor(rate, periods)
    };
    let denominator = factor.ok_or_else(|| horizon_too_long(periods))?;

    if denominator.is_zero() {
        return Err(FairValueError::invalid(
            "discount_rate",
            format!("Discount factor at period {periods} is undefined"),
        ));
    }

    checked::div(Decimal::ONE, denominator, "discount_rate")
}

/// Present value of a single amount received at the end of `periods`.
pub fn present_value(amount: Money, rate: Rate, periods: u32) -> FairValueResult<Money> {
    let df = discount_factor(rate, periods, false)?;
    checked::mul(amount, df, "forecast_years")
}

/// Gordon growth (perpetuity with growth) value one period after `final_cash_flow`:
/// CF * (1 + g) / (r - g).
pub fn gordon_growth_value(
    final_cash_flow: Money,
    discount_rate: Rate,
    growth_rate: Rate,
) -> FairValueResult<Money> {
    let spread = checked::sub(discount_rate, growth_rate, "terminal_growth_rate")?;
    if spread <= Decimal::ZERO {
        return Err(FairValueError::invalid(
            "terminal_growth_rate",
            format!(
                "Discount rate ({discount_rate}) must exceed terminal growth rate ({growth_rate})"
            ),
        ));
    }
    let one_plus_g = checked::add(Decimal::ONE, growth_rate, "terminal_growth_rate")?;
    let next_cash_flow = checked::mul(final_cash_flow, one_plus_g, "terminal_growth_rate")?;
    checked::div(next_cash_flow, spread, "terminal_growth_rate")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_growth_factor_exact() {
        assert_eq!(growth_factor(dec!(0.10), 3), Some(dec!(1.331)));
        assert_eq!(growth_factor(dec!(0.10), 0), Some(Decimal::ONE));
    }

    #[test]
    fn test_growth_factor_out_of_range() {
        // 1.1^700 is around 1e29, past Decimal::MAX
        assert_eq!(growth_factor(dec!(0.10), 700), None);
    }

    #[test]
    fn test_long_horizon_compounding_is_an_error() {
        match compound(dec!(100), dec!(0.10), 700) {
            Err(FairValueError::InvalidInput { field, .. }) => assert_eq!(field, "forecast_years"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
        assert!(discount_factor(dec!(0.10), 700, false).is_err());
        assert!(discount_factor(dec!(0.10), 700, true).is_err());
    }

    #[test]
    fn test_gordon_growth_overflow_is_an_error() {
        assert!(gordon_growth_value(Decimal::MAX, dec!(0.10), dec!(0.02)).is_err());
    }

    #[test]
    fn test_compound_rejects_total_loss_rate() {
        assert!(compound(dec!(100), dec!(-1), 2).is_err());
        assert_eq!(compound(dec!(100), dec!(-0.5), 2).unwrap(), dec!(25));
    }

    #[test]
    fn test_discount_factor_end_of_year() {
        let df = discount_factor(dec!(0.10), 2, false).unwrap();
        assert_eq!(df, Decimal::ONE / dec!(1.21));
    }

    #[test]
    fn test_mid_period_discounts_less() {
        let end = discount_factor(dec!(0.10), 3, false).unwrap();
        let mid = discount_factor(dec!(0.10), 3, true).unwrap();
        assert!(mid > end);
    }

    #[test]
    fn test_present_value_zero_rate() {
        assert_eq!(present_value(dec!(250), Decimal::ZERO, 7).unwrap(), dec!(250));
    }

    #[test]
    fn test_gordon_growth() {
        // 100 * 1.02 / 0.08 = 1275
        let tv = gordon_growth_value(dec!(100), dec!(0.10), dec!(0.02)).unwrap();
        assert_eq!(tv, dec!(1275));
    }

    #[test]
    fn test_gordon_growth_equal_rates_rejected() {
        assert!(gordon_growth_value(dec!(100), dec!(0.08), dec!(0.08)).is_err());
        assert!(gordon_growth_value(dec!(100), dec!(0.05), dec!(0.08)).is_err());
    }
}
