use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::checked;
use crate::error::FairValueError;
use crate::time_value::{compound, discount_factor, gordon_growth_value, present_value};
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Rate};
use crate::FairValueResult;

/// Share of enterprise value above which the terminal value triggers a warning.
const TERMINAL_VALUE_WARNING_PCT: Decimal = dec!(0.75);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input parameters for a free-cash-flow DCF valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfInput {
    /// Most recent (Year 0) free cash flow
    pub base_fcf: Money,
    /// Constant annual FCF growth over the explicit forecast
    pub growth_rate: Rate,
    /// Discount rate (usually WACC)
    pub discount_rate: Rate,
    /// Perpetual growth after the forecast horizon
    pub terminal_growth_rate: Rate,
    /// Number of explicit forecast years
    pub forecast_years: u32,
    /// Cash and equivalents added in the equity bridge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash: Option<Money>,
    /// Total debt subtracted in the equity bridge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt: Option<Money>,
    /// Diluted shares outstanding for the per-share fair value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<Decimal>,
    /// Current market price, for upside / downside
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<Money>,
    /// Discount explicit cash flows at mid-year (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mid_year_convention: Option<bool>,
    /// Reporting currency
    #[serde(default)]
    pub currency: Currency,
}

/// One year of the FCF projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedCashFlow {
    pub year: u32,
    pub fcf: Money,
    pub discount_factor: Rate,
    pub present_value: Money,
}

/// Output of the DCF valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfOutput {
    /// Year-by-year projected free cash flow
    pub projections: Vec<ProjectedCashFlow>,
    /// Gordon growth terminal value at the end of the horizon
    pub terminal_value: Money,
    /// Sum of present values of the explicit-period FCFs
    pub pv_of_fcf: Money,
    /// Present value of the terminal value
    pub pv_of_terminal: Money,
    /// Enterprise value = PV(FCFs) + PV(TV)
    pub enterprise_value: Money,
    /// Equity value = EV + cash - debt
    pub equity_value: Money,
    /// Equity value per share (if shares outstanding supplied)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fair_value_per_share: Option<Money>,
    /// Upside (+) or downside (-) vs current price, in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upside_pct: Option<Decimal>,
    /// PV of terminal value as a fraction of enterprise value
    pub terminal_value_pct: Rate,
    pub discount_rate_used: Rate,
    pub currency: Currency,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run a single-stage FCF DCF with a Gordon growth terminal value.
pub fn calculate_dcf(input: &DcfInput) -> FairValueResult<ComputationOutput<DcfOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_dcf_input(input)?;

    if input.base_fcf < Decimal::ZERO {
        warnings.push(format!(
            "Base free cash flow is negative ({}); growth compounds the deficit",
            input.base_fcf
        ));
    }

    let mid_year = input.mid_year_convention.unwrap_or(false);
    let projections = project_cash_flows(input, mid_year)?;

    let pv_of_fcf = checked::sum(projections.iter().map(|p| p.present_value), "base_fcf")?;
    let final_fcf = projections
        .last()
        .map(|p| p.fcf)
        .ok_or_else(|| FairValueError::invalid("forecast_years", "No projection years generated"))?;

    let terminal_value =
        gordon_growth_value(final_fcf, input.discount_rate, input.terminal_growth_rate)?;
    // Terminal value sits at the end of the horizon, never mid-year.
    let pv_of_terminal =
        present_value(terminal_value, input.discount_rate, input.forecast_years)?;

    let enterprise_value = checked::add(pv_of_fcf, pv_of_terminal, "base_fcf")?;

    let terminal_value_pct = if enterprise_value.is_zero() {
        Decimal::ZERO
    } else {
        checked::div(pv_of_terminal, enterprise_value, "base_fcf")?
    };
    if terminal_value_pct > TERMINAL_VALUE_WARNING_PCT {
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value; consider extending the explicit forecast period",
            checked::mul(terminal_value_pct, dec!(100), "base_fcf")?
        ));
    }

    let (equity_value, fair_value_per_share, upside_pct) =
        compute_equity_bridge(input, enterprise_value)?;
    if fair_value_per_share.is_none() {
        warnings.push("Shares outstanding not supplied; fair value per share omitted".into());
    }

    let output = DcfOutput {
        projections,
        terminal_value,
        pv_of_fcf,
        pv_of_terminal,
        enterprise_value,
        equity_value,
        fair_value_per_share,
        upside_pct,
        terminal_value_pct,
        discount_rate_used: input.discount_rate,
        currency: input.currency.clone(),
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Single-Stage FCF DCF (Gordon Growth Terminal Value)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Compound `base_fcf` at `growth_rate` for `years` periods.
///
/// Returns the projected FCF for years 1..=years.
pub fn project_fcf(base_fcf: Money, growth_rate: Rate, years: u32) -> FairValueResult<Vec<Money>> {
    if years < 1 {
        return Err(FairValueError::invalid(
            "forecast_years",
            "Forecast horizon must be at least one year",
        ));
    }
    (1..=years)
        .map(|t| compound(base_fcf, growth_rate, t))
        .collect()
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_dcf_input(input: &DcfInput) -> FairValueResult<()> {
    if input.forecast_years < 1 {
        return Err(FairValueError::invalid(
            "forecast_years",
            "Forecast horizon must be at least one year",
        ));
    }
    if input.growth_rate <= Decimal::NEGATIVE_ONE {
        return Err(FairValueError::invalid(
            "growth_rate",
            "Growth rate must be greater than -100%",
        ));
    }
    if input.discount_rate <= Decimal::NEGATIVE_ONE {
        return Err(FairValueError::invalid(
            "discount_rate",
            "Discount rate must be greater than -100%",
        ));
    }
    if input.discount_rate <= input.terminal_growth_rate {
        return Err(FairValueError::invalid(
            "terminal_growth_rate",
            format!(
                "Terminal growth rate ({}) must be less than the discount rate ({})",
                input.terminal_growth_rate, input.discount_rate
            ),
        ));
    }
    if let Some(shares) = input.shares_outstanding {
        if shares <= Decimal::ZERO {
            return Err(FairValueError::invalid(
                "shares_outstanding",
                "Shares outstanding must be positive",
            ));
        }
    }
    if let Some(price) = input.current_price {
        if price <= Decimal::ZERO {
            return Err(FairValueError::invalid(
                "current_price",
                "Current price must be positive",
            ));
        }
    }
    Ok(())
}

fn project_cash_flows(input: &DcfInput, mid_year: bool) -> FairValueResult<Vec<ProjectedCashFlow>> {
    let mut projections = Vec::with_capacity(input.forecast_years as usize);
    let mut fcf = input.base_fcf;
    let one_plus_g = checked::add(Decimal::ONE, input.growth_rate, "growth_rate")?;

    for year in 1..=input.forecast_years {
        fcf = checked::mul(fcf, one_plus_g, "forecast_years")?;
        let df = discount_factor(input.discount_rate, year, mid_year)?;
        projections.push(ProjectedCashFlow {
            year,
            fcf,
            discount_factor: df,
            present_value: checked::mul(fcf, df, "forecast_years")?,
        });
    }

    Ok(projections)
}

fn compute_equity_bridge(
    input: &DcfInput,
    enterprise_value: Money,
) -> FairValueResult<(Money, Option<Money>, Option<Decimal>)> {
    let cash = input.cash.unwrap_or(Decimal::ZERO);
    let debt = input.debt.unwrap_or(Decimal::ZERO);
    let equity_value = checked::add(enterprise_value, cash, "cash")?;
    let equity_value = checked::sub(equity_value, debt, "debt")?;

    // shares and price validated positive
    let per_share = input
        .shares_outstanding
        .map(|shares| checked::div(equity_value, shares, "shares_outstanding"))
        .transpose()?;

    let upside = match (per_share, input.current_price) {
        (Some(fair), Some(price)) => {
            let ratio = checked::div(fair, price, "current_price")?;
            let excess = checked::sub(ratio, Decimal::ONE, "current_price")?;
            Some(checked::mul(excess, dec!(100), "current_price")?)
        }
        _ => None,
    };

    Ok((equity_value, per_share, upside))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn sample_dcf_input() -> DcfInput {
        DcfInput {
            base_fcf: dec!(100),
            growth_rate: dec!(0.10),
            discount_rate: dec!(0.10),
            terminal_growth_rate: dec!(0.025),
            forecast_years: 5,
            cash: None,
            debt: None,
            shares_outstanding: None,
            current_price: None,
            mid_year_convention: None,
            currency: Currency::USD,
        }
    }

    #[test]
    fn test_worked_example_projections() {
        let result = calculate_dcf(&sample_dcf_input()).unwrap();
        let fcfs: Vec<Money> = result.result.projections.iter().map(|p| p.fcf).collect();
        assert_eq!(
            fcfs,
            vec![dec!(110), dec!(121), dec!(133.1), dec!(146.41), dec!(161.051)]
        );
    }

    #[test]
    fn test_worked_example_values() {
        let result = calculate_dcf(&sample_dcf_input()).unwrap();
        let out = &result.result;

        // TV = 161.051 * 1.025 / 0.075 = 2201.03...
        assert!(
            (out.terminal_value - dec!(2201.03)).abs() < dec!(0.01),
            "TV: expected ~2201.03, got {}",
            out.terminal_value
        );
        // Growth equals discount rate, so every year's PV is exactly 100.
        assert!((out.pv_of_fcf - dec!(500)).abs() < dec!(0.0001));
        // EV = 500 + 2201.03 / 1.61051 = 1866.67
        assert!(
            (out.enterprise_value - dec!(1866.67)).abs() < dec!(0.01),
            "EV: expected ~1866.67, got {}",
            out.enterprise_value
        );
    }

    #[test]
    fn test_equal_rates_rejected() {
        let mut input = sample_dcf_input();
        input.discount_rate = dec!(0.08);
        input.terminal_growth_rate = dec!(0.08);
        match calculate_dcf(&input) {
            Err(FairValueError::InvalidInput { field, .. }) => {
                assert_eq!(field, "terminal_growth_rate")
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_terminal_growth_above_discount_rejected() {
        let mut input = sample_dcf_input();
        input.terminal_growth_rate = dec!(0.12);
        assert!(calculate_dcf(&input).is_err());
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let mut input = sample_dcf_input();
        input.forecast_years = 0;
        assert!(matches!(
            calculate_dcf(&input),
            Err(FairValueError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_non_positive_shares_rejected() {
        let mut input = sample_dcf_input();
        input.shares_outstanding = Some(Decimal::ZERO);
        assert!(calculate_dcf(&input).is_err());

        input.shares_outstanding = Some(dec!(-10));
        assert!(calculate_dcf(&input).is_err());
    }

    #[test]
    fn test_growth_at_minus_one_rejected() {
        let mut input = sample_dcf_input();
        input.growth_rate = dec!(-1);
        assert!(calculate_dcf(&input).is_err());
    }

    #[test]
    fn test_equity_bridge_and_per_share() {
        let mut input = sample_dcf_input();
        input.cash = Some(dec!(200));
        input.debt = Some(dec!(66.67));
        input.shares_outstanding = Some(dec!(100));
        input.current_price = Some(dec!(16));

        let out = calculate_dcf(&input).unwrap().result;
        assert_eq!(out.equity_value, out.enterprise_value + dec!(200) - dec!(66.67));

        let per_share = out.fair_value_per_share.unwrap();
        assert!((per_share - dec!(20)).abs() < dec!(0.001));

        // 20 / 16 - 1 = 25%
        let upside = out.upside_pct.unwrap();
        assert!((upside - dec!(25)).abs() < dec!(0.01));
    }

    #[test]
    fn test_missing_shares_warns() {
        let result = calculate_dcf(&sample_dcf_input()).unwrap();
        assert!(result.result.fair_value_per_share.is_none());
        assert!(result.warnings.iter().any(|w| w.contains("Shares outstanding")));
    }

    #[test]
    fn test_terminal_value_share_warning() {
        // The worked example has ~73% of EV in the terminal value; a lower
        // discount rate pushes it over 75%.
        let mut input = sample_dcf_input();
        input.discount_rate = dec!(0.06);
        let result = calculate_dcf(&input).unwrap();
        assert!(result.result.terminal_value_pct > dec!(0.75));
        assert!(result.warnings.iter().any(|w| w.contains("Terminal value")));
    }

    #[test]
    fn test_mid_year_convention_raises_ev() {
        let mut input = sample_dcf_input();
        let end_of_year = calculate_dcf(&input).unwrap().result;
        input.mid_year_convention = Some(true);
        let mid_year = calculate_dcf(&input).unwrap().result;

        assert!(mid_year.enterprise_value > end_of_year.enterprise_value);
        // Terminal value discounting is unchanged.
        assert_eq!(mid_year.pv_of_terminal, end_of_year.pv_of_terminal);
    }

    #[test]
    fn test_negative_base_fcf_warns() {
        let mut input = sample_dcf_input();
        input.base_fcf = dec!(-50);
        let result = calculate_dcf(&input).unwrap();
        assert!(result.result.enterprise_value < Decimal::ZERO);
        assert!(result.warnings.iter().any(|w| w.contains("negative")));
    }

    #[test]
    fn test_long_horizon_rejected() {
        let mut input = sample_dcf_input();
        input.forecast_years = 700;
        match calculate_dcf(&input) {
            Err(FairValueError::InvalidInput { field, .. }) => {
                assert_eq!(field, "forecast_years")
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
        assert!(project_fcf(dec!(100), dec!(0.10), 700).is_err());
    }

    #[test]
    fn test_huge_base_fcf_rejected() {
        let mut input = sample_dcf_input();
        input.base_fcf = Decimal::MAX;
        assert!(matches!(
            calculate_dcf(&input),
            Err(FairValueError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_project_fcf_matches_calculator() {
        let fcfs = project_fcf(dec!(100), dec!(0.10), 3).unwrap();
        assert_eq!(fcfs, vec![dec!(110), dec!(121), dec!(133.1)]);
        assert!(project_fcf(dec!(100), dec!(0.10), 0).is_err());
    }

    #[test]
    fn test_methodology_string() {
        let result = calculate_dcf(&sample_dcf_input()).unwrap();
        assert_eq!(
            result.methodology,
            "Single-Stage FCF DCF (Gordon Growth Terminal Value)"
        );
    }
}
