use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::checked;
use crate::error::FairValueError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::FairValueResult;

const LOW_WACC_WARNING: Rate = dec!(0.04);
const HIGH_WACC_WARNING: Rate = dec!(0.20);

/// Inputs for a CAPM-based weighted average cost of capital.
///
/// Weights come from market values rather than being supplied directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccInput {
    /// Risk-free rate (e.g. 10-year government bond yield)
    pub risk_free_rate: Rate,
    /// Expected market return minus the risk-free rate
    pub equity_risk_premium: Rate,
    /// Levered equity beta
    pub beta: Decimal,
    /// Pre-tax cost of debt
    pub cost_of_debt: Rate,
    /// Marginal tax rate
    pub tax_rate: Rate,
    /// Market value of equity
    pub equity_value: Money,
    /// Market value of debt
    pub debt_value: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccOutput {
    pub wacc: Rate,
    /// rf + beta * ERP
    pub cost_of_equity: Rate,
    /// kd * (1 - t)
    pub after_tax_cost_of_debt: Rate,
    pub equity_weight: Rate,
    pub debt_weight: Rate,
}

/// WACC = E/V * Ke + D/V * Kd * (1 - t)
pub fn calculate_wacc(input: &WaccInput) -> FairValueResult<ComputationOutput<WaccOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_wacc_input(input)?;

    let total_capital = checked::add(input.equity_value, input.debt_value, "debt_value")?;
    let equity_weight = checked::div(input.equity_value, total_capital, "equity_value")?;
    let debt_weight = checked::div(input.debt_value, total_capital, "debt_value")?;

    let risk_premium = checked::mul(input.beta, input.equity_risk_premium, "beta")?;
    let cost_of_equity = checked::add(input.risk_free_rate, risk_premium, "risk_free_rate")?;
    // tax rate validated to [0, 1]
    let after_tax_cost_of_debt = checked::mul(
        input.cost_of_debt,
        Decimal::ONE - input.tax_rate,
        "cost_of_debt",
    )?;
    let wacc = checked::add(
        checked::mul(equity_weight, cost_of_equity, "equity_risk_premium")?,
        checked::mul(debt_weight, after_tax_cost_of_debt, "cost_of_debt")?,
        "cost_of_debt",
    )?;

    if wacc < LOW_WACC_WARNING || wacc > HIGH_WACC_WARNING {
        warnings.push(format!(
            "WACC of {:.2}% is outside the typical 4%-20% range; check inputs",
            checked::mul(wacc, dec!(100), "equity_risk_premium")?
        ));
    }
    if input.cost_of_debt > cost_of_equity {
        warnings.push("Pre-tax cost of debt exceeds cost of equity".into());
    }

    let output = WaccOutput {
        wacc,
        cost_of_equity,
        after_tax_cost_of_debt,
        equity_weight,
        debt_weight,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "WACC (CAPM cost of equity, market-value weights)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

fn validate_wacc_input(input: &WaccInput) -> FairValueResult<()> {
    if input.tax_rate < Decimal::ZERO || input.tax_rate > Decimal::ONE {
        return Err(FairValueError::invalid(
            "tax_rate",
            "Tax rate must be between 0 and 1",
        ));
    }
    if input.beta < Decimal::ZERO {
        return Err(FairValueError::invalid("beta", "Beta must not be negative"));
    }
    if input.equity_value < Decimal::ZERO {
        return Err(FairValueError::invalid(
            "equity_value",
            "Market value of equity must not be negative",
        ));
    }
    if input.debt_value < Decimal::ZERO {
        return Err(FairValueError::invalid(
            "debt_value",
            "Market value of debt must not be negative",
        ));
    }
    if input.equity_value.is_zero() && input.debt_value.is_zero() {
        return Err(FairValueError::invalid(
            "equity_value",
            "Total capital (equity + debt) must be positive",
        ));
    }
    Ok(())
}
