use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::checked;
use crate::error::FairValueError;
use crate::stats::median;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::FairValueResult;

/// Growth assumed when the history is too short to measure.
pub const DEFAULT_GROWTH_RATE: Rate = dec!(0.05);
pub const DEFAULT_GROWTH_FLOOR: Rate = dec!(-0.10);
pub const DEFAULT_GROWTH_CAP: Rate = dec!(0.25);

/// Free cash flow = operating cash flow - capital expenditure.
///
/// Capex is accepted with either sign, since cash flow statements commonly
/// report it as a negative outflow.
pub fn free_cash_flow(
    operating_cash_flow: Money,
    capital_expenditure: Money,
) -> FairValueResult<Money> {
    checked::sub(
        operating_cash_flow,
        capital_expenditure.abs(),
        "capital_expenditure",
    )
}

/// Input for estimating a forward FCF growth rate from history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthInput {
    /// Historical free cash flow, oldest first
    pub historical_fcf: Vec<Money>,
    /// Lower clamp (default -10%)
    #[serde(default = "default_floor")]
    pub floor: Rate,
    /// Upper clamp (default 25%)
    #[serde(default = "default_cap")]
    pub cap: Rate,
}

fn default_floor() -> Rate {
    DEFAULT_GROWTH_FLOOR
}

fn default_cap() -> Rate {
    DEFAULT_GROWTH_CAP
}

impl GrowthInput {
    pub fn new(historical_fcf: Vec<Money>) -> Self {
        GrowthInput {
            historical_fcf,
            floor: DEFAULT_GROWTH_FLOOR,
            cap: DEFAULT_GROWTH_CAP,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthOutput {
    /// Year-over-year growth for each usable consecutive pair
    pub yoy_growth: Vec<Rate>,
    /// Median of `yoy_growth` before clamping (None when defaulted)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_median: Option<Rate>,
    /// Growth rate to feed into the DCF
    pub growth_rate: Rate,
    /// True when the median was pulled back into [floor, cap]
    pub clamped: bool,
    /// Most recent FCF, the natural DCF base
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_fcf: Option<Money>,
}

/// Estimate FCF growth as the clamped median of year-over-year changes.
///
/// The median keeps one exceptional year from dominating the estimate.
pub fn estimate_growth_rate(input: &GrowthInput) -> FairValueResult<ComputationOutput<GrowthOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.floor > input.cap {
        return Err(FairValueError::invalid(
            "floor",
            format!("Growth floor ({}) exceeds cap ({})", input.floor, input.cap),
        ));
    }

    let latest_fcf = input.historical_fcf.last().copied();

    if input.historical_fcf.len() < 2 {
        warnings.push(format!(
            "Fewer than two historical observations; using default growth of {}%",
            DEFAULT_GROWTH_RATE * dec!(100)
        ));
        let output = GrowthOutput {
            yoy_growth: Vec::new(),
            raw_median: None,
            growth_rate: DEFAULT_GROWTH_RATE,
            clamped: false,
            latest_fcf,
        };
        let elapsed = start.elapsed().as_micros() as u64;
        return Ok(with_metadata(
            "Historical FCF Growth (Default)",
            input,
            warnings,
            elapsed,
            output,
        ));
    }

    let mut yoy_growth = Vec::with_capacity(input.historical_fcf.len() - 1);
    for (i, pair) in input.historical_fcf.windows(2).enumerate() {
        let (prev, curr) = (pair[0], pair[1]);
        if prev.is_zero() {
            warnings.push(format!(
                "Observation {i} is zero; growth into observation {} skipped",
                i + 1
            ));
            continue;
        }
        let change = checked::sub(curr, prev, "historical_fcf")?;
        yoy_growth.push(checked::div(change, prev, "historical_fcf")?);
    }

    let raw = median(&yoy_growth).ok_or_else(|| {
        FairValueError::invalid(
            "historical_fcf",
            "No consecutive pair of observations yields a growth rate",
        )
    })?;

    let growth_rate = raw.max(input.floor).min(input.cap);
    let clamped = growth_rate != raw;
    if clamped {
        warnings.push(format!(
            "Median historical growth {:.2}% clamped to {:.2}%",
            checked::mul(raw, dec!(100), "historical_fcf")?,
            checked::mul(growth_rate, dec!(100), "historical_fcf")?
        ));
    }
    if input.historical_fcf.iter().any(|v| *v < Decimal::ZERO) {
        warnings.push("History contains negative FCF; growth rates may be misleading".into());
    }

    let output = GrowthOutput {
        yoy_growth,
        raw_median: Some(raw),
        growth_rate,
        clamped,
        latest_fcf,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Historical FCF Growth (Clamped Median YoY)",
        input,
        warnings,
        elapsed,
        output,
    ))
}
