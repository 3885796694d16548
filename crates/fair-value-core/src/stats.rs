//! Descriptive statistics over small samples of decimals.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::checked;
use crate::FairValueResult;

/// Summary of a sample. All fields are zero for an empty sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: Decimal,
    pub median: Decimal,
    pub low: Decimal,
    pub high: Decimal,
    /// Sample (n - 1) standard deviation; zero when fewer than two values.
    pub std_dev: Decimal,
    pub count: usize,
}

/// Median of the values. For an even count this is the midpoint of the two
/// central values.
pub fn median(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let n = sorted.len();
    if n % 2 == 0 {
        let (lo, hi) = (sorted[n / 2 - 1], sorted[n / 2]);
        match lo.checked_add(hi) {
            Some(total) => Some(total / dec!(2)),
            // Same sign, so the gap fits.
            None => Some(lo + (hi - lo) / dec!(2)),
        }
    } else {
        Some(sorted[n / 2])
    }
}

/// Summarize a sample. An overflow in the mean or variance is reported as
/// `InvalidInput` against `field`.
pub fn summarize(values: &[Decimal], field: &str) -> FairValueResult<Summary> {
    let count = values.len();
    if count == 0 {
        return Ok(Summary {
            mean: Decimal::ZERO,
            median: Decimal::ZERO,
            low: Decimal::ZERO,
            high: Decimal::ZERO,
            std_dev: Decimal::ZERO,
            count,
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort();

    let total = checked::sum(sorted.iter().copied(), field)?;
    let mean = checked::div(total, Decimal::from(count as i64), field)?;

    let std_dev = if count > 1 {
        let mut squares = Decimal::ZERO;
        for v in &sorted {
            let diff = checked::sub(*v, mean, field)?;
            squares = checked::add(squares, checked::mul(diff, diff, field)?, field)?;
        }
        let variance = checked::div(squares, Decimal::from((count - 1) as i64), field)?;
        variance.sqrt().unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    Ok(Summary {
        mean,
        median: median(&sorted).unwrap_or(Decimal::ZERO),
        low: sorted[0],
        high: sorted[count - 1],
        std_dev,
        count,
    })
}
