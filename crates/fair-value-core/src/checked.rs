//! Overflow-checked Decimal arithmetic.
//!
//! `rust_decimal` operators panic once a result leaves the 96-bit range.
//! Calculators route products, sums and quotients of caller-supplied values
//! through these helpers so an out-of-range input surfaces as
//! `InvalidInput` on the field that drove it.

use rust_decimal::Decimal;

use crate::error::FairValueError;
use crate::FairValueResult;

fn out_of_range(field: &str) -> FairValueError {
    FairValueError::invalid(
        field,
        "Result exceeds the representable decimal range; inputs are too large",
    )
}

pub(crate) fn mul(a: Decimal, b: Decimal, field: &str) -> FairValueResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| out_of_range(field))
}

pub(crate) fn add(a: Decimal, b: Decimal, field: &str) -> FairValueResult<Decimal> {
    a.checked_add(b).ok_or_else(|| out_of_range(field))
}

pub(crate) fn sub(a: Decimal, b: Decimal, field: &str) -> FairValueResult<Decimal> {
    a.checked_sub(b).ok_or_else(|| out_of_range(field))
}

/// Quotient; callers rule out a zero divisor beforehand.
pub(crate) fn div(a: Decimal, b: Decimal, field: &str) -> FairValueResult<Decimal> {
    if b.is_zero() {
        return Err(FairValueError::invalid(field, "Division by zero"));
    }
    a.checked_div(b).ok_or_else(|| out_of_range(field))
}

pub(crate) fn sum<I>(values: I, field: &str) -> FairValueResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| add(acc, v, field))
}
