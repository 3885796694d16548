use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Instant;

use crate::error::FairValueError;
use crate::types::*;
use crate::valuation::dcf::{calculate_dcf, DcfInput, DcfOutput};
use crate::FairValueResult;

/// Upper bound on grid size, to keep a mistyped step from exploding.
const MAX_GRID_CELLS: usize = 10_000;

/// DCF assumptions that can be swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DcfVariable {
    BaseFcf,
    GrowthRate,
    DiscountRate,
    TerminalGrowthRate,
}

impl DcfVariable {
    pub fn name(&self) -> &'static str {
        match self {
            DcfVariable::BaseFcf => "base_fcf",
            DcfVariable::GrowthRate => "growth_rate",
            DcfVariable::DiscountRate => "discount_rate",
            DcfVariable::TerminalGrowthRate => "terminal_growth_rate",
        }
    }

    fn get(&self, input: &DcfInput) -> Decimal {
        match self {
            DcfVariable::BaseFcf => input.base_fcf,
            DcfVariable::GrowthRate => input.growth_rate,
            DcfVariable::DiscountRate => input.discount_rate,
            DcfVariable::TerminalGrowthRate => input.terminal_growth_rate,
        }
    }

    fn set(&self, input: &mut DcfInput, value: Decimal) {
        match self {
            DcfVariable::BaseFcf => input.base_fcf = value,
            DcfVariable::GrowthRate => input.growth_rate = value,
            DcfVariable::DiscountRate => input.discount_rate = value,
            DcfVariable::TerminalGrowthRate => input.terminal_growth_rate = value,
        }
    }
}

impl FromStr for DcfVariable {
    type Err = FairValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "base_fcf" | "fcf" => Ok(DcfVariable::BaseFcf),
            "growth_rate" | "growth" => Ok(DcfVariable::GrowthRate),
            "discount_rate" | "wacc" => Ok(DcfVariable::DiscountRate),
            "terminal_growth_rate" | "terminal_growth" => Ok(DcfVariable::TerminalGrowthRate),
            other => Err(FairValueError::invalid(
                "variable",
                format!(
                    "Unknown DCF variable '{other}'; expected base_fcf, growth_rate, discount_rate or terminal_growth_rate"
                ),
            )),
        }
    }
}

/// Which DCF result fills the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DcfMetric {
    #[default]
    EnterpriseValue,
    EquityValue,
    FairValuePerShare,
}

impl DcfMetric {
    fn read(&self, out: &DcfOutput) -> Option<Decimal> {
        match self {
            DcfMetric::EnterpriseValue => Some(out.enterprise_value),
            DcfMetric::EquityValue => Some(out.equity_value),
            DcfMetric::FairValuePerShare => out.fair_value_per_share,
        }
    }
}

/// Input for a 2-way DCF sensitivity table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfSensitivityInput {
    /// Base case DCF assumptions
    pub base: DcfInput,
    /// Row variable (name is a DCF field, e.g. "discount_rate")
    pub variable_1: SensitivityVariable,
    /// Column variable
    pub variable_2: SensitivityVariable,
    #[serde(default)]
    pub output_metric: DcfMetric,
}

/// Output of a 2-way DCF sensitivity table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub variable_1_name: String,
    pub variable_2_name: String,
    pub variable_1_values: Vec<Decimal>,
    pub variable_2_values: Vec<Decimal>,
    pub output_metric: DcfMetric,
    /// Matrix[i][j] = output at variable_1_values[i], variable_2_values[j];
    /// None where the combination is not a valid DCF (e.g. discount <= terminal growth)
    pub matrix: Vec<Vec<Option<Decimal>>>,
    /// Output at the unmodified base inputs
    pub base_case_value: Decimal,
    /// Cell nearest to the base inputs (row, col)
    pub base_case_position: (usize, usize),
}

/// Generate the sweep values for a sensitivity variable from min to max with step.
fn generate_sweep_values(var: &SensitivityVariable) -> FairValueResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(FairValueError::invalid(
            format!("variable:{}", var.name),
            "Step must be positive",
        ));
    }
    if var.min > var.max {
        return Err(FairValueError::invalid(
            format!("variable:{}", var.name),
            "Min must be <= max",
        ));
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        if values.len() > MAX_GRID_CELLS {
            return Err(FairValueError::invalid(
                format!("variable:{}", var.name),
                format!("Sweep produces more than {MAX_GRID_CELLS} values"),
            ));
        }
        match current.checked_add(var.step) {
            Some(next) => current = next,
            None => break,
        }
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    Ok(values)
}

/// Find the closest index to a target value.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| {
            v.checked_sub(target)
                .map(|d| d.abs())
                .unwrap_or(Decimal::MAX)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Sweep two DCF assumptions and tabulate the chosen output.
pub fn dcf_sensitivity(
    input: &DcfSensitivityInput,
) -> FairValueResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let var1: DcfVariable = input.variable_1.name.parse()?;
    let var2: DcfVariable = input.variable_2.name.parse()?;
    if var1 == var2 {
        return Err(FairValueError::invalid(
            "variable_2",
            format!("Both axes sweep {}", var1.name()),
        ));
    }
    if input.output_metric == DcfMetric::FairValuePerShare
        && input.base.shares_outstanding.is_none()
    {
        return Err(FairValueError::invalid(
            "base.shares_outstanding",
            "Required for the fair_value_per_share metric",
        ));
    }

    let v1_values = generate_sweep_values(&input.variable_1)?;
    let v2_values = generate_sweep_values(&input.variable_2)?;
    if v1_values.len() * v2_values.len() > MAX_GRID_CELLS {
        return Err(FairValueError::invalid(
            "variable_1",
            format!("Grid exceeds {MAX_GRID_CELLS} cells; widen the step"),
        ));
    }

    let base_out = calculate_dcf(&input.base)?;
    let base_case_value = input
        .output_metric
        .read(&base_out.result)
        .unwrap_or(Decimal::ZERO);

    let mut invalid_cells = 0usize;
    let mut first_error: Option<String> = None;
    let mut matrix = Vec::with_capacity(v1_values.len());

    for &v1 in &v1_values {
        let mut row = Vec::with_capacity(v2_values.len());
        for &v2 in &v2_values {
            let mut scenario = input.base.clone();
            var1.set(&mut scenario, v1);
            var2.set(&mut scenario, v2);
            match calculate_dcf(&scenario) {
                Ok(out) => row.push(input.output_metric.read(&out.result)),
                Err(e) => {
                    invalid_cells += 1;
                    first_error.get_or_insert_with(|| format!("({v1}, {v2}): {e}"));
                    row.push(None);
                }
            }
        }
        matrix.push(row);
    }

    if let Some(err) = first_error {
        warnings.push(format!(
            "{invalid_cells} cell(s) are not valid DCF inputs and were left empty; first at {err}"
        ));
    }

    let base_row = closest_index(&v1_values, var1.get(&input.base));
    let base_col = closest_index(&v2_values, var2.get(&input.base));

    let output = SensitivityOutput {
        variable_1_name: var1.name().to_string(),
        variable_2_name: var2.name().to_string(),
        variable_1_values: v1_values,
        variable_2_values: v2_values,
        output_metric: input.output_metric,
        matrix,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way DCF Sensitivity Analysis",
        &serde_json::json!({
            "variable_1": input.variable_1,
            "variable_2": input.variable_2,
            "output_metric": input.output_metric,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_input() -> DcfSensitivityInput {
        DcfSensitivityInput {
            base: DcfInput {
                base_fcf: dec!(100),
                growth_rate: dec!(0.10),
                discount_rate: dec!(0.10),
                terminal_growth_rate: dec!(0.025),
                forecast_years: 5,
                cash: Some(dec!(50)),
                debt: Some(dec!(150)),
                shares_outstanding: Some(dec!(10)),
                current_price: None,
                mid_year_convention: None,
                currency: Currency::USD,
            },
            variable_1: SensitivityVariable {
                name: "discount_rate".into(),
                min: dec!(0.08),
                max: dec!(0.12),
                step: dec!(0.01),
            },
            variable_2: SensitivityVariable {
                name: "terminal_growth_rate".into(),
                min: dec!(0.015),
                max: dec!(0.035),
                step: dec!(0.005),
            },
            output_metric: DcfMetric::EnterpriseValue,
        }
    }

    #[test]
    fn test_grid_dimensions_and_base_case() {
        let out = dcf_sensitivity(&sample_input()).unwrap().result;
        assert_eq!(out.variable_1_values.len(), 5);
        assert_eq!(out.variable_2_values.len(), 5);
        assert_eq!(out.matrix.len(), 5);
        assert_eq!(out.matrix[0].len(), 5);

        // Base: discount 0.10 => row 2, terminal growth 0.025 => col 2
        assert_eq!(out.base_case_position, (2, 2));
        assert_eq!(out.matrix[2][2], Some(out.base_case_value));
    }

    #[test]
    fn test_monotonic_in_discount_rate() {
        let out = dcf_sensitivity(&sample_input()).unwrap().result;
        for col in 0..out.variable_2_values.len() {
            for row in 0..out.matrix.len() - 1 {
                assert!(out.matrix[row][col].unwrap() > out.matrix[row + 1][col].unwrap());
            }
        }
    }

    #[test]
    fn test_invalid_cells_are_empty() {
        let mut input = sample_input();
        input.variable_1.min = dec!(0.02);
        input.variable_1.max = dec!(0.04);
        input.variable_2.min = dec!(0.03);
        input.variable_2.max = dec!(0.03);
        input.variable_2.step = dec!(0.01);

        let result = dcf_sensitivity(&input).unwrap();
        let out = &result.result;
        // discount 0.02 and 0.03 are <= terminal growth 0.03
        assert_eq!(out.matrix[0][0], None);
        assert_eq!(out.matrix[1][0], None);
        assert!(out.matrix[2][0].is_some());
        assert!(result.warnings.iter().any(|w| w.contains("2 cell(s)")));
    }

    #[test]
    fn test_per_share_metric() {
        let mut input = sample_input();
        input.output_metric = DcfMetric::FairValuePerShare;
        let out = dcf_sensitivity(&input).unwrap().result;
        let ev_grid = dcf_sensitivity(&sample_input()).unwrap().result;
        // (EV + 50 - 150) / 10
        let expected = (ev_grid.matrix[0][0].unwrap() - dec!(100)) / dec!(10);
        assert_eq!(out.matrix[0][0], Some(expected));
    }

    #[test]
    fn test_per_share_metric_needs_shares() {
        let mut input = sample_input();
        input.output_metric = DcfMetric::FairValuePerShare;
        input.base.shares_outstanding = None;
        assert!(dcf_sensitivity(&input).is_err());
    }

    #[test]
    fn test_same_variable_twice_rejected() {
        let mut input = sample_input();
        input.variable_2.name = "wacc".into();
        assert!(dcf_sensitivity(&input).is_err());
    }

    #[test]
    fn test_unknown_variable_rejected() {
        let mut input = sample_input();
        input.variable_1.name = "ebitda_margin".into();
        assert!(dcf_sensitivity(&input).is_err());
    }

    #[test]
    fn test_sweep_values() {
        let var = SensitivityVariable {
            name: "test".into(),
            min: dec!(1),
            max: dec!(5),
            step: dec!(1),
        };
        let vals = generate_sweep_values(&var).unwrap();
        assert_eq!(vals, vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)]);
    }

    #[test]
    fn test_sweep_with_non_exact_step() {
        let var = SensitivityVariable {
            name: "test".into(),
            min: dec!(0),
            max: dec!(1),
            step: dec!(0.3),
        };
        let vals = generate_sweep_values(&var).unwrap();
        // 0, 0.3, 0.6, 0.9, 1.0 (max appended)
        assert_eq!(vals.len(), 5);
        assert_eq!(*vals.last().unwrap(), dec!(1));
    }

    #[test]
    fn test_sweep_stops_at_decimal_range() {
        let var = SensitivityVariable {
            name: "test".into(),
            min: dec!(0),
            max: Decimal::MAX,
            step: dec!(30000000000000000000000000000),
        };
        let vals = generate_sweep_values(&var).unwrap();
        // 0, 3e28, 6e28, then the next step leaves the range and max is appended
        assert_eq!(vals.len(), 4);
        assert_eq!(*vals.last().unwrap(), Decimal::MAX);
    }

    #[test]
    fn test_closest_index_far_apart() {
        let values = [Decimal::MIN, dec!(0), Decimal::MAX];
        assert_eq!(closest_index(&values, Decimal::MAX), 2);
        assert_eq!(closest_index(&values, Decimal::MIN), 0);
    }

    #[test]
    fn test_overflowing_cells_are_empty() {
        let mut input = sample_input();
        input.variable_1 = SensitivityVariable {
            name: "base_fcf".into(),
            min: dec!(100),
            max: dec!(70000000000000000000000000000),
            step: dec!(35000000000000000000000000000),
        };
        input.variable_2 = SensitivityVariable {
            name: "growth_rate".into(),
            min: dec!(0.10),
            max: dec!(0.10),
            step: dec!(0.01),
        };

        let result = dcf_sensitivity(&input).unwrap();
        let out = &result.result;
        assert_eq!(out.variable_1_values.len(), 3);
        assert!(out.matrix[0][0].is_some());
        assert_eq!(out.matrix[1][0], None);
        assert_eq!(out.matrix[2][0], None);
        assert_eq!(out.base_case_position, (0, 0));
        assert!(result.warnings.iter().any(|w| w.contains("2 cell(s)")));
    }

    #[test]
    fn test_invalid_step() {
        let mut input = sample_input();
        input.variable_1.step = Decimal::ZERO;
        assert!(dcf_sensitivity(&input).is_err());
    }
}
