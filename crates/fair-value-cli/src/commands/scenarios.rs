use clap::{Args, ValueEnum};
use serde_json::Value;
use tracing::info;

use fair_value_core::scenarios::sensitivity::{self, DcfMetric, DcfSensitivityInput};
use fair_value_core::types::SensitivityVariable;
use fair_value_core::valuation::dcf::DcfInput;

use super::{load_input, log_warnings};
use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MetricArg {
    EnterpriseValue,
    EquityValue,
    FairValuePerShare,
}

impl From<MetricArg> for DcfMetric {
    fn from(m: MetricArg) -> Self {
        match m {
            MetricArg::EnterpriseValue => DcfMetric::EnterpriseValue,
            MetricArg::EquityValue => DcfMetric::EquityValue,
            MetricArg::FairValuePerShare => DcfMetric::FairValuePerShare,
        }
    }
}

/// Arguments for DCF sensitivity analysis
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a full sensitivity input (base + variable_1 + variable_2)
    #[arg(long, conflicts_with = "base_inputs")]
    pub input: Option<String>,

    /// Path to a DCF input file used as the base case
    #[arg(long)]
    pub base_inputs: Option<String>,

    /// Row variable in format name:min:max:step
    /// (e.g. "discount_rate:0.08:0.12:0.01")
    #[arg(long, allow_hyphen_values = true)]
    pub var1: Option<String>,

    /// Column variable in format name:min:max:step
    #[arg(long, allow_hyphen_values = true)]
    pub var2: Option<String>,

    /// DCF result shown in each cell
    #[arg(long)]
    pub metric: Option<MetricArg>,
}

fn parse_sens_var(raw: &str) -> Result<SensitivityVariable, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() != 4 {
        return Err(format!(
            "Sensitivity variable must be name:min:max:step, got '{}'",
            raw
        )
        .into());
    }
    Ok(SensitivityVariable {
        name: parts[0].to_string(),
        min: parts[1].parse()?,
        max: parts[2].parse()?,
        step: parts[3].parse()?,
    })
}

fn build_input(args: &SensitivityArgs) -> Result<DcfSensitivityInput, Box<dyn std::error::Error>> {
    let Some(base_path) = args.base_inputs.as_deref() else {
        // Full input from --input, or piped on stdin
        return load_input::<DcfSensitivityInput>(args.input.as_deref())?
            .ok_or_else(|| "--input or --base-inputs is required".into());
    };

    let base: DcfInput = input::file::read_input(base_path)?;
    let var1 = args.var1.as_deref().ok_or("--var1 is required with --base-inputs")?;
    let var2 = args.var2.as_deref().ok_or("--var2 is required with --base-inputs")?;

    Ok(DcfSensitivityInput {
        base,
        variable_1: parse_sens_var(var1)?,
        variable_2: parse_sens_var(var2)?,
        output_metric: DcfMetric::default(),
    })
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut sens_input = build_input(&args)?;
    if let Some(metric) = args.metric {
        sens_input.output_metric = metric.into();
    }

    let result = sensitivity::dcf_sensitivity(&sens_input)?;
    log_warnings(&result.warnings);
    info!(
        rows = result.result.variable_1_values.len(),
        cols = result.result.variable_2_values.len(),
        "sensitivity grid complete"
    );
    Ok(serde_json::to_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_sens_var() {
        let var = parse_sens_var("wacc:0.08:0.12:0.01").unwrap();
        assert_eq!(var.name, "wacc");
        assert_eq!(var.min, dec!(0.08));
        assert_eq!(var.max, dec!(0.12));
        assert_eq!(var.step, dec!(0.01));
    }

    #[test]
    fn test_parse_sens_var_negative_bound() {
        let var = parse_sens_var("growth_rate:-0.05:0.05:0.05").unwrap();
        assert_eq!(var.min, dec!(-0.05));
    }

    #[test]
    fn test_parse_sens_var_bad_shape() {
        assert!(parse_sens_var("wacc:0.08:0.12").is_err());
        assert!(parse_sens_var("wacc:low:0.12:0.01").is_err());
    }
}
