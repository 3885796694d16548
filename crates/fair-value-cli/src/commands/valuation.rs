use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;

use fair_value_core::report;
use fair_value_core::types::Currency;
use fair_value_core::valuation::comps::{self, CompsInput, MultipleBasis};
use fair_value_core::valuation::dcf::{self, DcfInput};
use fair_value_core::valuation::growth::{self, GrowthInput};
use fair_value_core::valuation::wacc::{self, WaccInput};

use super::{load_input, log_warnings};

/// Arguments for DCF valuation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct DcfArgs {
    /// Path to JSON/YAML input file with DCF parameters
    #[arg(long)]
    pub input: Option<String>,

    /// Most recent free cash flow
    #[arg(long)]
    pub base_fcf: Option<Decimal>,

    /// Annual FCF growth rate (e.g. 0.10 for 10%)
    #[arg(long)]
    pub growth_rate: Option<Decimal>,

    /// Discount rate (WACC)
    #[arg(long, alias = "wacc")]
    pub discount_rate: Option<Decimal>,

    /// Terminal growth rate
    #[arg(long, default_value = "0.025")]
    pub terminal_growth: Decimal,

    /// Forecast years
    #[arg(long, default_value = "5")]
    pub years: u32,

    /// Cash and equivalents
    #[arg(long)]
    pub cash: Option<Decimal>,

    /// Total debt
    #[arg(long)]
    pub debt: Option<Decimal>,

    /// Diluted shares outstanding
    #[arg(long)]
    pub shares: Option<Decimal>,

    /// Current share price, for upside/downside
    #[arg(long)]
    pub price: Option<Decimal>,

    /// Discount explicit cash flows at mid-year
    #[arg(long)]
    pub mid_year: bool,

    /// Company name shown in the report
    #[arg(long, default_value = "Target")]
    pub name: String,

    /// Print a text report instead of structured output
    #[arg(long)]
    pub report: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BasisArg {
    Median,
    Mean,
    Low,
    High,
}

impl From<BasisArg> for MultipleBasis {
    fn from(b: BasisArg) -> Self {
        match b {
            BasisArg::Median => MultipleBasis::Median,
            BasisArg::Mean => MultipleBasis::Mean,
            BasisArg::Low => MultipleBasis::Low,
            BasisArg::High => MultipleBasis::High,
        }
    }
}

/// Arguments for comparable company analysis
#[derive(Args)]
pub struct CompsArgs {
    /// Path to JSON/YAML input file with target and peer data
    #[arg(long)]
    pub input: Option<String>,

    /// Override the peer statistic applied to the target
    #[arg(long)]
    pub basis: Option<BasisArg>,

    /// Print a text report instead of structured output
    #[arg(long)]
    pub report: bool,
}

/// Arguments for historical growth estimation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct GrowthArgs {
    /// Path to JSON/YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Historical FCF, oldest first (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub fcf: Vec<Decimal>,

    /// Historical operating cash flow, oldest first (use with --capex)
    #[arg(long, value_delimiter = ',', conflicts_with = "fcf")]
    pub ocf: Vec<Decimal>,

    /// Historical capital expenditure, oldest first
    #[arg(long, value_delimiter = ',', requires = "ocf")]
    pub capex: Vec<Decimal>,

    /// Lower clamp on the estimate
    #[arg(long)]
    pub floor: Option<Decimal>,

    /// Upper clamp on the estimate
    #[arg(long)]
    pub cap: Option<Decimal>,
}

/// Arguments for WACC calculation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct WaccArgs {
    /// Path to JSON/YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Risk-free rate (e.g. 0.042 for 4.2%)
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Equity risk premium (e.g. 0.055 for 5.5%)
    #[arg(long, alias = "erp")]
    pub equity_risk_premium: Option<Decimal>,

    /// Levered beta
    #[arg(long)]
    pub beta: Option<Decimal>,

    /// Pre-tax cost of debt
    #[arg(long)]
    pub cost_of_debt: Option<Decimal>,

    /// Marginal tax rate
    #[arg(long)]
    pub tax_rate: Option<Decimal>,

    /// Market value of equity
    #[arg(long)]
    pub equity_value: Option<Decimal>,

    /// Market value of debt
    #[arg(long)]
    pub debt_value: Option<Decimal>,
}

pub fn run_dcf(args: DcfArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let dcf_input: DcfInput = match load_input(args.input.as_deref())? {
        Some(input) => input,
        None => DcfInput {
            base_fcf: args
                .base_fcf
                .ok_or("--base-fcf is required (or provide --input)")?,
            growth_rate: args
                .growth_rate
                .ok_or("--growth-rate is required (or provide --input)")?,
            discount_rate: args
                .discount_rate
                .ok_or("--discount-rate is required (or provide --input)")?,
            terminal_growth_rate: args.terminal_growth,
            forecast_years: args.years,
            cash: args.cash,
            debt: args.debt,
            shares_outstanding: args.shares,
            current_price: args.price,
            mid_year_convention: Some(args.mid_year),
            currency: Currency::USD,
        },
    };

    let result = dcf::calculate_dcf(&dcf_input)?;
    log_warnings(&result.warnings);
    info!(
        enterprise_value = %result.result.enterprise_value,
        equity_value = %result.result.equity_value,
        "dcf complete"
    );

    if args.report {
        let today = chrono::Local::now().date_naive();
        let text = report::dcf_report(&args.name, &dcf_input, &result.result, today);
        return Ok(Value::String(text));
    }
    Ok(serde_json::to_value(result)?)
}

pub fn run_comps(args: CompsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut comps_input: CompsInput = load_input(args.input.as_deref())?
        .ok_or("--input file (or JSON on stdin) is required for comps analysis")?;
    if let Some(basis) = args.basis {
        comps_input.basis = basis.into();
    }

    let result = comps::calculate_comps(&comps_input)?;
    log_warnings(&result.warnings);
    info!(
        peers = result.result.peers_included,
        multiples = result.result.implied_valuations.len(),
        "comps complete"
    );

    if args.report {
        let today = chrono::Local::now().date_naive();
        return Ok(Value::String(report::comps_report(&result.result, today)));
    }
    Ok(serde_json::to_value(result)?)
}

pub fn run_growth(args: GrowthArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let growth_input: GrowthInput = match load_input(args.input.as_deref())? {
        Some(input) => input,
        None => {
            let history = historical_fcf(&args)?;
            let mut input = GrowthInput::new(history);
            if let Some(floor) = args.floor {
                input.floor = floor;
            }
            if let Some(cap) = args.cap {
                input.cap = cap;
            }
            input
        }
    };

    let result = growth::estimate_growth_rate(&growth_input)?;
    log_warnings(&result.warnings);
    info!(growth_rate = %result.result.growth_rate, "growth estimate complete");
    Ok(serde_json::to_value(result)?)
}

/// FCF history from --fcf directly, or derived from --ocf and --capex.
fn historical_fcf(args: &GrowthArgs) -> Result<Vec<Decimal>, Box<dyn std::error::Error>> {
    if !args.fcf.is_empty() {
        return Ok(args.fcf.clone());
    }
    if args.ocf.is_empty() {
        return Err("--fcf or --ocf/--capex is required (or provide --input)".into());
    }
    if args.ocf.len() != args.capex.len() {
        return Err(format!(
            "--ocf has {} values but --capex has {}",
            args.ocf.len(),
            args.capex.len()
        )
        .into());
    }
    let history = args
        .ocf
        .iter()
        .zip(&args.capex)
        .map(|(&ocf, &capex)| growth::free_cash_flow(ocf, capex))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(history)
}

pub fn run_wacc(args: WaccArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let wacc_input: WaccInput = match load_input(args.input.as_deref())? {
        Some(input) => input,
        None => WaccInput {
            risk_free_rate: args
                .risk_free_rate
                .ok_or("--risk-free-rate is required (or provide --input)")?,
            equity_risk_premium: args
                .equity_risk_premium
                .ok_or("--equity-risk-premium is required (or provide --input)")?,
            beta: args.beta.unwrap_or(Decimal::ONE),
            cost_of_debt: args
                .cost_of_debt
                .ok_or("--cost-of-debt is required (or provide --input)")?,
            tax_rate: args
                .tax_rate
                .ok_or("--tax-rate is required (or provide --input)")?,
            equity_value: args
                .equity_value
                .ok_or("--equity-value is required (or provide --input)")?,
            debt_value: args.debt_value.unwrap_or(Decimal::ZERO),
        },
    };

    let result = wacc::calculate_wacc(&wacc_input)?;
    log_warnings(&result.warnings);
    info!(wacc = %result.result.wacc, "wacc complete");
    Ok(serde_json::to_value(result)?)
}
