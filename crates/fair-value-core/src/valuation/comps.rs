use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::checked;
use crate::error::FairValueError;
use crate::stats::summarize;
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Multiple};
use crate::FairValueResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Valuation multiples supported by the comps calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MultipleType {
    /// Price / Earnings, applied to net income
    PriceEarnings,
    /// Enterprise value / EBITDA, applied to EBITDA
    EvEbitda,
    /// Price / Sales, applied to revenue
    PriceSales,
    /// Price / Book, applied to book value of equity
    PriceBook,
}

impl MultipleType {
    /// P/E, EV/EBITDA and P/S.
    pub fn default_set() -> Vec<MultipleType> {
        vec![
            MultipleType::PriceEarnings,
            MultipleType::EvEbitda,
            MultipleType::PriceSales,
        ]
    }

    /// Whether the multiple prices equity or the whole enterprise.
    pub fn value_kind(&self) -> ValueKind {
        match self {
            MultipleType::EvEbitda => ValueKind::EnterpriseValue,
            _ => ValueKind::EquityValue,
        }
    }

    fn target_field(&self) -> &'static str {
        match self {
            MultipleType::PriceEarnings => "target.earnings",
            MultipleType::EvEbitda => "target.ebitda",
            MultipleType::PriceSales => "target.revenue",
            MultipleType::PriceBook => "target.book_value",
        }
    }
}

impl std::fmt::Display for MultipleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultipleType::PriceEarnings => write!(f, "P/E"),
            MultipleType::EvEbitda => write!(f, "EV/EBITDA"),
            MultipleType::PriceSales => write!(f, "P/S"),
            MultipleType::PriceBook => write!(f, "P/B"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    EquityValue,
    EnterpriseValue,
}

/// Which peer statistic is applied to the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultipleBasis {
    #[default]
    Median,
    Mean,
    Low,
    High,
}

impl MultipleBasis {
    fn pick(&self, stats: &MultipleStatistics) -> Multiple {
        match self {
            MultipleBasis::Median => stats.median,
            MultipleBasis::Mean => stats.mean,
            MultipleBasis::Low => stats.low,
            MultipleBasis::High => stats.high,
        }
    }
}

impl std::fmt::Display for MultipleBasis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultipleBasis::Median => write!(f, "median"),
            MultipleBasis::Mean => write!(f, "mean"),
            MultipleBasis::Low => write!(f, "low"),
            MultipleBasis::High => write!(f, "high"),
        }
    }
}

/// Trading multiples of one peer company. Any multiple may be missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerMultiples {
    /// Company name or ticker
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe: Option<Multiple>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ev_ebitda: Option<Multiple>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ps: Option<Multiple>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pb: Option<Multiple>,
    /// Include in the analysis (allows easy toggling)
    #[serde(default = "default_include")]
    pub include: bool,
}

fn default_include() -> bool {
    true
}

impl PeerMultiples {
    fn multiple(&self, multiple_type: MultipleType) -> Option<Multiple> {
        match multiple_type {
            MultipleType::PriceEarnings => self.pe,
            MultipleType::EvEbitda => self.ev_ebitda,
            MultipleType::PriceSales => self.ps,
            MultipleType::PriceBook => self.pb,
        }
    }
}

/// Financials of the company being valued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetFinancials {
    pub name: String,
    /// Net income
    pub earnings: Money,
    pub ebitda: Money,
    pub revenue: Money,
    /// Book value of equity (required only for P/B)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_value: Option<Money>,
    /// Debt minus cash, used to bridge EV-based values to equity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_debt: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_price: Option<Money>,
}

impl TargetFinancials {
    fn metric(&self, multiple_type: MultipleType) -> Option<Money> {
        match multiple_type {
            MultipleType::PriceEarnings => Some(self.earnings),
            MultipleType::EvEbitda => Some(self.ebitda),
            MultipleType::PriceSales => Some(self.revenue),
            MultipleType::PriceBook => self.book_value,
        }
    }
}

/// Input for a comparable-company analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompsInput {
    pub target: TargetFinancials,
    pub peers: Vec<PeerMultiples>,
    /// Multiples to apply (default: P/E, EV/EBITDA, P/S)
    #[serde(default = "MultipleType::default_set")]
    pub multiples: Vec<MultipleType>,
    /// Peer statistic applied to the target (default: median)
    #[serde(default)]
    pub basis: MultipleBasis,
    #[serde(default)]
    pub currency: Currency,
}

/// Descriptive statistics for a single multiple across the peer set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipleStatistics {
    pub multiple_type: MultipleType,
    /// Peer values used in the statistics
    pub values: Vec<(String, Multiple)>,
    /// Negative peer values left out of the statistics
    pub excluded: Vec<(String, Multiple)>,
    pub mean: Multiple,
    pub median: Multiple,
    pub high: Multiple,
    pub low: Multiple,
    pub std_dev: Multiple,
    pub count: usize,
}

/// An implied valuation of the target from one multiple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpliedValuation {
    pub multiple_type: MultipleType,
    pub value_kind: ValueKind,
    /// The target metric the multiple was applied to
    pub target_metric_value: Money,
    /// Peer multiple selected by the basis
    pub applied_multiple: Multiple,
    /// applied_multiple * target metric
    pub implied_value: Money,
    pub implied_at_low: Money,
    pub implied_at_high: Money,
    /// Implied equity value (EV-based values bridged via net debt)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_equity_value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_price_per_share: Option<Money>,
    /// Upside (+) or downside (-) vs current share price, in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upside_pct: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationRange {
    pub low: Money,
    pub high: Money,
}

/// Output of a comparable-company analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompsOutput {
    pub target_name: String,
    pub basis: MultipleBasis,
    pub multiple_statistics: Vec<MultipleStatistics>,
    pub implied_valuations: Vec<ImpliedValuation>,
    /// Low / high implied equity value across multiples
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_value_range: Option<ValuationRange>,
    pub peers_included: usize,
    pub peers_excluded: usize,
    pub currency: Currency,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run a comparable-company analysis.
///
/// Peer selection and outlier judgement are left to the caller.
pub fn calculate_comps(input: &CompsInput) -> FairValueResult<ComputationOutput<CompsOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    // --- Validate ---
    validate_comps_input(input)?;

    let included: Vec<&PeerMultiples> = input.peers.iter().filter(|p| p.include).collect();
    let excluded_count = input.peers.len() - included.len();
    if included.is_empty() {
        return Err(FairValueError::invalid(
            "peers",
            "No peer companies are included in the analysis",
        ));
    }
    if included.len() < 3 {
        warnings.push(format!(
            "Only {} peers included; consider adding more for a meaningful median",
            included.len()
        ));
    }

    // --- Statistics and implied values per multiple ---
    let mut multiple_statistics: Vec<MultipleStatistics> = Vec::new();
    let mut implied_valuations: Vec<ImpliedValuation> = Vec::new();

    for &multiple_type in &input.multiples {
        let stats = collect_statistics(multiple_type, &included, &mut warnings)?;

        if stats.count == 0 {
            warnings.push(format!(
                "No peer had a usable {multiple_type}; multiple skipped"
            ));
            multiple_statistics.push(stats);
            continue;
        }

        let implied = apply_multiple(multiple_type, &stats, input, &mut warnings)?;
        implied_valuations.push(implied);
        multiple_statistics.push(stats);
    }

    if implied_valuations.is_empty() {
        return Err(FairValueError::invalid(
            "peers",
            "No requested multiple had a usable value from any peer",
        ));
    }

    let equity_value_range = equity_range(&implied_valuations);

    let output = CompsOutput {
        target_name: input.target.name.clone(),
        basis: input.basis,
        multiple_statistics,
        implied_valuations,
        equity_value_range,
        peers_included: included.len(),
        peers_excluded: excluded_count,
        currency: input.currency.clone(),
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Comparable Company Analysis (Trading Multiples)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_comps_input(input: &CompsInput) -> FairValueResult<()> {
    if input.peers.is_empty() {
        return Err(FairValueError::invalid(
            "peers",
            "At least one peer company is required",
        ));
    }
    if input.multiples.is_empty() {
        return Err(FairValueError::invalid(
            "multiples",
            "At least one multiple type must be specified",
        ));
    }

    for &multiple_type in &input.multiples {
        match input.target.metric(multiple_type) {
            Some(value) if value < Decimal::ZERO => {
                return Err(FairValueError::invalid(
                    multiple_type.target_field(),
                    format!("Target metric for {multiple_type} must not be negative (got {value})"),
                ));
            }
            Some(_) => {}
            None => {
                return Err(FairValueError::invalid(
                    multiple_type.target_field(),
                    format!("Target metric for {multiple_type} is required"),
                ));
            }
        }
    }

    if let Some(shares) = input.target.shares_outstanding {
        if shares <= Decimal::ZERO {
            return Err(FairValueError::invalid(
                "target.shares_outstanding",
                "Shares outstanding must be positive",
            ));
        }
    }
    if let Some(price) = input.target.share_price {
        if price <= Decimal::ZERO {
            return Err(FairValueError::invalid(
                "target.share_price",
                "Share price must be positive",
            ));
        }
    }

    Ok(())
}

/// Gather usable peer values for one multiple; negatives are excluded and
/// flagged, missing values are noted.
fn collect_statistics(
    multiple_type: MultipleType,
    peers: &[&PeerMultiples],
    warnings: &mut Vec<String>,
) -> FairValueResult<MultipleStatistics> {
    let mut values: Vec<(String, Multiple)> = Vec::new();
    let mut excluded: Vec<(String, Multiple)> = Vec::new();

    for peer in peers {
        match peer.multiple(multiple_type) {
            Some(v) if v < Decimal::ZERO => {
                warnings.push(format!(
                    "{}: negative {multiple_type} ({v}) excluded",
                    peer.name
                ));
                excluded.push((peer.name.clone(), v));
            }
            Some(v) => values.push((peer.name.clone(), v)),
            None => {
                warnings.push(format!("{}: no {multiple_type} reported", peer.name));
            }
        }
    }

    let raw: Vec<Multiple> = values.iter().map(|(_, v)| *v).collect();
    let summary = summarize(&raw, "peers")?;

    Ok(MultipleStatistics {
        multiple_type,
        values,
        excluded,
        mean: summary.mean,
        median: summary.median,
        high: summary.high,
        low: summary.low,
        std_dev: summary.std_dev,
        count: summary.count,
    })
}

fn apply_multiple(
    multiple_type: MultipleType,
    stats: &MultipleStatistics,
    input: &CompsInput,
    warnings: &mut Vec<String>,
) -> FairValueResult<ImpliedValuation> {
    let target = &input.target;
    let metric = target.metric(multiple_type).ok_or_else(|| {
        FairValueError::invalid(
            multiple_type.target_field(),
            format!("Target metric for {multiple_type} is required"),
        )
    })?;

    let field = multiple_type.target_field();
    let applied_multiple = input.basis.pick(stats);
    let implied_value = checked::mul(applied_multiple, metric, field)?;

    let value_kind = multiple_type.value_kind();
    let implied_equity_value = match value_kind {
        ValueKind::EquityValue => Some(implied_value),
        ValueKind::EnterpriseValue => match target.net_debt {
            Some(net_debt) => Some(checked::sub(implied_value, net_debt, "target.net_debt")?),
            None => {
                warnings.push(format!(
                    "Target net debt not supplied; {multiple_type} implied value is enterprise value only"
                ));
                None
            }
        },
    };

    // shares and price validated positive
    let implied_price_per_share = match (implied_equity_value, target.shares_outstanding) {
        (Some(equity), Some(shares)) => {
            Some(checked::div(equity, shares, "target.shares_outstanding")?)
        }
        _ => None,
    };
    let upside_pct = match (implied_price_per_share, target.share_price) {
        (Some(implied), Some(price)) => {
            let ratio = checked::div(implied, price, "target.share_price")?;
            let excess = checked::sub(ratio, Decimal::ONE, "target.share_price")?;
            Some(checked::mul(excess, dec!(100), "target.share_price")?)
        }
        _ => None,
    };

    Ok(ImpliedValuation {
        multiple_type,
        value_kind,
        target_metric_value: metric,
        applied_multiple,
        implied_value,
        implied_at_low: checked::mul(stats.low, metric, field)?,
        implied_at_high: checked::mul(stats.high, metric, field)?,
        implied_equity_value,
        implied_price_per_share,
        upside_pct,
    })
}

fn equity_range(implied: &[ImpliedValuation]) -> Option<ValuationRange> {
    let equity: Vec<Money> = implied
        .iter()
        .filter_map(|v| v.implied_equity_value)
        .collect();
    let low = equity.iter().copied().min()?;
    let high = equity.iter().copied().max()?;
    Some(ValuationRange { low, high })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
