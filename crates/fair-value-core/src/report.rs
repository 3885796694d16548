//! Plain-text valuation reports.
//!
//! Rendering is the only place values are rounded; calculators keep full
//! decimal precision.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{Currency, Money, Rate};
use crate::valuation::comps::{CompsOutput, ValueKind};
use crate::valuation::dcf::{DcfInput, DcfOutput};

const RULE_WIDTH: usize = 60;

/// Money with thousands separators and two decimals, e.g. `-$1,234.50`.
pub fn format_money(value: Money, currency: &Currency) -> String {
    let rounded = value.round_dp(2);
    let sign = if rounded < Decimal::ZERO { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}{}{grouped}.{frac_part}", currency.symbol())
}

/// Rate as a percentage with two decimals, e.g. `2.50%`.
pub fn format_pct(rate: Rate) -> String {
    match rate.checked_mul(dec!(100)) {
        Some(pct) => format!("{:.2}%", pct.round_dp(2)),
        None => "out of range".to_string(),
    }
}

fn signed_pct(pct: Decimal) -> String {
    let rounded = pct.round_dp(1);
    if rounded >= Decimal::ZERO {
        format!("+{rounded:.1}%")
    } else {
        format!("{rounded:.1}%")
    }
}

fn rule(ch: char) -> String {
    std::iter::repeat(ch).take(RULE_WIDTH).collect()
}

fn heading(lines: &mut Vec<String>, title: &str) {
    lines.push(title.to_string());
    lines.push("-".repeat(title.len()));
}

/// Render a DCF valuation.
pub fn dcf_report(name: &str, input: &DcfInput, output: &DcfOutput, as_of: NaiveDate) -> String {
    let ccy = &output.currency;
    let mut lines = Vec::new();

    lines.push(rule('='));
    lines.push(format!("DCF VALUATION REPORT: {name}"));
    lines.push(rule('='));
    lines.push(format!("Date: {}", as_of.format("%Y-%m-%d")));
    lines.push(String::new());

    heading(&mut lines, "ASSUMPTIONS");
    lines.push(format!(
        "Discount Rate: {}",
        format_pct(output.discount_rate_used)
    ));
    lines.push(format!("FCF Growth Rate: {}", format_pct(input.growth_rate)));
    lines.push(format!(
        "Terminal Growth Rate: {}",
        format_pct(input.terminal_growth_rate)
    ));
    lines.push(format!("Forecast Period: {} years", input.forecast_years));
    if input.mid_year_convention.unwrap_or(false) {
        lines.push("Mid-year discounting convention".into());
    }
    lines.push(String::new());

    heading(&mut lines, "CASH FLOW PROJECTION");
    lines.push(format!("Base FCF: {}", format_money(input.base_fcf, ccy)));
    for p in &output.projections {
        lines.push(format!(
            "  Year {}: {} (PV {})",
            p.year,
            format_money(p.fcf, ccy),
            format_money(p.present_value, ccy)
        ));
    }
    lines.push(String::new());

    heading(&mut lines, "VALUATION");
    lines.push(format!(
        "Terminal Value: {}",
        format_money(output.terminal_value, ccy)
    ));
    lines.push(format!(
        "PV of Terminal Value: {} ({} of EV)",
        format_money(output.pv_of_terminal, ccy),
        format_pct(output.terminal_value_pct)
    ));
    lines.push(format!(
        "PV of Projected FCF: {}",
        format_money(output.pv_of_fcf, ccy)
    ));
    lines.push(format!(
        "Enterprise Value: {}",
        format_money(output.enterprise_value, ccy)
    ));
    lines.push(String::new());

    heading(&mut lines, "EQUITY VALUE");
    lines.push(format!(
        "(+) Cash: {}",
        format_money(input.cash.unwrap_or(Decimal::ZERO), ccy)
    ));
    lines.push(format!(
        "(-) Debt: {}",
        format_money(input.debt.unwrap_or(Decimal::ZERO), ccy)
    ));
    lines.push(format!(
        "= Equity Value: {}",
        format_money(output.equity_value, ccy)
    ));

    if let (Some(shares), Some(per_share)) =
        (input.shares_outstanding, output.fair_value_per_share)
    {
        lines.push(String::new());
        heading(&mut lines, "PER SHARE");
        lines.push(format!("Shares Outstanding: {}", shares.round_dp(0)));
        lines.push(format!(
            "Fair Value per Share: {}",
            format_money(per_share, ccy)
        ));
        if let (Some(price), Some(upside)) = (input.current_price, output.upside_pct) {
            lines.push(format!("Current Price: {}", format_money(price, ccy)));
            lines.push(format!("Upside/(Downside): {}", signed_pct(upside)));
        }
    }

    lines.push(String::new());
    lines.push(rule('='));
    lines.join("\n")
}

/// Render a comparable-company analysis.
pub fn comps_report(output: &CompsOutput, as_of: NaiveDate) -> String {
    let ccy = &output.currency;
    let mut lines = Vec::new();

    lines.push(rule('='));
    lines.push(format!(
        "COMPARABLE COMPANY ANALYSIS: {}",
        output.target_name
    ));
    lines.push(rule('='));
    lines.push(format!("Date: {}", as_of.format("%Y-%m-%d")));
    lines.push(format!(
        "Peers: {} included, {} excluded",
        output.peers_included, output.peers_excluded
    ));
    lines.push(String::new());

    heading(&mut lines, "TRADING MULTIPLES");
    for stats in &output.multiple_statistics {
        if stats.count == 0 {
            lines.push(format!("  {}: n/a", stats.multiple_type));
            continue;
        }
        lines.push(format!(
            "  {}: median {:.2}x, mean {:.2}x, range {:.2}x - {:.2}x (n={})",
            stats.multiple_type,
            stats.median.round_dp(2),
            stats.mean.round_dp(2),
            stats.low.round_dp(2),
            stats.high.round_dp(2),
            stats.count
        ));
    }
    lines.push(String::new());

    heading(
        &mut lines,
        &format!("IMPLIED VALUATION ({} multiples)", output.basis),
    );
    for v in &output.implied_valuations {
        let kind = match v.value_kind {
            ValueKind::EquityValue => "equity",
            ValueKind::EnterpriseValue => "EV",
        };
        let mut line = format!(
            "  {}: {} {kind} at {:.2}x (range {} - {})",
            v.multiple_type,
            format_money(v.implied_value, ccy),
            v.applied_multiple.round_dp(2),
            format_money(v.implied_at_low, ccy),
            format_money(v.implied_at_high, ccy)
        );
        if let Some(price) = v.implied_price_per_share {
            line.push_str(&format!(", {} per share", format_money(price, ccy)));
        }
        if let Some(upside) = v.upside_pct {
            line.push_str(&format!(" ({} vs current)", signed_pct(upside)));
        }
        lines.push(line);
    }

    if let Some(range) = &output.equity_value_range {
        lines.push(String::new());
        lines.push(format!(
            "Equity value range: {} - {}",
            format_money(range.low, ccy),
            format_money(range.high, ccy)
        ));
    }

    lines.push(String::new());
    lines.push(rule('='));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::comps::{
        calculate_comps, CompsInput, MultipleBasis, MultipleType, PeerMultiples, TargetFinancials,
    };
    use crate::valuation::dcf::calculate_dcf;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec!(1234567.891), &Currency::USD), "$1,234,567.89");
        assert_eq!(format_money(dec!(-950), &Currency::GBP), "-£950.00");
        assert_eq!(format_money(dec!(0), &Currency::USD), "$0.00");
        assert_eq!(format_money(dec!(100000), &Currency::EUR), "€100,000.00");
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(dec!(0.025)), "2.50%");
        assert_eq!(format_pct(dec!(0.1)), "10.00%");
        assert_eq!(format_pct(Decimal::MAX), "out of range");
    }

    #[test]
    fn test_dcf_report_contents() {
        let input = DcfInput {
            base_fcf: dec!(100),
            growth_rate: dec!(0.10),
            discount_rate: dec!(0.10),
            terminal_growth_rate: dec!(0.025),
            forecast_years: 5,
            cash: Some(dec!(200)),
            debt: Some(dec!(100)),
            shares_outstanding: Some(dec!(100)),
            current_price: Some(dec!(15)),
            mid_year_convention: None,
            currency: Currency::USD,
        };
        let out = calculate_dcf(&input).unwrap().result;
        let text = dcf_report("ACME", &input, &out, as_of());

        assert!(text.contains("DCF VALUATION REPORT: ACME"));
        assert!(text.contains("Date: 2024-03-31"));
        assert!(text.contains("Year 5: $161.05"));
        assert!(text.contains("Enterprise Value: $1,866.67"));
        assert!(text.contains("Terminal Growth Rate: 2.50%"));
        assert!(text.contains("Fair Value per Share: $19.67"));
        assert!(text.contains("Upside/(Downside): +31.1%"));
    }

    #[test]
    fn test_comps_report_contents() {
        let input = CompsInput {
            target: TargetFinancials {
                name: "TargetCo".into(),
                earnings: dec!(10),
                ebitda: dec!(20),
                revenue: dec!(100),
                book_value: None,
                net_debt: None,
                shares_outstanding: None,
                share_price: None,
            },
            peers: vec![
                PeerMultiples {
                    name: "A".into(),
                    pe: Some(dec!(20)),
                    ev_ebitda: None,
                    ps: Some(dec!(2)),
                    pb: None,
                    include: true,
                },
                PeerMultiples {
                    name: "B".into(),
                    pe: Some(dec!(30)),
                    ev_ebitda: None,
                    ps: Some(dec!(4)),
                    pb: None,
                    include: true,
                },
            ],
            multiples: MultipleType::default_set(),
            basis: MultipleBasis::Median,
            currency: Currency::USD,
        };
        let out = calculate_comps(&input).unwrap().result;
        let text = comps_report(&out, as_of());

        assert!(text.contains("COMPARABLE COMPANY ANALYSIS: TargetCo"));
        assert!(text.contains("P/E: median 25.00x"));
        assert!(text.contains("EV/EBITDA: n/a"));
        assert!(text.contains("P/E: $250.00 equity at 25.00x"));
        assert!(text.contains("IMPLIED VALUATION (median multiples)"));
    }
}
