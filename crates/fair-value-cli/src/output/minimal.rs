use serde_json::Value;

use super::scalar_text;

/// Headline fields, most specific first. A DCF with shares reports the
/// per-share value; without shares it falls through to enterprise value.
const PRIORITY_KEYS: [&str; 6] = [
    "wacc",
    "growth_rate",
    "fair_value_per_share",
    "enterprise_value",
    "equity_value_range",
    "base_case_value",
];

/// Print just the headline number from the output.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    println!("{}", headline(result_obj));
}

fn headline(result: &Value) -> String {
    let Value::Object(map) = result else {
        return scalar_text(result);
    };

    for key in PRIORITY_KEYS {
        match map.get(key) {
            Some(Value::Null) | None => continue,
            // Comps range prints as "low-high"
            Some(Value::Object(range)) => {
                let low = range.get("low").map(scalar_text).unwrap_or_default();
                let high = range.get("high").map(scalar_text).unwrap_or_default();
                return format!("{low}-{high}");
            }
            Some(val) => return scalar_text(val),
        }
    }

    map.iter()
        .next()
        .map(|(key, val)| format!("{}: {}", key, scalar_text(val)))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_per_share_preferred_over_ev() {
        let result = json!({"enterprise_value": "1000", "fair_value_per_share": "12.5"});
        assert_eq!(headline(&result), "12.5");
    }

    #[test]
    fn test_null_per_share_falls_back_to_ev() {
        let result = json!({"enterprise_value": "1000", "fair_value_per_share": null});
        assert_eq!(headline(&result), "1000");
    }

    #[test]
    fn test_comps_range() {
        let result = json!({"equity_value_range": {"low": "800", "high": "1200"}});
        assert_eq!(headline(&result), "800-1200");
    }
}
