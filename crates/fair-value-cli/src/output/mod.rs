pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
/// Text reports are already rendered and print as-is in every format.
pub fn format_output(format: &OutputFormat, value: &Value) {
    if let Value::String(report) = value {
        println!("{}", report);
        return;
    }
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

/// A sensitivity matrix flattened to a header row plus labelled rows.
pub(crate) struct Grid {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Pull the row/column grid out of a sensitivity result, if it is one.
pub(crate) fn sensitivity_grid(result: &Value) -> Option<Grid> {
    let matrix = result.get("matrix")?.as_array()?;
    let v1_name = result.get("variable_1_name")?.as_str()?;
    let v2_name = result.get("variable_2_name")?.as_str()?;
    let v1_values = result.get("variable_1_values")?.as_array()?;
    let v2_values = result.get("variable_2_values")?.as_array()?;

    let mut header = vec![format!("{v1_name} \\ {v2_name}")];
    header.extend(v2_values.iter().map(scalar_text));

    let rows = v1_values
        .iter()
        .zip(matrix)
        .map(|(label, row)| {
            let mut cells = vec![scalar_text(label)];
            if let Some(row) = row.as_array() {
                cells.extend(row.iter().map(scalar_text));
            }
            cells
        })
        .collect();

    Some(Grid { header, rows })
}

/// Render a scalar JSON value as plain text; null becomes empty.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sensitivity_grid() {
        let result = json!({
            "variable_1_name": "discount_rate",
            "variable_2_name": "terminal_growth_rate",
            "variable_1_values": ["0.09", "0.10"],
            "variable_2_values": ["0.02", "0.03"],
            "matrix": [["1500", "1700"], [null, "1400"]],
        });
        let grid = sensitivity_grid(&result).unwrap();
        assert_eq!(
            grid.header,
            vec!["discount_rate \\ terminal_growth_rate", "0.02", "0.03"]
        );
        assert_eq!(grid.rows[1], vec!["0.10", "", "1400"]);
    }

    #[test]
    fn test_non_grid_result() {
        assert!(sensitivity_grid(&json!({"wacc": "0.09"})).is_none());
    }
}
