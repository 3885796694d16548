use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{scalar_text, sensitivity_grid};

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    match value.as_object() {
        Some(envelope) => match envelope.get("result") {
            Some(result) => print_result(result, envelope),
            None => println!("{}", field_table(envelope)),
        },
        None => println!("{}", scalar_text(value)),
    }
}

fn print_result(result: &Value, envelope: &Map<String, Value>) {
    if let Some(grid) = sensitivity_grid(result) {
        let mut builder = Builder::default();
        builder.push_record(grid.header);
        for row in grid.rows {
            builder.push_record(row);
        }
        println!("{}", Table::from(builder));
        if let Some(base) = result.get("base_case_value") {
            println!("\nBase case: {}", scalar_text(base));
        }
    } else if let Value::Object(res_map) = result {
        // Scalars first, then one sub-table per list of records
        let (lists, scalars): (Vec<_>, Vec<_>) = res_map
            .iter()
            .partition(|(_, v)| is_record_list(v));

        let scalars: Map<String, Value> = scalars
            .into_iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        println!("{}", field_table(&scalars));

        for (name, list) in lists {
            if let Value::Array(records) = list {
                println!("\n{}:", name);
                println!("{}", records_table(records));
            }
        }
    } else {
        println!("{}", scalar_text(result));
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                println!("  - {}", scalar_text(w));
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn is_record_list(value: &Value) -> bool {
    matches!(value, Value::Array(arr) if arr.first().is_some_and(Value::is_object))
}

fn field_table(map: &Map<String, Value>) -> Table {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.clone(), cell_text(val)]);
    }
    Table::from(builder)
}

fn records_table(records: &[Value]) -> Table {
    let headers: Vec<String> = records
        .first()
        .and_then(Value::as_object)
        .map(|first| first.keys().cloned().collect())
        .unwrap_or_default();

    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for record in records.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| record.get(h).map(cell_text).unwrap_or_default())
            .collect();
        builder.push_record(row);
    }
    Table::from(builder)
}

/// Like scalar_text, but flattens short arrays (peer multiples) inline.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Array(arr) => arr.iter().map(cell_text).collect::<Vec<_>>().join(", "),
        Value::Null => "-".to_string(),
        _ => scalar_text(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_list_detection() {
        assert!(is_record_list(&json!([{"year": 1}])));
        assert!(!is_record_list(&json!(["11", "12"])));
        assert!(!is_record_list(&json!([])));
    }

    #[test]
    fn test_records_table_columns() {
        let records = vec![
            json!({"year": 1, "fcf": "110"}),
            json!({"year": 2, "fcf": "121"}),
        ];
        let rendered = records_table(&records).to_string();
        assert!(rendered.contains("fcf"));
        assert!(rendered.contains("121"));
    }
}
