use serde_json::Value;
use std::io;

use super::{scalar_text, sensitivity_grid};

/// Write output as CSV to stdout.
///
/// Sensitivity results become a grid with the row variable in the first
/// column. DCF results emit the projection schedule. Everything else is a
/// two-column field/value listing.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    if let Err(e) = write_csv(&mut wtr, value) {
        eprintln!("CSV write error: {}", e);
    }
    let _ = wtr.flush();
}

fn write_csv<W: io::Write>(wtr: &mut csv::Writer<W>, value: &Value) -> Result<(), csv::Error> {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(grid) = sensitivity_grid(result) {
        wtr.write_record(&grid.header)?;
        for row in &grid.rows {
            wtr.write_record(row)?;
        }
        return Ok(());
    }

    if let Some(Value::Array(projections)) = result.get("projections") {
        return write_records(wtr, projections);
    }

    match result {
        Value::Object(map) => {
            wtr.write_record(["field", "value"])?;
            for (key, val) in map {
                wtr.write_record([key.as_str(), &scalar_text(val)])?;
            }
        }
        Value::Array(arr) => write_records(wtr, arr)?,
        _ => wtr.write_record([scalar_text(result)])?,
    }
    Ok(())
}

fn write_records<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) -> Result<(), csv::Error> {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            wtr.write_record([scalar_text(item)])?;
        }
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    wtr.write_record(&headers)?;
    for map in arr.iter().filter_map(Value::as_object) {
        let row: Vec<String> = headers
            .iter()
            .map(|h| map.get(*h).map(scalar_text).unwrap_or_default())
            .collect();
        wtr.write_record(&row)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_csv(&mut wtr, value).unwrap();
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_grid_csv() {
        let value = json!({"result": {
            "variable_1_name": "growth_rate",
            "variable_2_name": "base_fcf",
            "variable_1_values": ["0.05"],
            "variable_2_values": ["50", "100"],
            "matrix": [["700", null]],
        }});
        assert_eq!(
            render(&value),
            "growth_rate \\ base_fcf,50,100\n0.05,700,\n"
        );
    }

    #[test]
    fn test_field_value_csv() {
        let value = json!({"result": {"wacc": "0.09"}});
        assert_eq!(render(&value), "field,value\nwacc,0.09\n");
    }
}
