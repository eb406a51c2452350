//! Rendering helpers shared by all commands.

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Print a list of rows as a blank-style table or a JSON array.
pub fn print_rows<T: Tabled + Serialize>(format: OutputFormat, rows: &[T]) -> Result<(), CliError> {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                return Ok(());
            }
            println!("{}", Table::new(rows).with(Style::blank()));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
    }
    Ok(())
}

/// Print a single object: key/value lines in table mode, one JSON object
/// otherwise.
pub fn print_object<T: Serialize>(format: OutputFormat, value: &T) -> Result<(), CliError> {
    match format {
        OutputFormat::Table => {
            let json = serde_json::to_value(value)?;
            if let serde_json::Value::Object(map) = json {
                let width = map.keys().map(String::len).max().unwrap_or(0);
                for (key, val) in map {
                    println!("{key:<width$}  {}", plain(&val));
                }
            } else {
                println!("{}", plain(&json));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn plain(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

/// "yes" / "no" for table cells.
pub fn yes_no(v: bool) -> &'static str {
    if v {
        "yes"
    } else {
        "no"
    }
}
