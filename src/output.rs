use anyhow::Result;
use prettytable::{Cell, Row as TableRow, Table};
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::flatten::Row;

/// Print reporting rows either as a table with a fixed column order or as a
/// pretty JSON array of the full rows.
pub fn print_rows(rows: &[Row], columns: &[&str], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows)?);
        }
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("No resources found");
                return Ok(());
            }
            render_table(rows, columns).printstd();
            println!("TOTAL: {}", rows.len());
        }
    }
    Ok(())
}

fn render_table(rows: &[Row], columns: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_titles(TableRow::new(
        columns.iter().map(|column| Cell::new(column)).collect(),
    ));

    for row in rows {
        let cells = columns
            .iter()
            .map(|column| Cell::new(&display_value(row.get(*column))))
            .collect();
        table.add_row(TableRow::new(cells));
    }

    table
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
