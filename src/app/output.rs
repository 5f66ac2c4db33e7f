//! Terminal formatting for command output

use colored::Colorize;
use prettytable::{format, Cell, Row, Table};

/// Format a compact table with headers and rows using the clean prettytable format
pub fn format_compact_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_CLEAN);
    table.set_titles(Row::new(headers.iter().map(|header| Cell::new(header)).collect()));

    for row in rows {
        table.add_row(Row::new(row.iter().map(|cell| Cell::new(cell)).collect()));
    }

    // 2-space indent under section headings
    let mut result = String::new();
    for line in table.to_string().lines() {
        result.push_str("  ");
        result.push_str(line.trim_end());
        result.push('\n');
    }
    result
}

pub fn heading(text: &str) -> String {
    let underline = "=".repeat(text.chars().count());
    format!("{}\n{}", text.bold(), underline)
}

pub fn yes_no(value: bool) -> String {
    if value {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    }
}

/// Key/value lines aligned on the longest key
pub fn format_properties(properties: &[(&str, String)]) -> String {
    let width = properties.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    properties
        .iter()
        .map(|(key, value)| format!("  {:width$}  {}\n", key, value, width = width))
        .collect()
}
