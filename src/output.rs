use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::OutputFormat;

/// Global output settings, set once from the command line.
static OUTPUT_FORMAT: AtomicU8 = AtomicU8::new(0);
static QUIET: AtomicBool = AtomicBool::new(false);

pub fn set_format(format: OutputFormat) {
    let value = match format {
        OutputFormat::Table => 0,
        OutputFormat::Json => 1,
        OutputFormat::Compact => 2,
    };
    OUTPUT_FORMAT.store(value, Ordering::Relaxed);
}

pub fn format() -> OutputFormat {
    match OUTPUT_FORMAT.load(Ordering::Relaxed) {
        1 => OutputFormat::Json,
        2 => OutputFormat::Compact,
        _ => OutputFormat::Table,
    }
}

pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Print a table or JSON depending on output mode
pub fn print_table<T, R, F>(items: &[T], to_row: F)
where
    T: Serialize,
    R: Tabled,
    F: Fn(&T) -> R,
{
    match format() {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        style => {
            let rows: Vec<R> = items.iter().map(to_row).collect();
            let mut table = Table::new(rows);
            match style {
                OutputFormat::Compact => table.with(Style::blank()),
                _ => table.with(Style::rounded()),
            };
            println!("{table}");
        }
    }
}

/// Print a single item or JSON depending on output mode
pub fn print_item<T: Serialize>(item: &T, display: impl FnOnce(&T)) {
    if matches!(format(), OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(item).unwrap_or_default());
    } else {
        display(item);
    }
}

/// Print a success message. Suppressed by `--quiet`; a JSON object in JSON mode.
pub fn print_message(message: &str) {
    if is_quiet() {
        return;
    }
    if matches!(format(), OutputFormat::Json) {
        println!("{}", serde_json::json!({ "message": message }));
    } else {
        println!("{}", message.green());
    }
}

/// Format an id for tables and prompts
pub fn id_colored(id: i64) -> String {
    format!("#{id}").bright_black().to_string()
}

/// Format a timestamp in local time
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    let local: DateTime<Local> = (*at).into();
    local.format("%Y-%m-%d %H:%M").to_string()
}

/// Truncate a string with ellipsis
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
