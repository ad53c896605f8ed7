//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use predictor_lib::Label;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format an inclusive range, dropping needless decimals
pub fn format_range(min: f64, max: f64) -> String {
    format!("{} - {}", min, max)
}

/// Color a model session state
pub fn color_state(state: &str) -> String {
    match state.to_lowercase().as_str() {
        "ready" => state.green().to_string(),
        "loading" | "unloaded" => state.yellow().to_string(),
        "failed" => state.red().to_string(),
        _ => state.to_string(),
    }
}

/// Color a diagnosis
pub fn color_label(label: Label) -> String {
    match label {
        Label::Diabetes => label.to_string().red().bold().to_string(),
        Label::NoDiabetes => label.to_string().green().bold().to_string(),
    }
}
