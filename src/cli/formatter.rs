/// Terminal output helpers shared by the commands
use colored::*;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color as TableColor, ContentArrangement, Table};

/// Print a bulleted information box
pub fn info_box(title: &str, items: &[&str]) {
    println!("\n{} {}", "ℹ".cyan(), title.bold());
    for item in items {
        println!("  {} {}", "•".dimmed(), item);
    }
}

pub fn print_warning(message: &str) {
    println!(
        "{} {}",
        "⚠".yellow(),
        format!("Warning: {}", message).yellow()
    );
}

pub fn print_error(message: &str) {
    eprintln!("\n{} {}", "✗".red(), format!("Error: {}", message).red());
}

pub fn print_success(message: &str) {
    println!("\n{} {}", "✓".green().bold(), message);
}

pub fn print_tip(message: &str) {
    println!("\n{} {}", "→".cyan(), format!("Tip: {}", message).dimmed());
}

/// Print a section header
pub fn print_section(title: &str) {
    let width = terminal_size::terminal_size()
        .map(|(terminal_size::Width(w), _)| w as usize)
        .unwrap_or(80);
    let line = "─".repeat(width.min(60));
    println!("\n{} {}", "▶".cyan(), title.bold());
    println!("{}", line.dimmed());
}

/// Two-column statistics table
pub fn stats_table(title: &str, stats: &[(&str, String)]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new(title)
            .add_attribute(Attribute::Bold)
            .fg(TableColor::Cyan),
        Cell::new("").add_attribute(Attribute::Bold),
    ]);

    for (label, value) in stats {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(value).fg(TableColor::Green),
        ]);
    }
    table
}

pub fn print_stats_table(title: &str, stats: &[(&str, String)]) {
    println!("\n{}", stats_table(title, stats));
}

/// Print formatted number with thousands separator
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Check if colors should be disabled
pub fn colors_enabled() -> bool {
    std::env::var("NO_COLOR").is_err()
        && std::env::var("CLICOLOR").unwrap_or_else(|_| "1".to_string()) != "0"
}

pub fn init() {
    if !colors_enabled() {
        colored::control::set_override(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn test_stats_table_contains_rows() {
        let rendered = stats_table("Job", &[("Target genomes", "12".to_string())]).to_string();
        assert!(rendered.contains("Target genomes"));
        assert!(rendered.contains("12"));
    }
}
