//! Output formatting for run reports and schema summaries

use sqlmend_core::{Catalog, RunReport};

use crate::args::OutputFormat;

/// How many usage rows the validation report shows.
const USAGE_TOP_N: usize = 20;

/// Report printer for the check command.
pub struct ReportPrinter {
    format: OutputFormat,
}

impl ReportPrinter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn print(&self, report: &RunReport) {
        match self.format {
            OutputFormat::Human => self.print_human(report),
            OutputFormat::Json => self.print_json(report),
            OutputFormat::Markdown => print!("{}", render_markdown(report)),
        }
    }

    fn print_human(&self, report: &RunReport) {
        println!(
            "{} file(s) scanned, {} with changes; {} reference(s), {} change(s), {} unresolved",
            report.files_scanned(),
            report.files_changed(),
            report.references_seen(),
            report.changes().len(),
            report.unresolved().len()
        );

        for (file, changes) in report.changes_by_file() {
            println!("\n{}", file);
            for change in changes {
                println!(
                    "  {}: {} -> {} ({})",
                    change.line, change.before, change.after, change.reason
                );
            }
        }

        if !report.unresolved().is_empty() {
            println!("\nUnresolved references:");
            for item in report.unresolved() {
                print!(
                    "  {}:{}: column '{}' not found in {}",
                    item.file, item.line, item.column, item.table
                );
                if item.suggestions.is_empty() {
                    println!();
                } else {
                    println!(" (exists in: {})", item.suggestions.join(", "));
                }
            }
        }
    }

    fn print_json(&self, report: &RunReport) {
        match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: failed to serialize report: {}", e),
        }
    }
}

/// Render the full validation report as markdown.
pub fn render_markdown(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str("# Validation report\n\n");
    out.push_str(&format!("- Files scanned: {}\n", report.files_scanned()));
    out.push_str(&format!("- Files with changes: {}\n", report.files_changed()));
    out.push_str(&format!("- References seen: {}\n", report.references_seen()));
    out.push_str(&format!("- Changes: {}\n", report.changes().len()));
    out.push_str(&format!("- Unresolved: {}\n", report.unresolved().len()));

    let grouped = report.changes_by_file();
    if !grouped.is_empty() {
        out.push_str("\n## Changes\n");
        for (file, changes) in grouped {
            out.push_str(&format!("\n### {}\n\n", file));
            out.push_str("| Line | Before | After | Reason |\n");
            out.push_str("|------|--------|-------|--------|\n");
            for change in changes {
                out.push_str(&format!(
                    "| {} | `{}` | `{}` | {} |\n",
                    change.line, change.before, change.after, change.reason
                ));
            }
        }
    }

    if !report.unresolved().is_empty() {
        out.push_str("\n## Unresolved references\n\n");
        out.push_str("| File | Line | Table | Column | Also found in |\n");
        out.push_str("|------|------|-------|--------|---------------|\n");
        for item in report.unresolved() {
            out.push_str(&format!(
                "| {} | {} | {} | `{}` | {} |\n",
                item.file,
                item.line,
                item.table,
                item.column,
                if item.suggestions.is_empty() {
                    "-".to_string()
                } else {
                    item.suggestions.join(", ")
                }
            ));
        }
    }

    let usage = report.usage_ranked();
    if !usage.is_empty() {
        out.push_str("\n## Most referenced columns\n\n");
        out.push_str("| Column | References |\n");
        out.push_str("|--------|------------|\n");
        for (key, count) in usage.iter().take(USAGE_TOP_N) {
            out.push_str(&format!("| `{}` | {} |\n", key, count));
        }
    }

    out
}

/// Render the table -> ordered column summary as markdown.
pub fn render_schema_summary(catalog: &Catalog) -> String {
    let mut out = String::new();
    out.push_str("# Schema summary\n");

    for table in catalog.tables() {
        out.push_str(&format!("\n## {}\n\n", table.display_name));
        for column in table.column_names() {
            out.push_str(&format!("- {}\n", column));
        }
    }

    out
}
