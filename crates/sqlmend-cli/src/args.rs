//! CLI argument definitions

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sqlmend")]
#[command(author, version, about = "Schema-aware SQL column reference repair")]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Schema inputs shared by every subcommand.
#[derive(ClapArgs)]
pub struct SchemaArgs {
    /// Schema DDL files (CREATE TABLE scripts)
    #[arg(short, long = "schema", value_name = "FILE")]
    pub schema: Vec<PathBuf>,

    /// Flat JSON table/column export ([{"TableName": ..., "ColumnName": ...}])
    #[arg(long = "schema-json", value_name = "FILE")]
    pub schema_json: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fix SQL references in markdown documents, rewriting files in place
    Fix {
        /// Markdown files to fix (supports glob patterns)
        files: Vec<PathBuf>,

        #[command(flatten)]
        schema_args: SchemaArgs,

        /// Configuration file (defaults to the nearest sqlmend.toml)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Fuzzy match threshold, 0.0 to 1.0
        #[arg(short, long, value_parser = parse_threshold)]
        threshold: Option<f64>,

        /// Report what would change without writing any file
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate documents against the schema without writing anything
    Check {
        /// Markdown files to check (supports glob patterns)
        files: Vec<PathBuf>,

        #[command(flatten)]
        schema_args: SchemaArgs,

        /// Configuration file (defaults to the nearest sqlmend.toml)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Fuzzy match threshold, 0.0 to 1.0
        #[arg(short, long, value_parser = parse_threshold)]
        threshold: Option<f64>,

        /// Output format
        #[arg(short, long, default_value = "human", value_enum)]
        format: OutputFormat,
    },

    /// Display the schema catalog as a markdown summary
    Schema {
        #[command(flatten)]
        schema_args: SchemaArgs,

        /// Write the summary to a file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Human,
    /// JSON report
    Json,
    /// Markdown validation report
    Markdown,
}

/// A threshold outside 0.0..=1.0 would silently disable or trivialize the
/// fuzzy tier, so reject it at parse time.
fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a number"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("threshold must be between 0.0 and 1.0, got {value}"))
    }
}
