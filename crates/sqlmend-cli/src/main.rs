//! sqlmend CLI - schema-aware SQL reference repair for markdown documents

mod args;
mod config;
mod output;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use sqlmend_core::resolver::DEFAULT_FUZZY_THRESHOLD;
use sqlmend_core::{Catalog, ColumnRecord, DocumentRewriter, RunReport, SchemaBuilder};

use crate::args::{Args, Command};
use crate::config::Config;
use crate::output::ReportPrinter;

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.quiet {
        tracing::Level::ERROR
    } else {
        match args.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match run(args) {
        Ok(has_findings) => {
            if has_findings {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(args: Args) -> Result<bool> {
    match args.command {
        Command::Fix {
            files,
            schema_args,
            config: config_path,
            threshold,
            dry_run,
        } => {
            let config = load_config(config_path)?.merge_with_args(
                &schema_args.schema,
                &schema_args.schema_json,
                &files,
                threshold,
            );
            let catalog = build_catalog(&config)?;
            let documents = collect_documents(&config)?;

            let rewriter = DocumentRewriter::new(
                &catalog,
                config.threshold.unwrap_or(DEFAULT_FUZZY_THRESHOLD),
                config.effective_remaps(),
            );

            let mut report = RunReport::new();
            for path in &documents {
                let content = fs::read_to_string(path)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("failed to read {}", path.display()))?;
                let (fixed, changed) =
                    rewriter.rewrite(&content, &path.display().to_string(), &mut report);
                report.record_file(changed);

                if changed && !dry_run {
                    fs::write(path, fixed)
                        .into_diagnostic()
                        .wrap_err_with(|| format!("failed to write {}", path.display()))?;
                }
            }

            if !args.quiet {
                let verb = if dry_run { "would change" } else { "changed" };
                println!(
                    "{} file(s) scanned, {} {}; {} reference(s), {} change(s), {} unresolved",
                    report.files_scanned(),
                    verb,
                    report.files_changed(),
                    report.references_seen(),
                    report.changes().len(),
                    report.unresolved().len()
                );
                for item in report.unresolved() {
                    println!(
                        "  unresolved {}:{}: '{}' not in {}",
                        item.file, item.line, item.column, item.table
                    );
                }
            }

            // Fix exits cleanly unless the dry run found pending work
            Ok(dry_run && report.has_findings())
        }

        Command::Check {
            files,
            schema_args,
            config: config_path,
            threshold,
            format,
        } => {
            let config = load_config(config_path)?.merge_with_args(
                &schema_args.schema,
                &schema_args.schema_json,
                &files,
                threshold,
            );
            let catalog = build_catalog(&config)?;
            let documents = collect_documents(&config)?;

            let rewriter = DocumentRewriter::new(
                &catalog,
                config.threshold.unwrap_or(DEFAULT_FUZZY_THRESHOLD),
                config.effective_remaps(),
            );

            let mut report = RunReport::new();
            for path in &documents {
                let content = fs::read_to_string(path)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("failed to read {}", path.display()))?;
                let (_, changed) =
                    rewriter.rewrite(&content, &path.display().to_string(), &mut report);
                report.record_file(changed);
            }

            ReportPrinter::new(format).print(&report);
            Ok(report.has_findings())
        }

        Command::Schema { schema_args, out } => {
            let config = Config::default().merge_with_args(
                &schema_args.schema,
                &schema_args.schema_json,
                &[],
                None,
            );
            let catalog = build_catalog(&config)?;
            let summary = output::render_schema_summary(&catalog);

            match out {
                Some(path) => fs::write(&path, summary)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("failed to write {}", path.display()))?,
                None => print!("{}", summary),
            }

            Ok(false)
        }
    }
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    match config_path {
        Some(path) => Config::from_file(&path),
        None => Ok(Config::find_and_load()?.unwrap_or_default()),
    }
}

/// Build the schema catalog from every configured source. An empty or
/// missing schema aborts before any document is touched.
fn build_catalog(config: &Config) -> Result<Catalog> {
    if config.schema.is_empty() && config.schema_json.is_none() {
        miette::bail!(
            "No schema specified. Use --schema, --schema-json, or configure in sqlmend.toml"
        );
    }

    let mut builder = SchemaBuilder::new();
    let mut source_names: Vec<String> = Vec::new();

    for schema_file in &config.schema {
        let content = fs::read_to_string(schema_file)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read schema {}", schema_file))?;
        builder.parse_ddl(&content);
        source_names.push(schema_file.clone());
    }

    if let Some(json_file) = &config.schema_json {
        let content = fs::read_to_string(json_file)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read schema {}", json_file))?;
        let records: Vec<ColumnRecord> = serde_json::from_str(&content)
            .into_diagnostic()
            .wrap_err_with(|| format!("invalid schema JSON in {}", json_file))?;
        builder.load_records(&records);
        source_names.push(json_file.clone());
    }

    let catalog = builder.build(&source_names.join(", ")).into_diagnostic()?;
    tracing::info!(tables = catalog.len(), "schema catalog ready");
    Ok(catalog)
}

/// Expand document patterns, passing glob patterns through the glob crate
/// and plain paths straight through.
fn collect_documents(config: &Config) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();

    for pattern in &config.files {
        if pattern.contains('*') {
            for path in glob::glob(pattern).into_diagnostic()?.flatten() {
                documents.push(path);
            }
        } else {
            documents.push(PathBuf::from(pattern));
        }
    }

    if documents.is_empty() {
        miette::bail!("No document files specified. Pass paths or configure in sqlmend.toml");
    }

    Ok(documents)
}
