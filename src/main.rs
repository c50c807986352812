use anyhow::Result;
use clap::{Parser, Subcommand};

use schemly::presentation::cli_summary::{print_cycles, print_drift, print_generation};
use schemly::{init_tracing, write_files, AppConfig, GeneratedFile, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "schemly",
    about = "Schemly — turn a live SQL schema into ordered migrations and model stubs."
)]
struct Cli {
    /// Path to an explicit config file (default: layered schemly.toml lookup)
    #[arg(short, long)]
    config: Option<String>,

    /// Connection name from the config (default: the configured one)
    #[arg(long)]
    connection: Option<String>,

    /// Overwrite files that already exist
    #[arg(long)]
    force: bool,

    /// Machine-readable JSON output instead of tables
    #[arg(long)]
    json: bool,

    /// Only errors
    #[arg(short, long)]
    quiet: bool,

    /// Catalog SQL and per-table detail
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Full generation: migrations and model stubs
    Schema,
    /// Creation scripts only
    Migrations {
        /// Comma-separated table subset
        #[arg(long, value_delimiter = ',')]
        tables: Option<Vec<String>>,
        /// Report drift instead of writing files
        #[arg(long)]
        diff: bool,
        /// Ignore the existing archive and emit everything
        #[arg(long)]
        fresh: bool,
        /// Print to stdout instead of writing files
        #[arg(long)]
        preview: bool,
        /// One FK-only migration per table instead of inline FKs
        #[arg(long = "separate-fk")]
        separate_fk: bool,
    },
    /// Model stubs only
    Models {
        /// Restrict to a table (repeatable)
        #[arg(long = "table")]
        table: Vec<String>,
        /// Print to stdout instead of writing files
        #[arg(long)]
        preview: bool,
        #[arg(long = "no-relationships")]
        no_relationships: bool,
        #[arg(long = "no-scopes")]
        no_scopes: bool,
    },
    /// Parse the schema and print the model
    Preview,
    /// Compare the live schema against the migration archive
    Diff,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(if cli.quiet {
        LogLevel::Error
    } else if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    });

    let mut cfg = AppConfig::load(cli.config.as_deref())?;
    let connection = cli.connection.as_deref();

    match cli.command {
        Command::Schema => {
            let (migrations, models) = schemly::generate(&cfg, connection).await?;
            let mut outcome = write_files(&migrations.files, &cfg.migrations_path, cli.force)?;
            let model_outcome = write_files(&models, &cfg.models.path, cli.force)?;
            outcome.written.extend(model_outcome.written);
            outcome.skipped.extend(model_outcome.skipped);

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_cycles(&migrations);
                print_generation(&outcome);
            }
        }

        Command::Migrations {
            tables,
            diff,
            fresh,
            preview,
            separate_fk,
        } => {
            if separate_fk {
                cfg.features.separate_foreign_keys = true;
            }
            if diff {
                let report = schemly::drift(&cfg, connection).await?;
                finish_drift(&report, cli.json)?;
                return Ok(());
            }

            let output =
                schemly::generate_migrations(&cfg, connection, tables.as_deref(), fresh).await?;
            if preview {
                preview_files(&output.files, cli.json)?;
                return Ok(());
            }

            let outcome = write_files(&output.files, &cfg.migrations_path, cli.force)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_cycles(&output);
                print_generation(&outcome);
            }
        }

        Command::Models {
            table,
            preview,
            no_relationships,
            no_scopes,
        } => {
            if no_relationships {
                cfg.models.generate_relationships = false;
            }
            if no_scopes {
                cfg.models.generate_scopes = false;
            }
            let only = (!table.is_empty()).then_some(table.as_slice());

            let files = schemly::generate_models(&cfg, connection, only).await?;
            if preview {
                preview_files(&files, cli.json)?;
                return Ok(());
            }

            let outcome = write_files(&files, &cfg.models.path, cli.force)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_generation(&outcome);
            }
        }

        Command::Preview => {
            let tables = schemly::preview_tables(&cfg, connection, None).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                for table in &tables {
                    println!("{} ({} columns)", table.name, table.columns.len());
                    for col in &table.columns {
                        println!("  {} {}", col.name, col.native_type);
                    }
                    for fk in &table.foreign_keys {
                        println!(
                            "  -> {} references {}({})",
                            fk.columns.join(","),
                            fk.referenced_table,
                            fk.referenced_columns.join(",")
                        );
                    }
                }
            }
        }

        Command::Diff => {
            let report = schemly::drift(&cfg, connection).await?;
            finish_drift(&report, cli.json)?;
        }
    }

    Ok(())
}

/// Print a drift report and exit non-zero when out of sync.
fn finish_drift(report: &schemly::DriftReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print_drift(report);
    }
    if !report.is_in_sync() {
        std::process::exit(1);
    }
    Ok(())
}

fn preview_files(files: &[GeneratedFile], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(files)?);
    } else {
        for file in files {
            println!("-- {}", file.filename);
            println!("{}", file.contents);
        }
    }
    Ok(())
}
