use colored::*;
use tabled::settings::{object::Columns, Alignment, Modify, Style};
use tabled::{Table, Tabled};

use crate::application::drift::DriftReport;
use crate::application::generate::MigrationOutput;
use crate::presentation::WriteOutcome;

#[derive(Tabled)]
struct FileRow {
    file: String,
    status: String,
}

#[derive(Tabled)]
struct DriftRow {
    table: String,
    state: String,
}

pub fn print_generation(outcome: &WriteOutcome) {
    println!();
    println!("{}", "SCHEMLY GENERATION".bold().cyan());
    println!();

    if outcome.written.is_empty() && outcome.skipped.is_empty() {
        println!("{}", "Nothing to generate.".italic());
        return;
    }

    let rows: Vec<FileRow> = outcome
        .written
        .iter()
        .map(|f| FileRow {
            file: f.clone(),
            status: "written".green().to_string(),
        })
        .chain(outcome.skipped.iter().map(|f| FileRow {
            file: f.clone(),
            status: "skipped (exists)".yellow().to_string(),
        }))
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..=1)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    println!(
        "\n{} written, {} skipped",
        outcome.written.len().to_string().green(),
        outcome.skipped.len().to_string().yellow()
    );
}

pub fn print_cycles(output: &MigrationOutput) {
    for cycle in &output.cycles {
        println!(
            "{} {}",
            "Circular dependency:".yellow().bold(),
            cycle.join(" -> ")
        );
        println!("  in-cycle foreign keys were deferred to FK-only migrations");
    }
}

pub fn print_drift(report: &DriftReport) {
    println!();
    println!("{}", "SCHEMLY DRIFT REPORT".bold().cyan());
    println!("Report: {}", report.report_id.bright_yellow());
    println!("Driver: {}", report.driver.blue());
    println!();

    if report.is_in_sync() {
        println!("{}", "Schema and migrations are in sync.".green());
        return;
    }

    let rows: Vec<DriftRow> = report
        .drift
        .new
        .iter()
        .map(|t| DriftRow {
            table: t.clone(),
            state: "new (no migration)".green().to_string(),
        })
        .chain(report.drift.modified.iter().map(|t| DriftRow {
            table: t.clone(),
            state: "modified".yellow().to_string(),
        }))
        .chain(report.drift.removed.iter().map(|t| DriftRow {
            table: t.clone(),
            state: "removed from schema".red().to_string(),
        }))
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..=1)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
