pub mod completions;
pub mod days;
pub mod drill;
pub mod init;
pub mod lookup;
pub mod report;
pub mod resolve;
pub mod show;
pub mod status;

use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{Cell, Table as TextTable};

use crate::aggregate::{Aggregation, PRIORITY_COLUMNS};
use crate::error::{DashError, Result};
use crate::fmt::{amount_or_dash, count, pct};
use crate::models::{DateKey, FileCategory};
use crate::session::Session;
use crate::settings::data_dir;
use crate::table::Table;

#[derive(Parser)]
#[command(
    name = "recon-dash",
    version,
    about = "Daily GSM/PVI reconciliation analytics over CSV exports."
)]
pub struct Cli {
    /// Export root holding YYYY/MM/DD folders (overrides settings)
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save settings, pointing recon-dash at an export root.
    Init,
    /// Show settings, report thresholds and the years/months on disk.
    Status,
    /// List the days of a month that have exports.
    Days {
        /// Year (default: current year)
        #[arg(long)]
        year: Option<i32>,
        /// Month 1-12 (default: current month)
        #[arg(long)]
        month: Option<u32>,
    },
    /// Explain which file is picked for a date.
    Resolve {
        /// Date: YYYY-MM-DD or YYYYMMDD
        date: String,
        /// Export category: reconciled or taixe (default: both)
        #[arg(long)]
        category: Option<String>,
    },
    /// Overview breakdowns for a day.
    Show {
        /// Date: YYYY-MM-DD or YYYYMMDD
        date: String,
        /// Export category: reconciled or taixe
        #[arg(long, default_value = "reconciled")]
        category: String,
    },
    /// List the rows of one group of a column.
    Drill {
        /// Date: YYYY-MM-DD or YYYYMMDD
        date: String,
        /// Column to drill into (e.g. RECONCILE_STATUS)
        #[arg(long)]
        column: String,
        /// Rows equal to this value
        #[arg(long)]
        value: Option<String>,
        /// Rows where the column is empty
        #[arg(long)]
        null: bool,
        /// Rows containing this text (case-insensitive)
        #[arg(long)]
        contains: Option<String>,
        /// Rows starting with this text (case-insensitive)
        #[arg(long = "starts-with")]
        starts_with: Option<String>,
        /// Rows matching this regular expression
        #[arg(long)]
        regex: Option<String>,
        /// Export category: reconciled or taixe
        #[arg(long, default_value = "reconciled")]
        category: String,
        /// Write the matching rows to this CSV file
        #[arg(long)]
        output: Option<String>,
    },
    /// Look up orders by ID.
    Lookup {
        /// Date: YYYY-MM-DD or YYYYMMDD
        date: String,
        /// Order ID (repeatable)
        #[arg(long = "id")]
        ids: Vec<String>,
        /// File with one order ID per line
        #[arg(long)]
        file: Option<String>,
        /// Export category: reconciled or taixe
        #[arg(long, default_value = "reconciled")]
        category: String,
        /// Write the found rows to this CSV file
        #[arg(long)]
        output: Option<String>,
    },
    /// Discrepancy report with recommendations.
    Report {
        /// Date: YYYY-MM-DD or YYYYMMDD
        date: String,
        /// Export category: reconciled or taixe
        #[arg(long, default_value = "reconciled")]
        category: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Write the JSON report to this file
        #[arg(long)]
        output: Option<String>,
        /// Write each report section as a CSV file into this folder
        #[arg(long = "export-dir")]
        export_dir: Option<String>,
    },
    /// Print shell completions.
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Scan the date's month and load the date's exports.
pub(crate) fn open_day(data_dir_override: Option<&str>, date: &DateKey) -> Result<Session> {
    let mut session = Session::new(data_dir(data_dir_override));
    let catalog = session.refresh(date.year, date.month)?;
    if !catalog.contains(date.day) {
        let days: Vec<String> = catalog.sorted().iter().map(|e| format!("{:02}", e.date.day)).collect();
        let hint = if days.is_empty() {
            "no days with exports this month".to_string()
        } else {
            format!("available: {}", days.join(", "))
        };
        return Err(DashError::NoData(format!("no exports for {date} ({hint})")));
    }
    session.select_day(date.day)?;
    Ok(session)
}

pub(crate) fn print_day_header(session: &Session, category: FileCategory) {
    let Some(day) = session.day() else {
        return;
    };
    println!("{} {}", category.label().bold(), day.date);
    if let Some(file) = day.file(category) {
        let revised = if file.file.is_revised { " (revised)".yellow().to_string() } else { String::new() };
        println!("File: {}{revised}", file.file.file_name());
        if file.skipped_rows > 0 {
            println!("{}", format!("Skipped {} malformed rows", file.skipped_rows).yellow());
        }
    }
    for w in &day.warnings {
        println!("{}", format!("Warning: {w}").yellow());
    }
}

/// Rows of `table` as a text table, priority columns first.
pub(crate) fn rows_table(table: &Table, limit: usize) -> TextTable {
    let names = table.ordered_columns(PRIORITY_COLUMNS);
    let mut out = TextTable::new();
    out.set_header(names.clone());
    for row in 0..table.row_count().min(limit) {
        out.add_row(
            names
                .iter()
                .map(|n| Cell::new(table.column(n).and_then(|c| c.get(row)).unwrap_or(""))),
        );
    }
    out
}

pub(crate) fn print_rows(table: &Table, limit: usize) {
    println!("{}", rows_table(table, limit));
    if table.row_count() > limit {
        println!("... {} more rows", count(table.row_count() - limit));
    }
}

/// Grouped counts, with amount columns when the aggregation carries amounts.
pub(crate) fn aggregation_table(heading: &str, agg: &Aggregation, with_amounts: bool) -> TextTable {
    let mut out = TextTable::new();
    if with_amounts {
        out.set_header(vec![heading, "Rows", "Share", "Total", "Average", "Missing"]);
    } else {
        out.set_header(vec![heading, "Rows", "Share"]);
    }
    for g in &agg.groups {
        let mut row = vec![Cell::new(g.label()), Cell::new(count(g.rows)), Cell::new(pct(g.percentage))];
        if with_amounts {
            row.push(Cell::new(amount_or_dash(Some(g.total_amount))));
            row.push(Cell::new(amount_or_dash(g.average_amount)));
            row.push(Cell::new(count(g.missing_amounts)));
        }
        out.add_row(row);
    }
    out
}
