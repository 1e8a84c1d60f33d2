use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_day, print_day_header};
use crate::error::{DashError, Result};
use crate::fmt::{amount, amount_or_dash, count, pct};
use crate::models::{DateKey, FileCategory};
use crate::reports::{self, DiscrepancyReport, MismatchSlice, Policy};
use crate::settings::load_settings;

/// Rows shown per section in the terminal report.
const TOP: usize = 10;

fn print_slice(title: &str, slice: &MismatchSlice) {
    println!();
    println!("{} {}", title.bold(), count(slice.count));
    if slice.count == 0 {
        return;
    }
    let mut table = Table::new();
    table.set_header(slice.sample.columns.clone());
    for row in slice.sample.rows.iter().take(TOP) {
        table.add_row(row.iter().map(|c| Cell::new(c.as_deref().unwrap_or(""))));
    }
    println!("{table}");
}

fn print_report(report: &DiscrepancyReport, policy: &Policy) {
    println!();
    println!("Records: {}", count(report.total_records));
    if let Some(rate) = report.match_rate {
        let rate_text = pct(rate);
        println!("Match rate: {}", if rate >= policy.match_rate_floor { rate_text.green() } else { rate_text.red() });
    }

    if !report.summary.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Status", "Description", "Rows", "Share", "Total", "Average"]);
        for s in &report.summary {
            table.add_row(vec![
                Cell::new(&s.status),
                Cell::new(&s.description),
                Cell::new(count(s.count)),
                Cell::new(pct(s.percentage)),
                Cell::new(amount_or_dash(s.total_amount)),
                Cell::new(amount_or_dash(s.average_amount)),
            ]);
        }
        println!();
        println!("{table}");
    }

    print_slice("PVI only:", &report.pvi_only);
    print_slice("GSM only:", &report.gsm_only);

    if !report.duplicate_orders.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["ORDER_ID", "Occurrences"]);
        for d in report.duplicate_orders.iter().take(TOP) {
            table.add_row(vec![Cell::new(&d.order_id), Cell::new(count(d.count))]);
        }
        println!();
        println!("{} {}", "Duplicated order IDs:".bold(), count(report.duplicate_orders.len()));
        println!("{table}");
    }

    if let Some((left, right)) = &report.divergence_columns {
        println!();
        println!(
            "{} {} ({left} vs {right})",
            "Large amount divergences:".bold(),
            count(report.large_divergence_count)
        );
        if !report.large_divergences.is_empty() {
            let mut table = Table::new();
            table.set_header(vec!["ORDER_ID", "MERCHANT", left.as_str(), right.as_str(), "Difference", "Share"]);
            for d in report.large_divergences.iter().take(TOP) {
                table.add_row(vec![
                    Cell::new(d.order_id.as_deref().unwrap_or("")),
                    Cell::new(d.merchant.as_deref().unwrap_or("")),
                    Cell::new(amount(d.left)),
                    Cell::new(amount(d.right)),
                    Cell::new(amount(d.difference)),
                    Cell::new(d.difference_pct.map_or_else(|| "-".to_string(), pct)),
                ]);
            }
            println!("{table}");
        }
    }

    if report.amount_mismatch_count > 0 {
        let mut table = Table::new();
        table.set_header(vec!["ORDER_ID", "MERCHANT", "GSM_AMOUNT", "PVI_AMOUNT", "Difference", "Share"]);
        for m in report.amount_mismatches.iter().take(TOP) {
            table.add_row(vec![
                Cell::new(m.order_id.as_deref().unwrap_or("")),
                Cell::new(m.merchant.as_deref().unwrap_or("")),
                Cell::new(amount(m.gsm_amount)),
                Cell::new(amount(m.pvi_amount)),
                Cell::new(amount(m.amount_diff)),
                Cell::new(m.diff_percentage.map_or_else(|| "-".to_string(), pct)),
            ]);
        }
        println!();
        println!("{} {}", "Amount mismatches:".bold(), count(report.amount_mismatch_count));
        println!("{table}");
    }

    let unusual: Vec<_> = report.unusual_merchants().take(TOP).collect();
    if !unusual.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Merchant", "Transactions", "Total", "Match rate", "Discrepancy rate"]);
        for m in unusual {
            table.add_row(vec![
                Cell::new(&m.merchant),
                Cell::new(count(m.transactions)),
                Cell::new(amount_or_dash(m.total_amount)),
                Cell::new(pct(m.match_rate)),
                Cell::new(pct(m.discrepancy_rate).red()),
            ]);
        }
        println!();
        println!("{}", "Unusual merchants".bold());
        println!("{table}");
    }

    if let Some(time) = &report.time {
        if let Some(peak) = &time.peak_hour {
            println!();
            println!(
                "Peak hour: {:02}:00 with {} transactions ({} matched)",
                peak.hour,
                count(peak.transactions),
                pct(peak.match_rate)
            );
        }
    }

    println!();
    println!("{}", "Recommendations".bold());
    for r in &report.recommendations {
        println!("  - {r}");
    }
}

fn print_exported(paths: &[PathBuf]) {
    for path in paths {
        println!("Wrote {}", path.display());
    }
}

pub fn run(
    data_dir_override: Option<&str>,
    date: &str,
    category: &str,
    json: bool,
    output: Option<&str>,
    export_dir: Option<&str>,
) -> Result<()> {
    let date = DateKey::parse(date)?;
    let category = FileCategory::from_key(category)?;
    let settings = load_settings();
    let session = open_day(data_dir_override, &date)?;
    let table = session
        .day()
        .and_then(|d| d.table(category))
        .ok_or_else(|| DashError::NoData(format!("no {} export for {date}", category.label())))?;

    let report = reports::build(table, &settings.policy);
    let exported = match export_dir {
        Some(dir) => reports::export_sections(table, &report, Path::new(dir))?,
        None => Vec::new(),
    };

    if json || output.is_some() {
        let text = serde_json::to_string_pretty(&report).map_err(|e| DashError::Other(e.to_string()))?;
        match output {
            Some(path) => {
                std::fs::write(path, format!("{text}\n"))?;
                println!("Report written to {path}");
            }
            None => println!("{text}"),
        }
        // Keep stdout pure JSON when the report goes there.
        if output.is_some() {
            print_exported(&exported);
        }
        return Ok(());
    }

    print_day_header(&session, category);
    print_report(&report, &settings.policy);
    print_exported(&exported);
    Ok(())
}
