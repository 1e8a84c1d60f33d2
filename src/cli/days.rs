use chrono::Datelike;
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::catalog::scan;
use crate::error::{DashError, Result};
use crate::fmt::format_bytes;
use crate::models::{FileCategory, ResolvedFile};
use crate::settings::data_dir;

fn file_cell(file: Option<&ResolvedFile>) -> Cell {
    match file {
        Some(f) if f.is_revised => Cell::new(format!("{} (revised)", format_bytes(f.size_bytes)).yellow()),
        Some(f) => Cell::new(format_bytes(f.size_bytes)),
        None => Cell::new("-"),
    }
}

pub fn run(data_dir_override: Option<&str>, year: Option<i32>, month: Option<u32>) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    let year = year.unwrap_or(today.year());
    let month = month.unwrap_or(today.month());
    if !(1..=12).contains(&month) {
        return Err(DashError::InvalidDate(format!("month {month}")));
    }

    let root = data_dir(data_dir_override);
    let catalog = scan(&root, year, month)?;
    if catalog.is_empty() {
        println!("No exports for {month:02}/{year} under {}", root.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "Day",
        FileCategory::Reconciled.label(),
        FileCategory::DriverIncident.label(),
    ]);
    for entry in catalog.sorted() {
        table.add_row(vec![
            Cell::new(entry.date.to_string()),
            file_cell(entry.reconciled.as_ref()),
            file_cell(entry.driver_incident.as_ref()),
        ]);
    }
    println!("{}", format!("Exports for {month:02}/{year}").bold());
    println!("{table}");
    let revised = catalog.sorted().iter().filter(|e| e.has_revised()).count();
    println!("{} days, {revised} with a revised export", catalog.len());
    Ok(())
}
