use std::path::Path;

use colored::Colorize;

use crate::aggregate::{filter_in, parse_id_list, ORDER_ID};
use crate::cli::{open_day, print_day_header, print_rows};
use crate::error::{DashError, Result};
use crate::fmt::count;
use crate::models::{DateKey, FileCategory};
use crate::settings::load_settings;
use crate::table::export_csv;

pub fn run(
    data_dir_override: Option<&str>,
    date: &str,
    category: &str,
    ids: &[String],
    file: Option<&str>,
    output: Option<&str>,
) -> Result<()> {
    let date = DateKey::parse(date)?;
    let category = FileCategory::from_key(category)?;

    let mut text = ids.join("\n");
    if let Some(path) = file {
        text.push('\n');
        text.push_str(&std::fs::read_to_string(path)?);
    }
    let wanted = parse_id_list(&text);
    if wanted.is_empty() {
        return Err(DashError::Other("Enter at least one order ID (--id or --file)".to_string()));
    }

    let settings = load_settings();
    let session = open_day(data_dir_override, &date)?;
    let table = session
        .day()
        .and_then(|d| d.table(category))
        .ok_or_else(|| DashError::NoData(format!("no {} export for {date}", category.label())))?;
    if !table.has_column(ORDER_ID) {
        return Err(DashError::NoData(format!("{ORDER_ID} column not found")));
    }
    print_day_header(&session, category);

    let found = filter_in(table, ORDER_ID, &wanted);
    println!();
    println!(
        "Found {} rows for {} requested IDs",
        count(found.row_count()).bold(),
        count(wanted.len())
    );
    if let Some(ids) = found.column(ORDER_ID) {
        let missing: Vec<&str> = wanted
            .iter()
            .map(String::as_str)
            .filter(|w| !ids.iter().any(|id| id == Some(*w)))
            .collect();
        if !missing.is_empty() {
            println!("{}", format!("Not found: {}", missing.join(", ")).yellow());
        }
    }
    if !found.is_empty() {
        println!();
        print_rows(&found, settings.preview_rows.max(1));
    }
    if let Some(path) = output {
        export_csv(&found, Path::new(path))?;
        println!("Exported {} rows to {path}", count(found.row_count()));
    }
    Ok(())
}
