use std::path::Path;

use colored::Colorize;

use crate::aggregate::{drill_stats, MatchKind};
use crate::cli::{open_day, print_day_header, print_rows};
use crate::error::{DashError, Result};
use crate::fmt::{amount, count};
use crate::models::{DateKey, FileCategory};
use crate::session::Selector;
use crate::settings::load_settings;
use crate::table::export_csv;

/// Flags picking the drill-down rows; exactly one must be set.
pub struct SelectorArgs {
    pub value: Option<String>,
    pub null: bool,
    pub contains: Option<String>,
    pub starts_with: Option<String>,
    pub regex: Option<String>,
}

impl SelectorArgs {
    fn into_selector(self) -> Result<Selector> {
        let mut picked = Vec::new();
        if let Some(v) = self.value {
            picked.push(Selector::Equals(Some(v)));
        }
        if self.null {
            picked.push(Selector::Equals(None));
        }
        if let Some(p) = self.contains {
            picked.push(Selector::Matching { pattern: p, kind: MatchKind::Contains });
        }
        if let Some(p) = self.starts_with {
            picked.push(Selector::Matching { pattern: p, kind: MatchKind::StartsWith });
        }
        if let Some(p) = self.regex {
            picked.push(Selector::Matching { pattern: p, kind: MatchKind::Regex });
        }
        match picked.len() {
            1 => Ok(picked.remove(0)),
            _ => Err(DashError::Other(
                "Choose exactly one of --value, --null, --contains, --starts-with, --regex".to_string(),
            )),
        }
    }
}

fn describe(selector: &Selector) -> String {
    match selector {
        Selector::Equals(Some(v)) => format!("= {v}"),
        Selector::Equals(None) => "is empty".to_string(),
        Selector::Matching { pattern, kind: MatchKind::Contains } => format!("contains {pattern:?}"),
        Selector::Matching { pattern, kind: MatchKind::StartsWith } => format!("starts with {pattern:?}"),
        Selector::Matching { pattern, kind: MatchKind::Regex } => format!("matches /{pattern}/"),
    }
}

pub fn run(
    data_dir_override: Option<&str>,
    date: &str,
    category: &str,
    column: &str,
    selector: SelectorArgs,
    output: Option<&str>,
) -> Result<()> {
    let date = DateKey::parse(date)?;
    let category = FileCategory::from_key(category)?;
    let selector = selector.into_selector()?;
    let settings = load_settings();

    let mut session = open_day(data_dir_override, &date)?;
    print_day_header(&session, category);
    let drill = session.drill_down(category, column, selector)?;

    println!();
    println!(
        "{} {} {}",
        drill.category.label().dimmed(),
        drill.column.bold(),
        describe(&drill.selector)
    );
    let stats = drill_stats(&drill.rows);
    println!("Rows:           {}", count(stats.rows));
    if let Some(n) = stats.unique_orders {
        println!("Unique orders:  {}", count(n));
    }
    if let Some(n) = stats.unique_merchants {
        println!("Merchants:      {}", count(n));
    }
    if let Some(total) = stats.total_amount {
        println!("Total amount:   {}", amount(total));
    }
    if let Some(n) = stats.service_types {
        println!("Service types:  {}", count(n));
    }

    if drill.rows.is_empty() {
        println!("No matching rows.");
    } else {
        println!();
        print_rows(&drill.rows, settings.policy.sample_limit);
    }

    // An empty selection still writes the header row.
    if let Some(path) = output {
        export_csv(&drill.rows, Path::new(path))?;
        println!("Exported {} rows to {path}", count(drill.rows.row_count()));
    }
    Ok(())
}
