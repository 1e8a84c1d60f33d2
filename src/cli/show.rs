use colored::Colorize;
use comfy_table::{Cell, Table as TextTable};

use crate::aggregate::{
    amount_by_service_type, business_breakdown, group_count, group_count_by, service_type_counts, summary,
    vehicle_breakdown, Vehicle, VehicleCount, INSURANCE_STATUS, RECONCILE_STATUS,
};
use crate::cli::{aggregation_table, open_day, print_day_header, print_rows};
use crate::error::{DashError, Result};
use crate::fmt::{amount, count, pct};
use crate::labels::{InsuranceStatus, ReconcileStatus};
use crate::models::{DateKey, FileCategory};
use crate::reports::status_column;
use crate::settings::load_settings;
use crate::table::Table;

fn print_summary(table: &Table) {
    let s = summary(table);
    println!("Records:        {}", count(s.total_records));
    if let Some(n) = s.unique_orders {
        println!("Unique orders:  {}", count(n));
    }
    if let Some(n) = s.unique_merchants {
        println!("Merchants:      {}", count(n));
    }
    if let (Some(first), Some(last)) = (&s.first_order_time, &s.last_order_time) {
        println!("Order times:    {first} .. {last}");
    }
}

fn print_described(heading: &str, table: &Table, column: &str, describe: fn(&str) -> String) {
    let agg = group_count_by(table, column, |v| Some(v.map_or_else(|| "(null)".to_string(), describe)));
    if agg.is_empty() {
        return;
    }
    println!();
    println!("{}", aggregation_table(heading, &agg, false));
}

fn vehicle_row(label: &str, v: &VehicleCount) -> Vec<Cell> {
    vec![
        Cell::new(label),
        Cell::new(count(v.count)),
        Cell::new(pct(v.percentage)),
        Cell::new(amount(v.total_amount)),
    ]
}

fn print_reconciled(table: &Table) {
    print_described("Reconcile status", table, RECONCILE_STATUS, |raw| {
        format!("{} ({raw})", ReconcileStatus::from_raw(raw).description())
    });
    print_described("Insurance status", table, INSURANCE_STATUS, |raw| {
        InsuranceStatus::from_raw(raw).description().into_owned()
    });

    if let Some(b) = business_breakdown(table) {
        println!();
        println!("{}", aggregation_table("Business orders", &b.groups, false));
        println!("Business rate: {}", pct(b.business_rate));
    }

    let services = service_type_counts(table);
    if !services.is_empty() {
        println!();
        println!("{}", aggregation_table("Service type", &services, false));
    }
    for (column, agg) in amount_by_service_type(table) {
        println!();
        println!("{}", column.bold());
        println!("{}", aggregation_table("Service type", &agg, true));
    }
}

fn print_driver_incident(table: &Table) {
    if let Some(v) = vehicle_breakdown(table) {
        let mut out = TextTable::new();
        out.set_header(vec!["Vehicle", "Rows", "Share", "Total"]);
        out.add_row(vehicle_row(Vehicle::Bike.label(), &v.bike));
        out.add_row(vehicle_row(Vehicle::Car.label(), &v.car));
        out.add_row(vehicle_row(Vehicle::Other.label(), &v.other));
        println!();
        println!("Vehicles by {}", v.column.bold());
        println!("{out}");
    }
    if let Some(column) = status_column(table) {
        let agg = group_count(table, column);
        println!();
        println!("{}", aggregation_table(column, &agg, false));
    }
    let services = service_type_counts(table);
    if !services.is_empty() {
        println!();
        println!("{}", aggregation_table("Service type", &services, false));
    }
}

pub fn run(data_dir_override: Option<&str>, date: &str, category: &str) -> Result<()> {
    let date = DateKey::parse(date)?;
    let category = FileCategory::from_key(category)?;
    let settings = load_settings();
    let session = open_day(data_dir_override, &date)?;
    let table = session
        .day()
        .and_then(|d| d.table(category))
        .ok_or_else(|| DashError::NoData(format!("no {} export for {date}", category.label())))?;

    print_day_header(&session, category);
    println!();
    print_summary(table);
    match category {
        FileCategory::Reconciled => print_reconciled(table),
        FileCategory::DriverIncident => print_driver_incident(table),
    }

    if settings.preview_rows > 0 && !table.is_empty() {
        println!();
        println!("{}", "Preview".bold());
        print_rows(table, settings.preview_rows);
    }
    Ok(())
}
