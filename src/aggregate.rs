use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde::Serialize;

use crate::error::Result;
use crate::labels::{service_label, BusinessFlag};
use crate::table::{parse_number, ColumnKind, Table};

// ---------------------------------------------------------------------------
// Known columns
// ---------------------------------------------------------------------------

pub const ORDER_ID: &str = "ORDER_ID";
pub const MERCHANT: &str = "MERCHANT";
pub const AMOUNT: &str = "AMOUNT";
pub const RECONCILE_STATUS: &str = "RECONCILE_STATUS";
pub const INSURANCE_STATUS: &str = "INSURANCE_STATUS";
pub const IS_BUSINESS_ORDER: &str = "IS_BUSINESS_ORDER";
pub const SERVICE_TYPE: &str = "SERVICE_TYPE";
pub const ORDER_TIME: &str = "ORDER_TIME";

/// Amount columns broken down per service type, in display order.
pub const AMOUNT_COLUMNS: &[&str] = &["AMOUNT", "GSM_AMOUNT", "MERCHANT_AMOUNT", "RECONCILED_AMOUNT"];

/// Header spellings seen for the GSM amount in driver-incident exports.
pub const GSM_AMOUNT_ALIASES: &[&str] = &[
    "GSM Amount",
    "GSM_AMOUNT",
    "GSM_AMO",
    "GSM_AMOUNT_MERCHANT",
    "GSM_AMO_MERCHANT",
    "GSM_AMOUNT_MERCH",
    "GSM_AMO_MERCH",
];

/// Header spellings seen for the reconcile status in driver-incident exports.
pub const RECONCILE_STATUS_ALIASES: &[&str] = &[
    "Reconcile Status",
    "RECONCILE STATUS",
    "RECONCILE_STATUS",
    "RECONCILE",
    "GSM_ORDER_RECONCILE",
    "GSM_ORDE_RECONCILE",
    "RECONCILE_STAT",
];

/// Columns shown first when listing rows.
pub const PRIORITY_COLUMNS: &[&str] = &[
    "ORDER_ID",
    "MERCHANT",
    "AMOUNT",
    "SERVICE_TYPE",
    "RECONCILE_STATUS",
    "INSURANCE_STATUS",
    "IS_BUSINESS_ORDER",
    "ORDER_TIME",
    "CREATED_TIME",
];

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    /// Group value; `None` is the null group.
    pub key: Option<String>,
    pub rows: usize,
    /// Rows contributing a numeric amount. Equals `rows` for plain counts.
    pub count: usize,
    /// Rows whose amount was null or not numeric.
    pub missing_amounts: usize,
    pub total_amount: f64,
    pub average_amount: Option<f64>,
    /// Share of all table rows.
    pub percentage: f64,
}

impl GroupStats {
    pub fn label(&self) -> &str {
        self.key.as_deref().unwrap_or("(null)")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregation {
    /// Largest group first.
    pub groups: Vec<GroupStats>,
    pub total_rows: usize,
}

impl Aggregation {
    pub fn get(&self, key: Option<&str>) -> Option<&GroupStats> {
        self.groups.iter().find(|g| g.key.as_deref() == key)
    }

    pub fn rows_for(&self, key: &str) -> usize {
        self.get(Some(key)).map_or(0, |g| g.rows)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Default)]
struct Acc {
    rows: usize,
    count: usize,
    total: f64,
}

fn aggregate<F>(table: &Table, group_column: &str, amount_column: Option<&str>, key_fn: F) -> Aggregation
where
    F: Fn(Option<&str>) -> Option<String>,
{
    let Some(group) = table.column(group_column) else {
        return Aggregation::default();
    };
    let amounts = match amount_column {
        Some(name) => match table.column(name) {
            Some(col) => Some(col),
            None => return Aggregation::default(),
        },
        None => None,
    };
    if table.is_empty() {
        return Aggregation::default();
    }

    let mut accs: HashMap<Option<String>, Acc> = HashMap::new();
    for (row, raw) in group.iter().enumerate() {
        let acc = accs.entry(key_fn(raw)).or_default();
        acc.rows += 1;
        match amounts {
            Some(col) => {
                if let Some(v) = col.number(row) {
                    acc.count += 1;
                    acc.total += v;
                }
            }
            None => acc.count += 1,
        }
    }

    let total_rows = table.row_count();
    let mut groups: Vec<GroupStats> = accs
        .into_iter()
        .map(|(key, acc)| GroupStats {
            key,
            rows: acc.rows,
            count: acc.count,
            missing_amounts: acc.rows - acc.count,
            total_amount: acc.total,
            average_amount: match amounts {
                Some(_) if acc.count > 0 => Some(acc.total / acc.count as f64),
                _ => None,
            },
            percentage: acc.rows as f64 / total_rows as f64 * 100.0,
        })
        .collect();
    groups.sort_by(|a, b| b.rows.cmp(&a.rows).then_with(|| a.key.cmp(&b.key)));

    Aggregation { groups, total_rows }
}

/// Row count and share per distinct value of `column` (null is its own group).
pub fn group_count(table: &Table, column: &str) -> Aggregation {
    aggregate(table, column, None, |v| v.map(str::to_string))
}

/// Like [`group_count`], grouping by `key_fn` of the raw value.
pub fn group_count_by<F>(table: &Table, column: &str, key_fn: F) -> Aggregation
where
    F: Fn(Option<&str>) -> Option<String>,
{
    aggregate(table, column, None, key_fn)
}

/// Sum, contributing count and mean of `amount_column` per group. Null or
/// non-numeric amounts are left out of the sum and the mean.
pub fn group_amount(table: &Table, group_column: &str, amount_column: &str) -> Aggregation {
    aggregate(table, group_column, Some(amount_column), |v| v.map(str::to_string))
}

pub fn group_amount_by<F>(table: &Table, group_column: &str, amount_column: &str, key_fn: F) -> Aggregation
where
    F: Fn(Option<&str>) -> Option<String>,
{
    aggregate(table, group_column, Some(amount_column), key_fn)
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Rows whose `column` equals `value` (`None` selects nulls), in source order.
pub fn filter_equals(table: &Table, column: &str, value: Option<&str>) -> Table {
    let Some(col) = table.column(column) else {
        return table.select_rows(&[]);
    };
    let numeric_target = value
        .and_then(parse_number)
        .filter(|_| col.kind == ColumnKind::Number);
    let rows: Vec<usize> = (0..table.row_count())
        .filter(|&r| match (col.get(r), value) {
            (None, None) => true,
            (Some(cell), Some(v)) => {
                cell == v || (numeric_target.is_some() && col.number(r) == numeric_target)
            }
            _ => false,
        })
        .collect();
    table.select_rows(&rows)
}

/// Rows whose `column` is one of `values` (exact, case-sensitive match).
pub fn filter_in(table: &Table, column: &str, values: &[String]) -> Table {
    let Some(col) = table.column(column) else {
        return table.select_rows(&[]);
    };
    let wanted: HashSet<&str> = values.iter().map(|v| v.trim()).collect();
    let rows: Vec<usize> = col
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.is_some_and(|c| wanted.contains(c)))
        .map(|(r, _)| r)
        .collect();
    table.select_rows(&rows)
}

/// Split free text into IDs: one per line, trimmed, blanks dropped, first
/// occurrence kept.
pub fn parse_id_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Contains,
    StartsWith,
    Regex,
}

/// Rows whose `column` matches `pattern`. Contains/starts-with ignore case.
pub fn filter_matching(table: &Table, column: &str, pattern: &str, kind: MatchKind) -> Result<Table> {
    let re = match kind {
        MatchKind::Regex => Some(Regex::new(pattern)?),
        _ => None,
    };
    let Some(col) = table.column(column) else {
        return Ok(table.select_rows(&[]));
    };
    let pat_upper = pattern.to_uppercase();
    let matches = |cell: &str| match kind {
        MatchKind::Contains => cell.to_uppercase().contains(&pat_upper),
        MatchKind::StartsWith => cell.to_uppercase().starts_with(&pat_upper),
        MatchKind::Regex => re.as_ref().is_some_and(|re| re.is_match(cell)),
    };
    let rows: Vec<usize> = col
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.is_some_and(|c| matches(c)))
        .map(|(r, _)| r)
        .collect();
    Ok(table.select_rows(&rows))
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Counts per normalized service-type label.
pub fn service_type_counts(table: &Table) -> Aggregation {
    group_count_by(table, SERVICE_TYPE, |v| Some(service_label(v)))
}

/// Amount totals per normalized service type, for each amount column present.
pub fn amount_by_service_type(table: &Table) -> Vec<(String, Aggregation)> {
    AMOUNT_COLUMNS
        .iter()
        .filter(|c| table.has_column(c))
        .map(|c| {
            let agg = group_amount_by(table, SERVICE_TYPE, c, |v| Some(service_label(v)));
            (c.to_string(), agg)
        })
        .filter(|(_, agg)| !agg.is_empty())
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct BusinessBreakdown {
    pub groups: Aggregation,
    pub business_orders: usize,
    pub business_rate: f64,
}

pub fn business_breakdown(table: &Table) -> Option<BusinessBreakdown> {
    if !table.has_column(IS_BUSINESS_ORDER) {
        return None;
    }
    let groups = group_count_by(table, IS_BUSINESS_ORDER, |v| Some(BusinessFlag::from_raw(v).label()));
    let business_orders = groups.rows_for(&BusinessFlag::Business.label());
    let business_rate = if groups.total_rows > 0 {
        business_orders as f64 / groups.total_rows as f64 * 100.0
    } else {
        0.0
    };
    Some(BusinessBreakdown {
        groups,
        business_orders,
        business_rate,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_records: usize,
    pub unique_orders: Option<usize>,
    pub unique_merchants: Option<usize>,
    pub first_order_time: Option<String>,
    pub last_order_time: Option<String>,
}

pub fn summary(table: &Table) -> SummaryStats {
    let times = table.column(ORDER_TIME);
    SummaryStats {
        total_records: table.row_count(),
        unique_orders: table.column(ORDER_ID).map(|c| c.n_unique()),
        unique_merchants: table.column(MERCHANT).map(|c| c.n_unique()),
        first_order_time: times.and_then(|c| c.iter().flatten().min()).map(str::to_string),
        last_order_time: times.and_then(|c| c.iter().flatten().max()).map(str::to_string),
    }
}

/// Quick figures shown above a drill-down listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrillStats {
    pub rows: usize,
    pub unique_orders: Option<usize>,
    pub unique_merchants: Option<usize>,
    pub total_amount: Option<f64>,
    pub service_types: Option<usize>,
}

pub fn drill_stats(table: &Table) -> DrillStats {
    DrillStats {
        rows: table.row_count(),
        unique_orders: table.column(ORDER_ID).map(|c| c.n_unique()),
        unique_merchants: table.column(MERCHANT).map(|c| c.n_unique()),
        total_amount: table
            .column(AMOUNT)
            .map(|c| (0..c.len()).filter_map(|r| c.number(r)).sum()),
        service_types: table.column(SERVICE_TYPE).map(|c| c.n_unique()),
    }
}

// ---------------------------------------------------------------------------
// Driver-incident vehicles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Vehicle {
    Bike,
    Car,
    Other,
}

impl Vehicle {
    /// Driver-incident premiums: 100 is a bike, 200 a car.
    pub fn from_amount(amount: Option<f64>) -> Self {
        match amount {
            Some(v) if v == 100.0 => Self::Bike,
            Some(v) if v == 200.0 => Self::Car,
            _ => Self::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Bike => "Bike",
            Self::Car => "Car",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehicleCount {
    pub count: usize,
    pub percentage: f64,
    pub total_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleBreakdown {
    /// The amount column the classification was read from.
    pub column: String,
    pub bike: VehicleCount,
    pub car: VehicleCount,
    pub other: VehicleCount,
}

pub fn vehicle_breakdown(table: &Table) -> Option<VehicleBreakdown> {
    let name = table.find_column(GSM_AMOUNT_ALIASES)?;
    let col = table.column(name)?;
    let mut bike = VehicleCount::default();
    let mut car = VehicleCount::default();
    let mut other = VehicleCount::default();
    for row in 0..col.len() {
        let amount = col.number(row);
        let slot = match Vehicle::from_amount(amount) {
            Vehicle::Bike => &mut bike,
            Vehicle::Car => &mut car,
            Vehicle::Other => &mut other,
        };
        slot.count += 1;
        slot.total_amount += amount.unwrap_or(0.0);
    }
    let total = table.row_count();
    for slot in [&mut bike, &mut car, &mut other] {
        slot.percentage = if total > 0 {
            slot.count as f64 / total as f64 * 100.0
        } else {
            0.0
        };
    }
    Some(VehicleBreakdown {
        column: name.to_string(),
        bike,
        car,
        other,
    })
}
