use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregate::{
    filter_matching, group_amount, group_count, MatchKind, MERCHANT, ORDER_ID, ORDER_TIME,
    RECONCILE_STATUS, RECONCILE_STATUS_ALIASES,
};
use crate::error::Result;
use crate::labels::ReconcileStatus;
use crate::table::{export_csv, Column, Table};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Thresholds behind the report's flags and recommendations, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Recommend a sync check when the match rate is below this.
    pub match_rate_floor: f64,
    /// One-sided (PVI-only / GSM-only) share that triggers a recommendation.
    pub one_sided_pct: f64,
    /// Two amounts diverge when they differ by more than this share of the smaller.
    pub divergence_pct: f64,
    /// Merchant discrepancy rate that triggers a configuration review.
    pub merchant_review_pct: f64,
    /// Merchant discrepancy rate that marks a merchant unusual.
    pub unusual_merchant_pct: f64,
    /// Rows kept in each sample listing and listed by a drill-down.
    pub sample_limit: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            match_rate_floor: 80.0,
            one_sided_pct: 5.0,
            divergence_pct: 10.0,
            merchant_review_pct: 15.0,
            unusual_merchant_pct: 20.0,
            sample_limit: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

const PVI_ONLY: &str = "not_found_in_m";
const GSM_ONLY: &str = "not_found_in_external";

/// Columns kept in discrepancy samples, when present.
const SAMPLE_COLUMNS: &[&str] = &["ORDER_ID", "MERCHANT", "TOTAL_AMOUNT", "AMOUNT", "ORDER_TIME", "RECONCILE_STATUS"];

/// Amount used for status and merchant totals: first present wins.
const TOTAL_AMOUNT_COLUMNS: &[&str] = &["TOTAL_AMOUNT", "AMOUNT"];

const GSM_AMOUNT: &str = "GSM_AMOUNT";
const PVI_AMOUNT: &str = "PVI_AMOUNT";

/// Amount column pairs compared for divergence: first present pair wins.
const DIVERGENCE_PAIRS: &[(&str, &str)] = &[(GSM_AMOUNT, PVI_AMOUNT), (GSM_AMOUNT, "MERCHANT_AMOUNT")];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusLine {
    pub status: String,
    pub description: String,
    pub count: usize,
    pub percentage: f64,
    pub total_amount: Option<f64>,
    pub average_amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowSample {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RowSample {
    fn from_table(table: &Table, limit: usize) -> Self {
        let columns: Vec<&str> = SAMPLE_COLUMNS.iter().copied().filter(|c| table.has_column(c)).collect();
        let rows = (0..table.row_count().min(limit))
            .map(|r| {
                columns
                    .iter()
                    .map(|c| table.column(c).and_then(|col| col.get(r)).map(str::to_string))
                    .collect()
            })
            .collect();
        Self {
            columns: columns.into_iter().map(str::to_string).collect(),
            rows,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MismatchSlice {
    pub count: usize,
    pub sample: RowSample,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateKey {
    pub order_id: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Divergence {
    pub row: usize,
    pub order_id: Option<String>,
    pub merchant: Option<String>,
    pub left: f64,
    pub right: f64,
    pub difference: f64,
    /// Difference as a share of the smaller amount; `None` when that is zero.
    pub difference_pct: Option<f64>,
}

/// A row where both sides carry an amount and the amounts differ.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountMismatch {
    pub row: usize,
    pub order_id: Option<String>,
    pub merchant: Option<String>,
    pub gsm_amount: f64,
    pub pvi_amount: f64,
    /// GSM minus PVI.
    pub amount_diff: f64,
    /// `amount_diff` as a share of the PVI amount; `None` when that is zero.
    pub diff_percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantPattern {
    pub merchant: String,
    pub transactions: usize,
    pub total_amount: Option<f64>,
    pub average_amount: Option<f64>,
    pub match_count: usize,
    pub discrepancy_count: usize,
    pub match_rate: f64,
    pub discrepancy_rate: f64,
    pub unusual: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourBucket {
    pub hour: u32,
    pub transactions: usize,
    pub match_count: usize,
    pub match_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeAnalysis {
    pub hourly: Vec<HourBucket>,
    pub peak_hour: Option<HourBucket>,
    /// Rows whose order time could not be read.
    pub unparsed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiscrepancyReport {
    pub total_records: usize,
    pub status_column: Option<String>,
    pub amount_column: Option<String>,
    pub summary: Vec<StatusLine>,
    pub match_rate: Option<f64>,
    pub pvi_only: MismatchSlice,
    pub gsm_only: MismatchSlice,
    pub duplicate_orders: Vec<DuplicateKey>,
    pub divergence_columns: Option<(String, String)>,
    pub large_divergence_count: usize,
    pub large_divergences: Vec<Divergence>,
    pub amount_mismatch_count: usize,
    pub amount_mismatches: Vec<AmountMismatch>,
    pub merchants: Vec<MerchantPattern>,
    pub time: Option<TimeAnalysis>,
    pub recommendations: Vec<String>,
}

impl DiscrepancyReport {
    pub fn unusual_merchants(&self) -> impl Iterator<Item = &MerchantPattern> {
        self.merchants.iter().filter(|m| m.unusual)
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Reconcile status column: the canonical name, else a known alias.
pub fn status_column(table: &Table) -> Option<&'static str> {
    if table.has_column(RECONCILE_STATUS) {
        return Some(RECONCILE_STATUS);
    }
    table.find_column(RECONCILE_STATUS_ALIASES)
}

fn amount_column(table: &Table) -> Option<&'static str> {
    table.find_column(TOTAL_AMOUNT_COLUMNS)
}

pub fn status_summary(table: &Table) -> Vec<StatusLine> {
    let Some(status) = status_column(table) else {
        return Vec::new();
    };
    let amount = amount_column(table);
    let counts = group_count(table, status);
    let amounts = amount.map(|a| group_amount(table, status, a));

    counts
        .groups
        .iter()
        .map(|g| {
            let money = amounts.as_ref().and_then(|a| a.get(g.key.as_deref()));
            StatusLine {
                status: g.label().to_string(),
                description: match &g.key {
                    Some(raw) => ReconcileStatus::from_raw(raw).description().into_owned(),
                    None => "(null)".to_string(),
                },
                count: g.rows,
                percentage: g.percentage,
                total_amount: money.map(|m| m.total_amount),
                average_amount: money.and_then(|m| m.average_amount),
            }
        })
        .collect()
}

fn mismatch_slice(table: &Table, status: Option<&str>, needle: &str, limit: usize) -> MismatchSlice {
    let Some(status) = status else {
        return MismatchSlice::default();
    };
    // A literal substring search cannot fail to compile.
    let rows = filter_matching(table, status, needle, MatchKind::Contains).unwrap_or_default();
    MismatchSlice {
        count: rows.row_count(),
        sample: RowSample::from_table(&rows, limit),
    }
}

/// `ORDER_ID` values occurring more than once, most repeated first.
pub fn duplicate_orders(table: &Table) -> Vec<DuplicateKey> {
    let agg = group_count(table, ORDER_ID);
    agg.groups
        .into_iter()
        .filter(|g| g.rows > 1)
        .filter_map(|g| {
            g.key.map(|order_id| DuplicateKey {
                order_id,
                count: g.rows,
            })
        })
        .collect()
}

/// Rows whose two amounts differ by more than `divergence_pct` of the smaller.
pub fn large_divergences(table: &Table, policy: &Policy) -> (Option<(String, String)>, Vec<Divergence>) {
    let Some((left_name, right_name)) = DIVERGENCE_PAIRS
        .iter()
        .find(|(l, r)| table.has_column(l) && table.has_column(r))
    else {
        return (None, Vec::new());
    };
    let (Some(left), Some(right)) = (table.column(left_name), table.column(right_name)) else {
        return (None, Vec::new());
    };
    let ids = table.column(ORDER_ID);
    let merchants = table.column(MERCHANT);
    let ratio = policy.divergence_pct / 100.0;

    let found = (0..table.row_count())
        .filter_map(|row| {
            let (l, r) = (left.number(row)?, right.number(row)?);
            let smaller = l.min(r).abs();
            let difference = (l - r).abs();
            if difference <= ratio * smaller {
                return None;
            }
            Some(Divergence {
                row,
                order_id: ids.and_then(|c| c.get(row)).map(str::to_string),
                merchant: merchants.and_then(|c| c.get(row)).map(str::to_string),
                left: l,
                right: r,
                difference,
                difference_pct: (smaller > 0.0).then(|| difference / smaller * 100.0),
            })
        })
        .collect();
    (Some((left_name.to_string(), right_name.to_string())), found)
}

/// Rows whose `GSM_AMOUNT` and `PVI_AMOUNT` are both numeric and differ.
pub fn amount_mismatches(table: &Table) -> Vec<AmountMismatch> {
    let (Some(gsm), Some(pvi)) = (table.column(GSM_AMOUNT), table.column(PVI_AMOUNT)) else {
        return Vec::new();
    };
    let ids = table.column(ORDER_ID);
    let merchants = table.column(MERCHANT);

    (0..table.row_count())
        .filter_map(|row| {
            let (g, p) = (gsm.number(row)?, pvi.number(row)?);
            if g == p {
                return None;
            }
            let amount_diff = g - p;
            Some(AmountMismatch {
                row,
                order_id: ids.and_then(|c| c.get(row)).map(str::to_string),
                merchant: merchants.and_then(|c| c.get(row)).map(str::to_string),
                gsm_amount: g,
                pvi_amount: p,
                amount_diff,
                diff_percentage: (p != 0.0).then(|| amount_diff / p * 100.0),
            })
        })
        .collect()
}

fn is_match(status: Option<&str>) -> bool {
    status == Some("match")
}

fn is_discrepancy(status: Option<&str>) -> bool {
    status.is_some_and(|s| s.contains("not_found"))
}

pub fn merchant_patterns(table: &Table, policy: &Policy) -> Vec<MerchantPattern> {
    let Some(merchants) = table.column(MERCHANT) else {
        return Vec::new();
    };
    let statuses = status_column(table).and_then(|s| table.column(s));
    let amounts = amount_column(table).and_then(|a| table.column(a));

    #[derive(Default)]
    struct Acc {
        transactions: usize,
        amount_rows: usize,
        total: f64,
        matched: usize,
        discrepant: usize,
    }

    let mut accs: HashMap<String, Acc> = HashMap::new();
    for row in 0..table.row_count() {
        let name = merchants.get(row).unwrap_or("(null)").to_string();
        let acc = accs.entry(name).or_default();
        acc.transactions += 1;
        if let Some(v) = amounts.and_then(|c| c.number(row)) {
            acc.amount_rows += 1;
            acc.total += v;
        }
        let status = statuses.and_then(|c| c.get(row));
        if is_match(status) {
            acc.matched += 1;
        }
        if is_discrepancy(status) {
            acc.discrepant += 1;
        }
    }

    let mut patterns: Vec<MerchantPattern> = accs
        .into_iter()
        .map(|(merchant, acc)| {
            let n = acc.transactions as f64;
            let discrepancy_rate = acc.discrepant as f64 / n * 100.0;
            MerchantPattern {
                merchant,
                transactions: acc.transactions,
                total_amount: amounts.map(|_| acc.total),
                average_amount: (acc.amount_rows > 0).then(|| acc.total / acc.amount_rows as f64),
                match_count: acc.matched,
                discrepancy_count: acc.discrepant,
                match_rate: acc.matched as f64 / n * 100.0,
                discrepancy_rate,
                unusual: discrepancy_rate > policy.unusual_merchant_pct,
            }
        })
        .collect();
    patterns.sort_by(|a, b| {
        b.transactions
            .cmp(&a.transactions)
            .then_with(|| a.merchant.cmp(&b.merchant))
    });
    patterns
}

fn parse_order_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Transactions and match rate per hour of `ORDER_TIME`.
pub fn hourly_patterns(table: &Table) -> Option<TimeAnalysis> {
    let times = table.column(ORDER_TIME)?;
    let statuses = status_column(table).and_then(|s| table.column(s));

    let mut buckets: HashMap<u32, (usize, usize)> = HashMap::new();
    let mut unparsed = 0usize;
    for row in 0..table.row_count() {
        let Some(ts) = times.get(row).and_then(parse_order_time) else {
            unparsed += 1;
            continue;
        };
        let bucket = buckets.entry(ts.hour()).or_default();
        bucket.0 += 1;
        if is_match(statuses.and_then(|c| c.get(row))) {
            bucket.1 += 1;
        }
    }

    let mut hourly: Vec<HourBucket> = buckets
        .into_iter()
        .map(|(hour, (transactions, match_count))| HourBucket {
            hour,
            transactions,
            match_count,
            match_rate: match_count as f64 / transactions as f64 * 100.0,
        })
        .collect();
    hourly.sort_by_key(|b| b.hour);
    // Earliest hour wins ties.
    let peak_hour = hourly
        .iter()
        .rev()
        .max_by_key(|b| b.transactions)
        .cloned();

    Some(TimeAnalysis {
        hourly,
        peak_hour,
        unparsed,
    })
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

pub fn recommendations(report: &DiscrepancyReport, policy: &Policy) -> Vec<String> {
    let mut out = Vec::new();
    if report.total_records == 0 {
        return out;
    }
    let total = report.total_records as f64;

    if let Some(rate) = report.match_rate {
        if rate < policy.match_rate_floor {
            out.push(format!(
                "Low match rate ({rate:.1}%). Check the GSM/PVI data synchronisation."
            ));
        }
        let one_sided = policy.one_sided_pct / 100.0 * total;
        if report.pvi_only.count as f64 > one_sided {
            out.push(format!(
                "{} transactions exist only in PVI. Check the GSM connection.",
                report.pvi_only.count
            ));
        }
        if report.gsm_only.count as f64 > one_sided {
            out.push(format!(
                "{} transactions exist only in GSM. Check the PVI API callback.",
                report.gsm_only.count
            ));
        }
    }

    let review = report
        .merchants
        .iter()
        .filter(|m| m.discrepancy_rate > policy.merchant_review_pct)
        .count();
    if review > 0 {
        out.push(format!(
            "{review} merchants have a high discrepancy rate. Review their configuration."
        ));
    }
    if !report.duplicate_orders.is_empty() {
        out.push(format!(
            "Found {} duplicated order IDs. Check idempotency.",
            report.duplicate_orders.len()
        ));
    }
    if report.large_divergence_count > 0 {
        out.push(format!(
            "{} transactions have a large amount divergence. Review pricing logic.",
            report.large_divergence_count
        ));
    }
    if out.is_empty() {
        out.push("Data looks stable. Keep monitoring on the usual schedule.".to_string());
    }
    out
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub fn build(table: &Table, policy: &Policy) -> DiscrepancyReport {
    let status = status_column(table);
    let summary = status_summary(table);
    let match_rate = status.filter(|_| !table.is_empty()).map(|_| {
        let matched = summary
            .iter()
            .find(|s| s.status == "match")
            .map_or(0, |s| s.count);
        matched as f64 / table.row_count() as f64 * 100.0
    });
    let (divergence_columns, mut divergences) = large_divergences(table, policy);
    let large_divergence_count = divergences.len();
    divergences.truncate(policy.sample_limit);
    let mut mismatches = amount_mismatches(table);
    let amount_mismatch_count = mismatches.len();
    mismatches.truncate(policy.sample_limit);

    let mut report = DiscrepancyReport {
        total_records: table.row_count(),
        status_column: status.map(str::to_string),
        amount_column: amount_column(table).map(str::to_string),
        summary,
        match_rate,
        pvi_only: mismatch_slice(table, status, PVI_ONLY, policy.sample_limit),
        gsm_only: mismatch_slice(table, status, GSM_ONLY, policy.sample_limit),
        duplicate_orders: duplicate_orders(table),
        divergence_columns,
        large_divergence_count,
        large_divergences: divergences,
        amount_mismatch_count,
        amount_mismatches: mismatches,
        merchants: merchant_patterns(table, policy),
        time: hourly_patterns(table),
        recommendations: Vec::new(),
    };
    report.recommendations = recommendations(&report, policy);
    report
}

// ---------------------------------------------------------------------------
// Section export
// ---------------------------------------------------------------------------

fn one_sided_rows(table: &Table, status: Option<&str>, needle: &str) -> Result<Table> {
    match status {
        Some(status) => filter_matching(table, status, needle, MatchKind::Contains),
        None => Ok(table.select_rows(&[])),
    }
}

fn number_cell(value: f64) -> Option<String> {
    Some(value.to_string())
}

fn rounded_cell(value: f64) -> Option<String> {
    Some(format!("{value:.2}"))
}

fn mismatch_table(found: &[AmountMismatch]) -> Table {
    Table::new(vec![
        Column::new(ORDER_ID, found.iter().map(|m| m.order_id.clone()).collect()),
        Column::new(MERCHANT, found.iter().map(|m| m.merchant.clone()).collect()),
        Column::new(GSM_AMOUNT, found.iter().map(|m| number_cell(m.gsm_amount)).collect()),
        Column::new(PVI_AMOUNT, found.iter().map(|m| number_cell(m.pvi_amount)).collect()),
        Column::new("amount_diff", found.iter().map(|m| number_cell(m.amount_diff)).collect()),
        Column::new("diff_percentage", found.iter().map(|m| m.diff_percentage.and_then(rounded_cell)).collect()),
    ])
}

fn summary_table(summary: &[StatusLine]) -> Table {
    Table::new(vec![
        Column::new("status", summary.iter().map(|s| Some(s.status.clone())).collect()),
        Column::new("description", summary.iter().map(|s| Some(s.description.clone())).collect()),
        Column::new("count", summary.iter().map(|s| Some(s.count.to_string())).collect()),
        Column::new("percentage", summary.iter().map(|s| rounded_cell(s.percentage)).collect()),
        Column::new("total_amount", summary.iter().map(|s| s.total_amount.and_then(number_cell)).collect()),
        Column::new("average_amount", summary.iter().map(|s| s.average_amount.and_then(rounded_cell)).collect()),
    ])
}

/// Write the report's sections as CSV files in `dir`: every PVI-only and
/// GSM-only row, every amount mismatch, and the status summary. Sections
/// with no rows still get a header.
pub fn export_sections(table: &Table, report: &DiscrepancyReport, dir: &Path) -> Result<Vec<PathBuf>> {
    let status = report.status_column.as_deref();
    let sections = [
        ("pvi_only.csv", one_sided_rows(table, status, PVI_ONLY)?),
        ("gsm_only.csv", one_sided_rows(table, status, GSM_ONLY)?),
        ("amount_mismatch.csv", mismatch_table(&amount_mismatches(table))),
        ("summary.csv", summary_table(&report.summary)),
    ];

    let mut written = Vec::with_capacity(sections.len());
    for (name, section) in sections {
        let path = dir.join(name);
        export_csv(&section, &path)?;
        info!(path = %path.display(), rows = section.row_count(), "exported report section");
        written.push(path);
    }
    Ok(written)
}
