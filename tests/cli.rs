use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const RECONCILED: &str = "ORDER_ID,MERCHANT,TOTAL_AMOUNT,SERVICE_TYPE,RECONCILE_STATUS,IS_BUSINESS_ORDER,ORDER_TIME\n\
1,Shop A,100,normal,match,true,2025-07-01 08:00:00\n\
2,Shop A,200,express,match,false,2025-07-01 08:30:00\n\
3,Shop B,50,normal,not_found_in_m,true,2025-07-01 09:00:00\n";

fn put(root: &Path, day: &str, name: &str, body: &str) {
    let dir = root.join("2025").join("07").join(day);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), body).unwrap();
}

/// Export tree: day 01 has both variants, day 02 only the base file, day 03 nothing usable.
fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("data");
    put(&root, "01", "pvi_transaction_reconciled_20250701.csv", "ORDER_ID,RECONCILE_STATUS\n99,match\n");
    put(&root, "01", "pvi_transaction_reconciled_20250701_2.csv", RECONCILED);
    put(&root, "02", "pvi_transaction_reconciled_20250702.csv", RECONCILED);
    put(
        &root,
        "02",
        "pvi_transaction_reconciled_taixe_20250702.csv",
        "ORDER_ID,GSM Amount,Reconcile Status\n1,100,match\n2,200,match\n3,100,not_found_in_m\n",
    );
    put(&root, "03", "notes.txt", "nothing here");
    dir
}

fn cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("recon-dash").unwrap();
    cmd.env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .arg("--data-dir")
        .arg(home.path().join("data"));
    cmd
}

#[test]
fn test_days_lists_usable_days() {
    let home = fixture();
    cmd(&home)
        .args(["days", "--year", "2025", "--month", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("01/07/2025"))
        .stdout(predicate::str::contains("02/07/2025"))
        .stdout(predicate::str::contains("03/07/2025").not())
        .stdout(predicate::str::contains("(revised)"))
        .stdout(predicate::str::contains("2 days"));
}

#[test]
fn test_days_for_empty_month() {
    let home = fixture();
    cmd(&home)
        .args(["days", "--year", "2024", "--month", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No exports for 02/2024"));
}

#[test]
fn test_resolve_prefers_revised_file() {
    let home = fixture();
    cmd(&home)
        .args(["resolve", "2025-07-01", "--category", "reconciled"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pvi_transaction_reconciled_20250701_2.csv  picked"))
        .stdout(predicate::str::contains("pvi_transaction_reconciled_20250701.csv  present"));
}

#[test]
fn test_show_reconciled_day() {
    let home = fixture();
    cmd(&home)
        .args(["show", "20250701"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pvi_transaction_reconciled_20250701_2.csv"))
        .stdout(predicate::str::contains("Matched (GSM + PVI)"))
        .stdout(predicate::str::contains("Ride (Normal)"))
        .stdout(predicate::str::contains("Business Orders"));
}

#[test]
fn test_show_driver_incident_day() {
    let home = fixture();
    cmd(&home)
        .args(["show", "2025-07-02", "--category", "taixe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vehicles by GSM Amount"))
        .stdout(predicate::str::contains("Bike"));
}

#[test]
fn test_show_missing_day_fails() {
    let home = fixture();
    cmd(&home)
        .args(["show", "2025-07-03"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("available: 01, 02"));
}

#[test]
fn test_invalid_date_fails() {
    let home = fixture();
    cmd(&home)
        .args(["show", "2025-02-30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date"));
}

#[test]
fn test_drill_exports_rows() {
    let home = fixture();
    let out = home.path().join("exports").join("matched.csv");
    cmd(&home)
        .args(["drill", "2025-07-01", "--column", "RECONCILE_STATUS", "--value", "match", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rows:           2"));
    let written = fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("ORDER_ID,MERCHANT,TOTAL_AMOUNT"));
    assert_eq!(written.lines().count(), 3);
}

#[test]
fn test_drill_needs_one_selector() {
    let home = fixture();
    cmd(&home)
        .args(["drill", "2025-07-01", "--column", "RECONCILE_STATUS"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Choose exactly one"));
}

#[test]
fn test_drill_contains() {
    let home = fixture();
    cmd(&home)
        .args(["drill", "2025-07-01", "--column", "RECONCILE_STATUS", "--contains", "NOT_FOUND"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rows:           1"));
}

#[test]
fn test_drill_with_no_match_still_writes_header() {
    let home = fixture();
    let out = home.path().join("empty.csv");
    cmd(&home)
        .args(["drill", "2025-07-01", "--column", "RECONCILE_STATUS", "--value", "nope", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("No matching rows."))
        .stdout(predicate::str::contains("Exported 0 rows"));
    let written = fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("ORDER_ID,MERCHANT,TOTAL_AMOUNT"));
    assert_eq!(written.lines().count(), 1);
}

#[test]
fn test_lookup_reports_missing_ids() {
    let home = fixture();
    cmd(&home)
        .args(["lookup", "2025-07-01", "--id", "1", "--id", "404"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 rows for 2 requested IDs"))
        .stdout(predicate::str::contains("Not found: 404"));
}

#[test]
fn test_lookup_reads_id_file() {
    let home = fixture();
    let ids = home.path().join("ids.txt");
    fs::write(&ids, "  2\n\n3\n2\n").unwrap();
    cmd(&home)
        .args(["lookup", "2025-07-02", "--file"])
        .arg(&ids)
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 rows for 2 requested IDs"));
}

#[test]
fn test_lookup_with_no_hits_still_writes_header() {
    let home = fixture();
    let out = home.path().join("found.csv");
    cmd(&home)
        .args(["lookup", "2025-07-01", "--id", "9", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 0 rows for 1 requested IDs"))
        .stdout(predicate::str::contains("Not found: 9"))
        .stdout(predicate::str::contains("Exported 0 rows"));
    let written = fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("ORDER_ID,MERCHANT,TOTAL_AMOUNT"));
    assert_eq!(written.lines().count(), 1);
}

#[test]
fn test_preview_rows_caps_lookup_but_not_drill() {
    let home = fixture();
    let config = home.path().join(".config/recon-dash");
    fs::create_dir_all(&config).unwrap();
    fs::write(config.join("settings.json"), r#"{"preview_rows": 1}"#).unwrap();

    cmd(&home)
        .args(["lookup", "2025-07-01", "--id", "1", "--id", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("... 1 more rows"));
    cmd(&home)
        .args(["drill", "2025-07-01", "--column", "RECONCILE_STATUS", "--value", "match"])
        .assert()
        .success()
        .stdout(predicate::str::contains("more rows").not());
}

#[test]
fn test_lookup_without_ids_fails() {
    let home = fixture();
    cmd(&home)
        .args(["lookup", "2025-07-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least one order ID"));
}

#[test]
fn test_report_json() {
    let home = fixture();
    cmd(&home)
        .args(["report", "2025-07-01", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_records\": 3"))
        .stdout(predicate::str::contains("Low match rate (66.7%)"));
}

#[test]
fn test_report_terminal() {
    let home = fixture();
    cmd(&home)
        .args(["report", "2025-07-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PVI only: 1"))
        .stdout(predicate::str::contains("Recommendations"));
}

#[test]
fn test_report_amount_mismatches_and_section_export() {
    let home = fixture();
    put(
        &home.path().join("data"),
        "04",
        "pvi_transaction_reconciled_20250704.csv",
        "ORDER_ID,MERCHANT,RECONCILE_STATUS,GSM_AMOUNT,PVI_AMOUNT\n\
         1,Shop A,match,100,100\n\
         2,Shop A,match,100,90\n\
         3,Shop B,not_found_in_m,,40\n",
    );
    let out = home.path().join("sections");
    cmd(&home)
        .args(["report", "2025-07-04", "--export-dir"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Amount mismatches: 1"))
        .stdout(predicate::str::contains("amount_mismatch.csv"));

    let mismatches = fs::read_to_string(out.join("amount_mismatch.csv")).unwrap();
    assert_eq!(
        mismatches,
        "ORDER_ID,MERCHANT,GSM_AMOUNT,PVI_AMOUNT,amount_diff,diff_percentage\n2,Shop A,100,90,10,11.11\n"
    );
    assert_eq!(fs::read_to_string(out.join("pvi_only.csv")).unwrap().lines().count(), 2);
    assert_eq!(fs::read_to_string(out.join("gsm_only.csv")).unwrap().lines().count(), 1);
    assert!(out.join("summary.csv").exists());
}

#[test]
fn test_init_writes_settings() {
    let home = fixture();
    cmd(&home).arg("init").assert().success();
    let settings = fs::read_to_string(home.path().join(".config/recon-dash/settings.json")).unwrap();
    assert!(settings.contains("\"match_rate_floor\": 80.0"));
    assert!(settings.contains("data"));
}

#[test]
fn test_status_lists_years() {
    let home = fixture();
    cmd(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("2025: 07"));
}
