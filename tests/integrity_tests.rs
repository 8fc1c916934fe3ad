mod common;

use chrono::TimeDelta;
use common::TestProject;
use std::fs;
use stowage::engine::tools::{EPOCH, format_timestamp, now};
use stowage::integrity::{SweepOptions, damaged_report, needs_check, renew, sweep};
use stowage::{Error, LedgerEntry};

const MIB: usize = 1 << 20;

fn entry(checked: &str) -> LedgerEntry {
    LedgerEntry {
        id: "A1".to_string(),
        checked: checked.to_string(),
        damaged: false,
    }
}

fn opts(budget_bytes: u64) -> SweepOptions {
    SweepOptions {
        interval_days: 30,
        budget_bytes,
        show_progress: false,
    }
}

/// Ten stale 1 MiB files.
fn ten_mib_project() -> TestProject {
    let mut p = TestProject::new("demo");
    let files: Vec<(String, Vec<u8>)> = (0..10)
        .map(|i| (format!("f{i}.bin"), vec![i as u8; MIB]))
        .collect();
    let refs: Vec<(&str, Vec<u8>)> = files.iter().map(|(n, c)| (n.as_str(), c.clone())).collect();
    let added = p.add_files(&refs);
    for f in &added {
        p.ledger.reset(&f.id);
    }
    p.ledger.save().unwrap();
    p
}

// --- needs_check ---

#[test]
fn test_needs_check_epoch_is_due() {
    assert!(needs_check(&entry(EPOCH), 30, &now()));
}

#[test]
fn test_needs_check_recent_is_not_due() {
    let t = now();
    assert!(!needs_check(&entry(&format_timestamp(&t)), 30, &t));
    let yesterday = t - TimeDelta::days(29);
    assert!(!needs_check(&entry(&format_timestamp(&yesterday)), 30, &t));
}

#[test]
fn test_needs_check_after_interval() {
    let t = now();
    let old = t - TimeDelta::days(31);
    assert!(needs_check(&entry(&format_timestamp(&old)), 30, &t));
}

#[test]
fn test_needs_check_garbage_timestamp_is_due() {
    assert!(needs_check(&entry("not a time"), 30, &now()));
}

// --- sweep ---

#[test]
fn test_sweep_stops_after_budget() {
    let mut p = ten_mib_project();
    let report = sweep(&mut p.ledger, &p.index, &p.ctx.layout, &opts(3 * MIB as u64), &now()).unwrap();

    assert!(report.checked >= 3);
    assert_eq!(report.checked, 4);
    assert_eq!(report.bytes, 4 * MIB as u64);
    assert!(report.damaged.is_empty());

    let t = now();
    let still_due = p
        .reload_ledger()
        .entries()
        .filter(|e| needs_check(e, 30, &t))
        .count();
    assert_eq!(still_due, 6);
}

#[test]
fn test_sweep_checks_one_file_with_zero_budget() {
    let mut p = ten_mib_project();
    let report = sweep(&mut p.ledger, &p.index, &p.ctx.layout, &opts(0), &now()).unwrap();
    assert_eq!(report.checked, 1);
    assert_eq!(report.bytes, MIB as u64);
}

#[test]
fn test_sweep_nothing_due() {
    let mut p = TestProject::new("demo");
    p.add_files(&[("a.txt", "alpha")]);
    let report = sweep(&mut p.ledger, &p.index, &p.ctx.layout, &opts(0), &now()).unwrap();
    assert_eq!(report.checked, 0);
    assert!(!p.ledger.is_changed());
}

#[test]
fn test_sweep_records_damage_without_error() {
    let mut p = TestProject::new("demo");
    let added = p.add_files(&[("a.txt", "alpha"), ("b.txt", "bravo")]);
    let id = added[0].id.clone();
    fs::write(p.ctx.layout.file_path("a.txt"), "tampered").unwrap();
    p.ledger.reset(&id);

    let report = sweep(&mut p.ledger, &p.index, &p.ctx.layout, &opts(1 << 30), &now()).unwrap();

    assert_eq!(report.checked, 1);
    assert_eq!(report.damaged, vec![id.clone()]);
    let saved = p.reload_ledger();
    assert!(saved.get(&id).unwrap().damaged);
    assert_eq!(
        damaged_report(&saved, &p.index).unwrap(),
        vec![(id, "a.txt".to_string())]
    );
}

#[test]
fn test_sweep_aborts_on_unreadable_file() {
    let mut p = TestProject::new("demo");
    let added = p.add_files(&[("a.txt", "alpha")]);
    p.ledger.reset(&added[0].id);
    p.ledger.save().unwrap();
    fs::remove_file(p.ctx.layout.file_path("a.txt")).unwrap();

    let err = sweep(&mut p.ledger, &p.index, &p.ctx.layout, &opts(0), &now()).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert_eq!(p.reload_ledger().get(&added[0].id).unwrap().checked, EPOCH);
}

// --- renew ---

#[test]
fn test_renew_refuses_existing_ledger() {
    let p = TestProject::new("demo");
    let err = renew(&p.ctx.layout.ledger_path(), &p.index).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
}

#[test]
fn test_renew_marks_everything_unverified() {
    let mut p = TestProject::new("demo");
    p.add_files(&[("a.txt", "alpha"), ("b.txt", "bravo")]);
    let path = p.ctx.layout.ledger_path();
    fs::remove_file(&path).unwrap();

    let ledger = renew(&path, &p.index).unwrap();

    assert_eq!(ledger.len(), 2);
    assert!(ledger.entries().all(|e| e.checked == EPOCH && !e.damaged));
    assert_eq!(p.reload_ledger().len(), 2);
}
