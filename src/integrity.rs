//! Integrity ledger and the budgeted verification sweep.
//!
//! Per file: `Unverified/Stale -> verify -> {OK, Damaged}`, going stale again once
//! `now - checked >= interval`. A checksum mismatch is ledger state, never an error;
//! an unreadable file aborts the sweep.

use chrono::{DateTime, FixedOffset, TimeDelta};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::LedgerEntry;
use crate::engine::hashing::hash_file;
use crate::engine::progress::{finish_progress_bar, optional_bar, update_progress_bar};
use crate::engine::tools::{format_timestamp, parse_timestamp};
use crate::error::{Error, Result};
use crate::index::IndexEngine;
use crate::project::ProjectLayout;
use crate::utils::{Colors, read_json, write_json_atomic};

/// `ledger.json` in memory, keyed by ID. Tracks whether anything changed since load.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    entries: BTreeMap<String, LedgerEntry>,
    changed: bool,
}

impl Ledger {
    /// Empty ledger bound to `path`; nothing is written until [`Ledger::save`].
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
            changed: false,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound(format!("ledger {}", path.display())));
        }
        let list: Vec<LedgerEntry> = read_json(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            entries: list.into_iter().map(|e| (e.id.clone(), e)).collect(),
            changed: false,
        })
    }

    /// Write the whole ledger (sorted by ID) atomically.
    pub fn save(&mut self) -> Result<()> {
        let list: Vec<&LedgerEntry> = self.entries.values().collect();
        write_json_atomic(&list, &self.path)?;
        info!("Update => {}", self.path.display());
        self.changed = false;
        Ok(())
    }

    /// Save only when an entry changed. Returns whether a write happened.
    pub fn save_if_changed(&mut self) -> Result<bool> {
        if !self.changed {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&LedgerEntry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.values()
    }

    /// Entry for a freshly added file whose hash was just computed.
    pub fn insert_new(&mut self, id: &str, checked: &str) {
        self.set(id, checked, false);
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let removed = self.entries.remove(id).is_some();
        self.changed |= removed;
        removed
    }

    /// Mark `id` unverified so the next sweep checks it.
    pub fn reset(&mut self, id: &str) {
        self.entries
            .insert(id.to_string(), LedgerEntry::unverified(id));
        self.changed = true;
    }

    /// Store the outcome of one verification.
    pub fn set(&mut self, id: &str, checked: &str, damaged: bool) {
        self.entries.insert(
            id.to_string(),
            LedgerEntry {
                id: id.to_string(),
                checked: checked.to_string(),
                damaged,
            },
        );
        self.changed = true;
    }

    pub fn damaged_ids(&self) -> Vec<String> {
        self.entries
            .values()
            .filter(|e| e.damaged)
            .map(|e| e.id.clone())
            .collect()
    }
}

/// True when `entry.checked` is older than `interval_days` before `now`.
/// An unparseable timestamp is treated as never checked.
pub fn needs_check(entry: &LedgerEntry, interval_days: u32, now: &DateTime<FixedOffset>) -> bool {
    let Some(checked) = parse_timestamp(&entry.checked) else {
        return true;
    };
    checked < *now - TimeDelta::days(i64::from(interval_days))
}

#[derive(Clone, Copy, Debug)]
pub struct SweepOptions {
    pub interval_days: u32,
    /// Stop once more than this many bytes were hashed. At least one file is always checked.
    pub budget_bytes: u64,
    pub show_progress: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    /// On-disk length of every hashed file.
    pub bytes: u64,
    /// IDs found damaged in this pass.
    pub damaged: Vec<String>,
}

/// One bounded verification pass over the stale entries of `ledger`.
///
/// Saves the ledger if any entry changed. Any hashing error aborts the pass without saving.
pub fn sweep(
    ledger: &mut Ledger,
    index: &IndexEngine,
    layout: &ProjectLayout,
    opts: &SweepOptions,
    now: &DateTime<FixedOffset>,
) -> Result<SweepReport> {
    let due: Vec<String> = ledger
        .entries()
        .filter(|e| needs_check(e, opts.interval_days, now))
        .map(|e| e.id.clone())
        .collect();
    debug!("{} of {} ledger entries due", due.len(), ledger.len());

    let stamp = format_timestamp(now);
    let mut report = SweepReport::default();
    let mut bar = optional_bar(opts.show_progress, due.len(), "Checking");

    for id in due {
        if report.checked > 0 && report.bytes > opts.budget_bytes {
            break;
        }
        let record = index.get(&id)?;
        let (hash, size) = hash_file(&layout.file_path(&record.filename))?;
        let damaged = hash != record.checksum;
        if damaged {
            warn!(
                "{}",
                Colors::colorize(
                    Colors::DAMAGED,
                    &format!("Damaged: {} ({})", record.filename, id)
                )
            );
            report.damaged.push(id.clone());
        }
        ledger.set(&id, &stamp, damaged);
        report.checked += 1;
        report.bytes += size;
        update_progress_bar(&mut bar, 1);
    }
    finish_progress_bar(bar);

    ledger.save_if_changed()?;
    Ok(report)
}

/// Fresh ledger at `path` with every indexed ID unverified.
/// Refuses to overwrite an existing ledger file.
pub fn renew(path: &Path, index: &IndexEngine) -> Result<Ledger> {
    if path.exists() {
        return Err(Error::AlreadyExists(format!(
            "{} (delete it first to discard the check history)",
            path.display()
        )));
    }
    let mut ledger = Ledger::empty(path);
    for id in index.all_ids()? {
        ledger.reset(&id);
    }
    ledger.save()?;
    Ok(ledger)
}

/// Damaged entries as `(id, filename)` pairs.
pub fn damaged_report(ledger: &Ledger, index: &IndexEngine) -> Result<Vec<(String, String)>> {
    let ids = ledger.damaged_ids();
    let names = index.ids_to_names(&ids)?;
    Ok(ids.into_iter().zip(names).collect())
}
