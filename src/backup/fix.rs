//! Cross-repair of damaged files between a project and its backup.

use log::{info, warn};

use crate::backup::diff::ChangedFile;
use crate::engine::hashing::hash_file;
use crate::engine::tools::now_string;
use crate::error::Result;
use crate::index::IndexEngine;
use crate::integrity::Ledger;
use crate::project::ProjectLayout;
use crate::utils::copy_file_atomic;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FixReport {
    pub fixed: Vec<ChangedFile>,
    pub unfixed: Vec<ChangedFile>,
}

/// Repair damaged files of `target` from `source`.
///
/// A copy happens only when the source's live hash equals the checksum recorded in the
/// target. A missing counterpart leaves the entry damaged. `target_ledger` is saved only
/// if an entry changed.
pub fn auto_fix_one_way(
    target: &ProjectLayout,
    target_index: &IndexEngine,
    target_ledger: &mut Ledger,
    source: &ProjectLayout,
) -> Result<FixReport> {
    let mut report = FixReport::default();
    for id in target_ledger.damaged_ids() {
        let record = target_index.get(&id)?;
        let entry = ChangedFile::from(&record);
        let src = source.file_path(&record.filename);
        if !src.is_file() {
            warn!("Cannot fix {}: missing in {}", record.filename, source.root().display());
            report.unfixed.push(entry);
            continue;
        }
        let (hash, _) = hash_file(&src)?;
        if hash != record.checksum {
            warn!("Cannot fix {}: both copies differ from its checksum", record.filename);
            report.unfixed.push(entry);
            continue;
        }
        copy_file_atomic(&src, &target.file_path(&record.filename))?;
        target_ledger.set(&id, &now_string(), false);
        info!("Fixed {}", record.filename);
        report.fixed.push(entry);
    }
    target_ledger.save_if_changed()?;
    Ok(report)
}

/// One side of an [`auto_fix`] pass.
pub struct FixSide<'a> {
    pub layout: &'a ProjectLayout,
    pub index: &'a IndexEngine,
    pub ledger: &'a mut Ledger,
}

/// Repair main from backup, then backup from main. Returns `(main report, backup report)`.
pub fn auto_fix(main: FixSide<'_>, backup: FixSide<'_>) -> Result<(FixReport, FixReport)> {
    let main_report = auto_fix_one_way(main.layout, main.index, main.ledger, backup.layout)?;
    let backup_report = auto_fix_one_way(backup.layout, backup.index, backup.ledger, main.layout)?;
    Ok((main_report, backup_report))
}
