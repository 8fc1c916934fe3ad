//! Apply a [`ChangedFiles`] plan to a backup root, then bring its index, ledger and
//! project info up to date.

use log::{debug, info};
use std::fs;

use crate::backup::diff::{ChangedFile, ChangedFiles};
use crate::engine::progress::{finish_progress_bar, optional_bar, update_progress_bar};
use crate::engine::tools::now_string;
use crate::error::{Error, PathContext, Result};
use crate::index::IndexEngine;
use crate::integrity::Ledger;
use crate::project::{ProjectContext, ProjectLayout};
use crate::utils::copy_file_atomic;

/// Run the phases in order: delete, update, overwrite, add. The first error aborts.
pub fn apply_changes(
    main: &ProjectLayout,
    backup: &ProjectLayout,
    changes: &ChangedFiles,
    show_progress: bool,
) -> Result<()> {
    let mut bar = optional_bar(show_progress, changes.len(), "Syncing");

    for f in &changes.deleted {
        remove_from_backup(backup, f)?;
        update_progress_bar(&mut bar, 1);
    }
    for f in &changes.updated {
        copy_metadata(main, backup, f)?;
        update_progress_bar(&mut bar, 1);
    }
    for f in changes.overwritten.iter().chain(&changes.added) {
        copy_metadata(main, backup, f)?;
        copy_content(main, backup, f)?;
        update_progress_bar(&mut bar, 1);
    }

    finish_progress_bar(bar);
    Ok(())
}

fn remove_from_backup(backup: &ProjectLayout, f: &ChangedFile) -> Result<()> {
    let meta = backup.meta_path(&f.filename);
    let content = backup.file_path(&f.filename);
    debug!("Delete => {}", content.display());
    fs::remove_file(&meta).at(&meta)?;
    fs::remove_file(&content).at(&content)?;
    Ok(())
}

fn copy_metadata(main: &ProjectLayout, backup: &ProjectLayout, f: &ChangedFile) -> Result<()> {
    let dst = backup.meta_path(&f.filename);
    debug!("Copy => {}", dst.display());
    copy_file_atomic(&main.meta_path(&f.filename), &dst)?;
    Ok(())
}

fn copy_content(main: &ProjectLayout, backup: &ProjectLayout, f: &ChangedFile) -> Result<()> {
    let dst = backup.file_path(&f.filename);
    debug!("Copy => {}", dst.display());
    copy_file_atomic(&main.file_path(&f.filename), &dst)?;
    Ok(())
}

/// Full sync of backup slot `slot` (1-based index into `main.info.projects`).
///
/// After the files are copied the backup index is rebuilt from its disk, its ledger drops
/// deleted IDs and marks copied content unverified, and `LastBackupAt` is stamped on both
/// sides. The backup receives the source's project info with `IsBackup` set. An empty plan
/// skips the file phases but still stamps both project infos.
pub fn sync_backup(
    main: &mut ProjectContext,
    backup: &mut ProjectContext,
    backup_index: &mut IndexEngine,
    slot: usize,
    changes: &ChangedFiles,
    show_progress: bool,
) -> Result<()> {
    if slot == 0 || slot >= main.info.projects.len() {
        return Err(Error::NotFound(format!("backup slot {slot}")));
    }
    if changes.is_empty() {
        debug!("No file changes for {}", backup.root().display());
    } else {
        apply_changes(&main.layout, &backup.layout, changes, show_progress)?;
        backup_index.rebuild_all(&backup.layout)?;
        update_backup_ledger(&backup.layout, changes)?;
    }

    let now = now_string();
    main.info.normalize();
    main.info.last_backup_at[0] = now.clone();
    main.info.last_backup_at[slot] = now;
    main.save_info()?;

    backup.info = main.info.clone();
    backup.info.is_backup = true;
    backup.save_info()?;

    info!(
        "Synced {} changes to {}",
        changes.len(),
        backup.root().display()
    );
    Ok(())
}

fn update_backup_ledger(backup: &ProjectLayout, changes: &ChangedFiles) -> Result<()> {
    let ledger_path = backup.ledger_path();
    let mut ledger = match Ledger::load(&ledger_path) {
        Ok(ledger) => ledger,
        Err(Error::NotFound(_)) => Ledger::empty(&ledger_path),
        Err(e) => return Err(e),
    };
    for f in &changes.deleted {
        ledger.remove(&f.id);
    }
    for f in changes.overwritten.iter().chain(&changes.added) {
        ledger.reset(&f.id);
    }
    ledger.save_if_changed()?;
    Ok(())
}
