//! Classify every file of a source project against its backup.

use std::collections::HashMap;

use crate::FileRecord;
use crate::error::Result;
use crate::index::IndexEngine;
use crate::utils::Colors;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangedFile {
    pub id: String,
    pub filename: String,
}

impl From<&FileRecord> for ChangedFile {
    fn from(f: &FileRecord) -> Self {
        Self {
            id: f.id.clone(),
            filename: f.filename.clone(),
        }
    }
}

/// Planned changes to bring a backup in line with its source. Each list is sorted by filename.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangedFiles {
    /// In the backup only.
    pub deleted: Vec<ChangedFile>,
    /// Same content, newer metadata.
    pub updated: Vec<ChangedFile>,
    /// Content differs.
    pub overwritten: Vec<ChangedFile>,
    /// In the source only.
    pub added: Vec<ChangedFile>,
}

impl ChangedFiles {
    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty()
            && self.updated.is_empty()
            && self.overwritten.is_empty()
            && self.added.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deleted.len() + self.updated.len() + self.overwritten.len() + self.added.len()
    }

    /// Print the plan to stdout, one colored line per file.
    pub fn print_summary(&self) {
        if self.is_empty() {
            println!("Backup is up to date.");
            return;
        }
        let groups = [
            ("Deleted", Colors::DELETED, &self.deleted),
            ("Updated", Colors::UPDATED, &self.updated),
            ("Overwritten", Colors::OVERWRITTEN, &self.overwritten),
            ("Added", Colors::ADDED, &self.added),
        ];
        for (label, color, files) in groups {
            for f in files {
                println!("{}: {}", Colors::colorize(color, label), f.filename);
            }
        }
        println!(
            "{} | {} | {} | {}",
            Colors::colorize(Colors::DELETED, &format!("Deleted: {}", self.deleted.len())),
            Colors::colorize(Colors::UPDATED, &format!("Updated: {}", self.updated.len())),
            Colors::colorize(
                Colors::OVERWRITTEN,
                &format!("Overwritten: {}", self.overwritten.len())
            ),
            Colors::colorize(Colors::ADDED, &format!("Added: {}", self.added.len())),
        );
    }
}

/// One scan of the backup against the source by ID, then one scan of the source against
/// the backup. Side-effect free.
pub fn changed_files(main: &IndexEngine, backup: &IndexEngine) -> Result<ChangedFiles> {
    let main_files: HashMap<String, FileRecord> = main
        .all_files()?
        .into_iter()
        .map(|f| (f.id.clone(), f))
        .collect();
    let bk_files = backup.all_files()?;

    let mut changes = ChangedFiles::default();
    for bk in &bk_files {
        match main_files.get(&bk.id) {
            None => changes.deleted.push(bk.into()),
            Some(m) if m.checksum != bk.checksum => changes.overwritten.push(m.into()),
            Some(m) if m.utime != bk.utime => changes.updated.push(m.into()),
            Some(_) => {}
        }
    }

    let bk_ids: std::collections::HashSet<&str> = bk_files.iter().map(|f| f.id.as_str()).collect();
    for m in main_files.values() {
        if !bk_ids.contains(m.id.as_str()) {
            changes.added.push(m.into());
        }
    }

    for list in [
        &mut changes.deleted,
        &mut changes.updated,
        &mut changes.overwritten,
        &mut changes.added,
    ] {
        list.sort_by(|a, b| a.filename.cmp(&b.filename));
    }
    Ok(changes)
}
