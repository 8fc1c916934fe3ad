//! Pre-flight checks before a backup sync.

use log::warn;
use std::path::{Path, PathBuf};

use crate::ProjectInfo;
use crate::engine::tools::file_size_to_string;
use crate::error::{Error, Result};
use crate::index::IndexEngine;
use crate::integrity::Ledger;
use crate::project::ProjectContext;
use crate::utils::config::BACKUP_SPACE_MARGIN;

/// Free-space lookup for the volume holding a path.
pub trait SpaceProbe {
    fn available_space(&self, path: &Path) -> Result<u64>;
}

/// Asks the operating system through `sysinfo`.
pub struct SysinfoProbe;

impl SpaceProbe for SysinfoProbe {
    fn available_space(&self, path: &Path) -> Result<u64> {
        crate::disk_detect::available_space(path)
    }
}

/// Snapshot of one project for the pre-flight check and the status printout.
#[derive(Clone, Debug)]
pub struct ProjectStatus {
    pub root: PathBuf,
    pub info: ProjectInfo,
    pub files_count: usize,
    pub total_size: u64,
    pub damaged_count: usize,
}

impl ProjectStatus {
    /// A missing ledger counts as no damaged files.
    pub fn collect(ctx: &ProjectContext, index: &IndexEngine) -> Result<Self> {
        let (files_count, total_size) = index.total_size()?;
        let damaged_count = match Ledger::load(&ctx.layout.ledger_path()) {
            Ok(ledger) => ledger.damaged_ids().len(),
            Err(Error::NotFound(what)) => {
                warn!("{what} missing; run `check --renew` there");
                0
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            root: ctx.root().to_path_buf(),
            info: ctx.info.clone(),
            files_count,
            total_size,
            damaged_count,
        })
    }

    pub fn print(&self) {
        let role = if self.info.is_backup { "backup" } else { "source" };
        println!("{} ({role}): {}", self.info.project_name, self.root.display());
        println!(
            "  files: {}, total size: {}, damaged: {}",
            self.files_count,
            file_size_to_string(self.total_size, 2),
            self.damaged_count
        );
        if let Some(last) = self.info.last_backup_at.first().filter(|s| !s.is_empty()) {
            println!("  last backup: {last}");
        }
    }
}

/// Refuse to sync unless names match, the target is a backup, no file is damaged (ignored
/// in `fix` mode) and the backup volume can take the size difference plus a margin.
pub fn check_status(
    main: &ProjectStatus,
    backup: &ProjectStatus,
    fix: bool,
    probe: &dyn SpaceProbe,
) -> Result<()> {
    if main.info.project_name != backup.info.project_name {
        return Err(Error::Inconsistent(format!(
            "project names differ: {:?} ({}) vs {:?} ({})",
            main.info.project_name,
            main.root.display(),
            backup.info.project_name,
            backup.root.display()
        )));
    }
    if !backup.info.is_backup {
        return Err(Error::Inconsistent(format!(
            "{} is not marked as a backup project",
            backup.root.display()
        )));
    }
    let damaged = main.damaged_count + backup.damaged_count;
    if damaged > 0 && !fix {
        return Err(Error::Inconsistent(format!(
            "{damaged} damaged files across both projects; repair them with `backup --fix`"
        )));
    }

    let needed = main.total_size.saturating_sub(backup.total_size) + BACKUP_SPACE_MARGIN;
    let available = probe.available_space(&backup.root)?;
    if available < needed {
        return Err(Error::InsufficientSpace {
            path: backup.root.clone(),
            needed,
            available,
        });
    }
    Ok(())
}
