//! Project root layout and the explicit project context passed to every operation.

use log::info;
use std::path::{Path, PathBuf};

use crate::ProjectInfo;
use crate::error::{Error, Result};
use crate::utils::config::{PackagePaths, ProjectFiles, REPO_NAME};
use crate::utils::{read_json, write_json_atomic};

/// Paths inside one project root. No I/O.
#[derive(Clone, Debug)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn info_path(&self) -> PathBuf {
        self.root.join(ProjectFiles::PROJECT_INFO)
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join(ProjectFiles::DATABASE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(PackagePaths::get().lock_filename())
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(ProjectFiles::LEDGER)
    }

    pub fn files_dir(&self) -> PathBuf {
        self.root.join(ProjectFiles::FILES_DIR)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(ProjectFiles::METADATA_DIR)
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root.join(ProjectFiles::INPUT_DIR)
    }

    pub fn recyclebin_dir(&self) -> PathBuf {
        self.root.join(ProjectFiles::RECYCLEBIN_DIR)
    }

    /// Content file for `filename`.
    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.files_dir().join(filename)
    }

    /// Sidecar for `filename`: `metadata/<filename>.json`.
    pub fn meta_path(&self, filename: &str) -> PathBuf {
        self.metadata_dir()
            .join(format!("{filename}{}", ProjectFiles::SIDECAR_EXT))
    }

    /// Directories created by `init`.
    pub fn dirs(&self) -> [PathBuf; 4] {
        [
            self.files_dir(),
            self.metadata_dir(),
            self.input_dir(),
            self.recyclebin_dir(),
        ]
    }
}

/// A recognized project: its layout plus `project.json`, read once by the entry point.
#[derive(Clone, Debug)]
pub struct ProjectContext {
    pub layout: ProjectLayout,
    pub info: ProjectInfo,
}

impl ProjectContext {
    /// Load `project.json` under `root`; fails unless its `RepoName` marks a managed store.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let layout = ProjectLayout::new(root);
        let info_path = layout.info_path();
        if !info_path.is_file() {
            return Err(Error::NotFound(format!(
                "{} (not a project root)",
                info_path.display()
            )));
        }
        let mut info: ProjectInfo = read_json(&info_path)?;
        if info.repo_name != REPO_NAME {
            return Err(Error::Inconsistent(format!(
                "{}: RepoName {:?} != {:?}",
                info_path.display(),
                info.repo_name,
                REPO_NAME
            )));
        }
        info.normalize();
        Ok(Self { layout, info })
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn save_info(&self) -> Result<()> {
        let path = self.layout.info_path();
        info!("Update => {}", path.display());
        write_json_atomic(&self.info, &path)?;
        Ok(())
    }

    /// Mutations that only make sense on a primary project.
    pub fn ensure_not_backup(&self) -> Result<()> {
        if self.info.is_backup {
            return Err(Error::Inconsistent(format!(
                "{} is a backup project; change files in the source project",
                self.root().display()
            )));
        }
        Ok(())
    }

    /// Root of backup slot `n` (1-based). Relative entries resolve against this root.
    pub fn backup_root(&self, n: usize) -> Result<PathBuf> {
        if n == 0 {
            return Err(Error::Inconsistent(
                "slot 0 is the project itself; pick a backup slot >= 1".to_string(),
            ));
        }
        let entry = self.info.projects.get(n).ok_or_else(|| {
            Error::NotFound(format!(
                "backup slot {n} (project has {} backup roots)",
                self.info.projects.len().saturating_sub(1)
            ))
        })?;
        let p = Path::new(entry);
        Ok(if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root().join(p)
        })
    }
}
