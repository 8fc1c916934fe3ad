//! Shared fixtures: real projects in temp directories, plus in-memory records.

#![allow(dead_code)]

use std::fs;
use std::time::Duration;

use stowage::{FileRecord, IndexEngine, Ledger, ProjectContext, store};
use tempfile::TempDir;

pub const LOCK_TIMEOUT: Duration = Duration::from_millis(100);

/// A project on disk with its index open and ledger loaded.
pub struct TestProject {
    pub ctx: ProjectContext,
    pub index: IndexEngine,
    pub ledger: Ledger,
    pub dir: TempDir,
}

impl TestProject {
    pub fn new(name: &str) -> Self {
        Self::init(name, false)
    }

    pub fn new_backup(name: &str) -> Self {
        Self::init(name, true)
    }

    fn init(name: &str, is_backup: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ctx = store::init(dir.path(), name, is_backup).unwrap();
        let index = IndexEngine::open(&ctx.layout, LOCK_TIMEOUT).unwrap();
        let ledger = Ledger::load(&ctx.layout.ledger_path()).unwrap();
        Self {
            ctx,
            index,
            ledger,
            dir,
        }
    }

    /// Drop files into `input/` and add them.
    pub fn add_files<C: AsRef<[u8]>>(&mut self, files: &[(&str, C)]) -> Vec<FileRecord> {
        let mut names = Vec::new();
        for (name, content) in files {
            fs::write(self.ctx.layout.input_dir().join(name), content).unwrap();
            names.push(name.to_string());
        }
        store::add_from_input(&self.ctx, &mut self.index, &mut self.ledger, &names).unwrap()
    }

    /// Flip `IsBackup` on and persist it.
    pub fn mark_backup(&mut self) {
        self.ctx.info.is_backup = true;
        self.ctx.save_info().unwrap();
    }

    /// Register `other` as backup slot 1 of this project.
    pub fn register_backup(&mut self, other: &TestProject) {
        self.ctx
            .info
            .projects
            .push(other.dir.path().display().to_string());
        self.ctx.info.last_backup_at.push(String::new());
        self.ctx.save_info().unwrap();
    }

    pub fn reload_ledger(&self) -> Ledger {
        Ledger::load(&self.ctx.layout.ledger_path()).unwrap()
    }
}

/// Minimal record for in-memory index tests.
pub fn record(id: &str, filename: &str) -> FileRecord {
    FileRecord {
        id: id.to_string(),
        filename: filename.to_string(),
        checksum: format!("sum-{filename}"),
        size: 10,
        file_type: "text/plain".to_string(),
        ctime: "2024-01-01 10:00:00+00:00".to_string(),
        utime: "2024-01-01 10:00:00+00:00".to_string(),
        ..Default::default()
    }
}

/// Every bucket row, sorted, for comparing index states.
pub fn dump_buckets(index: &IndexEngine) -> Vec<(String, String, String)> {
    let mut stmt = index
        .conn()
        .prepare("SELECT bucket, key, file_id FROM buckets ORDER BY bucket, key, file_id")
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
}
