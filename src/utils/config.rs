//! Application configuration constants.
//! Layout names, tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / project layout (from CARGO_PKG_NAME, cached) ----

/// Marker stored in `project.json` as `RepoName`; identifies a managed store.
pub const REPO_NAME: &str = "Stowage File Manager";

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    settings_filename: String,
    lock_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                settings_filename: format!(".{pkg}.toml"),
                lock_filename: format!("{}.lock", ProjectFiles::DATABASE),
            }
        })
    }

    /// Optional operator settings file in the project root.
    pub fn settings_filename(&self) -> &str {
        &self.settings_filename
    }

    /// Advisory lock file guarding the index store.
    pub fn lock_filename(&self) -> &str {
        &self.lock_filename
    }
}

/// Fixed names inside a project root.
pub struct ProjectFiles;

impl ProjectFiles {
    pub const PROJECT_INFO: &'static str = "project.json";
    pub const DATABASE: &'static str = "project.db";
    pub const LEDGER: &'static str = "ledger.json";
    pub const FILES_DIR: &'static str = "files";
    pub const METADATA_DIR: &'static str = "metadata";
    pub const INPUT_DIR: &'static str = "input";
    pub const RECYCLEBIN_DIR: &'static str = "recyclebin";
    /// Sidecar suffix appended to the content filename.
    pub const SIDECAR_EXT: &'static str = ".json";
}

// ---- Locking ----

/// Bounded wait when acquiring the index store lock.
pub struct LockConsts;

impl LockConsts {
    /// Give up after this long (milliseconds).
    pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
    /// Poll interval between `try_lock` attempts (milliseconds).
    pub const RETRY_INTERVAL_MS: u64 = 50;
}

// ---- Hashing ----

/// Hashing I/O thresholds and buffer sizes.
pub struct HashingConsts;

impl HashingConsts {
    /// File size above which hashing uses memory-mapped I/O (bytes). 100 MB.
    pub const HASH_MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;
    /// Chunk size for reading files below mmap threshold (bytes). 1 MB.
    pub const HASH_READ_CHUNK_SIZE: usize = 1024 * 1024;
}

// ---- Integrity / backup ----

pub const GIB: u64 = 1 << 30;
pub const MIB: u64 = 1 << 20;

/// Defaults written into a fresh `project.json`.
pub struct ProjectDefaults;

impl ProjectDefaults {
    /// Days before a verified file becomes due again.
    pub const CHECK_INTERVAL_DAYS: u32 = 30;
    /// Bytes hashed per sweep before it stops (at least one file is always checked).
    pub const CHECK_SIZE_LIMIT: u64 = 1024 * MIB;
    pub const EXPORT_SIZE_LIMIT: u64 = 10 * MIB;
}

/// Free space a backup volume must keep after receiving the size difference.
pub const BACKUP_SPACE_MARGIN: u64 = GIB;

// ---- Listing ----

/// Default number of rows printed by `search` and `list`.
pub const DEFAULT_LIST_LIMIT: usize = 15;
