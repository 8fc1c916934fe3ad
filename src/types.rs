//! Public types: file records, ledger entries, project info, buckets and match modes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::engine::tools::{EPOCH, name_to_id, now_string};
use crate::utils::config::{ProjectDefaults, REPO_NAME};

/// Metadata for one content file. Same shape as its `<filename>.json` sidecar.
///
/// `checksum` reflects the content as of the last successful verification, not
/// necessarily the current bytes on disk.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Short ID derived from `filename` (see [`name_to_id`]).
    pub id: String,
    pub filename: String,
    /// Lowercase hex BLAKE3 of the content.
    pub checksum: String,
    /// Length in bytes.
    pub size: u64,
    /// MIME-like type, e.g. `image/png`, `text/rs`, `office/docx`.
    #[serde(rename = "type")]
    pub file_type: String,
    #[serde(default)]
    pub like: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default)]
    pub collections: BTreeSet<String>,
    #[serde(default)]
    pub albums: BTreeSet<String>,
    pub ctime: String,
    pub utime: String,
}

impl FileRecord {
    /// New record for `filename` with ctime = utime = now. Content fields are left empty.
    pub fn new(filename: &str) -> Self {
        let now = now_string();
        Self {
            id: name_to_id(filename),
            filename: filename.to_string(),
            ctime: now.clone(),
            utime: now,
            ..Default::default()
        }
    }
}

/// Integrity state of one file. Lifecycle is independent of [`FileRecord`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    /// When the content was last hashed and compared.
    pub checked: String,
    /// Result of that comparison.
    pub damaged: bool,
}

impl LedgerEntry {
    /// Entry that is due for a check on the next sweep.
    pub fn unverified(id: &str) -> Self {
        Self {
            id: id.to_string(),
            checked: EPOCH.to_string(),
            damaged: false,
        }
    }
}

/// Contents of `project.json`.
///
/// `projects[0]` is this project; `projects[1..]` are backup roots. `last_backup_at` is parallel
/// to `projects`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectInfo {
    pub repo_name: String,
    pub project_name: String,
    #[serde(default)]
    pub is_backup: bool,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub last_backup_at: Vec<String>,
    /// Days between verifications of the same file.
    pub check_interval: u32,
    /// Bytes hashed per sweep.
    pub check_size_limit: u64,
    pub export_size_limit: u64,
}

impl ProjectInfo {
    pub fn new(project_name: &str) -> Self {
        Self {
            repo_name: REPO_NAME.to_string(),
            project_name: project_name.to_string(),
            is_backup: false,
            projects: vec![".".to_string()],
            last_backup_at: vec![String::new()],
            check_interval: ProjectDefaults::CHECK_INTERVAL_DAYS,
            check_size_limit: ProjectDefaults::CHECK_SIZE_LIMIT,
            export_size_limit: ProjectDefaults::EXPORT_SIZE_LIMIT,
        }
    }

    /// Keep `last_backup_at` the same length as `projects`.
    pub(crate) fn normalize(&mut self) {
        if self.projects.is_empty() {
            self.projects.push(".".to_string());
        }
        self.last_backup_at.resize(self.projects.len(), String::new());
    }
}

/// How a bucket is kept current.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
    /// Updated by add/delete/rename in the same invocation.
    Synchronous,
    /// Refreshed only by an explicit cache rebuild; may be stale in between.
    LazyManual,
    /// Picks up filesystem-only changes (hand-edited sidecars, copied files) only on a
    /// full rebuild from disk. Applies to the primary store itself.
    DiskRebuildOnly,
}

impl Freshness {
    /// Tier of the primary store (ID → record), as opposed to any bucket.
    pub const PRIMARY_STORE: Freshness = Freshness::DiskRebuildOnly;
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Freshness::Synchronous => "synchronous",
            Freshness::LazyManual => "lazy (db cache)",
            Freshness::DiskRebuildOnly => "disk rebuild only",
        };
        f.write_str(s)
    }
}

/// One inverted index per searchable attribute: value → set of IDs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    Filename,
    Checksum,
    Size,
    Type,
    Like,
    Label,
    Notes,
    Keyword,
    Collection,
    Album,
    CTime,
    UTime,
}

impl Bucket {
    pub const ALL: [Bucket; 12] = [
        Bucket::Filename,
        Bucket::Checksum,
        Bucket::Size,
        Bucket::Type,
        Bucket::Like,
        Bucket::Label,
        Bucket::Notes,
        Bucket::Keyword,
        Bucket::Collection,
        Bucket::Album,
        Bucket::CTime,
        Bucket::UTime,
    ];

    /// Name stored in the `bucket` column.
    pub fn name(&self) -> &'static str {
        match self {
            Bucket::Filename => "filename",
            Bucket::Checksum => "checksum",
            Bucket::Size => "size",
            Bucket::Type => "type",
            Bucket::Like => "like",
            Bucket::Label => "label",
            Bucket::Notes => "notes",
            Bucket::Keyword => "keyword",
            Bucket::Collection => "collection",
            Bucket::Album => "album",
            Bucket::CTime => "ctime",
            Bucket::UTime => "utime",
        }
    }

    pub fn freshness(&self) -> Freshness {
        match self {
            Bucket::Filename | Bucket::CTime => Freshness::Synchronous,
            _ => Freshness::LazyManual,
        }
    }

    /// Keys compare as integers rather than strings.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Bucket::Size | Bucket::Like)
    }

    /// Index keys this record contributes to the bucket. Zero/empty values produce none.
    pub fn keys_for(&self, f: &FileRecord) -> Vec<String> {
        let one = |s: &str| {
            if s.is_empty() {
                Vec::new()
            } else {
                vec![s.to_string()]
            }
        };
        match self {
            Bucket::Filename => one(&f.filename),
            Bucket::Checksum => one(&f.checksum),
            Bucket::Size => nonzero(f.size as i64),
            Bucket::Type => one(&f.file_type),
            Bucket::Like => nonzero(f.like),
            Bucket::Label => one(&f.label),
            Bucket::Notes => one(&f.notes),
            Bucket::Keyword => f.keywords.iter().filter(|s| !s.is_empty()).cloned().collect(),
            Bucket::Collection => f
                .collections
                .iter()
                .filter(|s| !s.is_empty())
                .cloned()
                .collect(),
            Bucket::Album => f.albums.iter().filter(|s| !s.is_empty()).cloned().collect(),
            Bucket::CTime => one(&f.ctime),
            Bucket::UTime => one(&f.utime),
        }
    }
}

fn nonzero(n: i64) -> Vec<String> {
    if n == 0 { Vec::new() } else { vec![n.to_string()] }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a search pattern is compared against bucket keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum MatchMode {
    Exact,
    Prefix,
    Contains,
    Suffix,
}

impl MatchMode {
    pub fn matches(&self, key: &str, pattern: &str) -> bool {
        match self {
            MatchMode::Exact => key == pattern,
            MatchMode::Prefix => key.starts_with(pattern),
            MatchMode::Contains => key.contains(pattern),
            MatchMode::Suffix => key.ends_with(pattern),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchMode::Exact => "exact",
            MatchMode::Prefix => "prefix",
            MatchMode::Contains => "contains",
            MatchMode::Suffix => "suffix",
        };
        f.write_str(s)
    }
}
