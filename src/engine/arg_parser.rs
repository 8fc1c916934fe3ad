use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::{Bucket, MatchMode};

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
}

/// Archival file manager: content-addressed storage with metadata sidecars, integrity
/// checks and backup sync.
#[derive(Clone, Parser)]
#[command(name = "stowage")]
#[command(about = "Manage an archival project; mutating commands preview unless --danger is given.")]
pub struct Cli {
    /// Project root. Default: current directory.
    #[arg(long = "dir", short = 'C', value_name = "DIR", default_value = DefaultArgs::DIR, global = true)]
    pub dir: PathBuf,

    /// Verbose output (also enables progress bars).
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Create a project in an empty folder.
    Init {
        #[arg(long)]
        name: String,
        /// Mark the new project as a backup root.
        #[arg(long)]
        backup: bool,
    },
    /// Add the files waiting in input/.
    Add {
        /// Really add; otherwise only list what would be added.
        #[arg(long)]
        danger: bool,
    },
    /// Move files to the recycle bin, by ID or by filename.
    #[command(group(ArgGroup::new("target").required(true).args(["id", "name"])))]
    Delete {
        #[arg(long, num_args = 1..)]
        id: Vec<String>,
        #[arg(long, num_args = 1..)]
        name: Vec<String>,
        #[arg(long)]
        danger: bool,
    },
    /// Rename one file; its ID changes with its name.
    Rename {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
    },
    /// Set how much you like a file (0 to unlike).
    Like {
        #[arg(long)]
        id: String,
        #[arg(short = 'n', default_value_t = 1)]
        n: i64,
    },
    /// List content files without sidecars and sidecars without content.
    Orphan,
    /// Index store maintenance.
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    /// Integrity ledger: sweep, renew, or show every project's status.
    Check(CheckArgs),
    /// Compare, repair or sync a backup root.
    Backup(BackupArgs),
    /// Find files by attribute.
    Search(SearchArgs),
    /// List recent files, or attribute values with counts.
    List(ListArgs),
}

#[derive(Clone, Copy, Subcommand)]
pub enum DbAction {
    /// Rebuild everything from the sidecars on disk.
    Rebuild,
    /// Refresh attribute buckets from the primary store.
    Cache,
    /// Count files and distinct keys per bucket.
    Count,
    /// Total size of all files.
    Size,
}

#[derive(Clone, Args)]
#[command(group(ArgGroup::new("mode").required(true).args(["check", "renew", "projects"])))]
pub struct CheckArgs {
    /// Project slot: 0 is this project, 1.. are backup roots.
    #[arg(short = 'n', default_value_t = 0)]
    pub n: usize,

    /// Run one budgeted verification sweep.
    #[arg(long)]
    pub check: bool,

    /// Create a fresh ledger (refuses if one exists).
    #[arg(long)]
    pub renew: bool,

    /// Show the status of every project root.
    #[arg(long)]
    pub projects: bool,
}

#[derive(Clone, Args)]
#[command(group(ArgGroup::new("target").required(true).args(["projects", "n"])))]
pub struct BackupArgs {
    /// List the project roots and their last backup times.
    #[arg(long)]
    pub projects: bool,

    /// Backup slot to work on (1..).
    #[arg(short = 'n')]
    pub n: Option<usize>,

    /// Apply the sync; otherwise only print status and the planned changes.
    #[arg(long, requires = "n")]
    pub danger: bool,

    /// Repair damaged files from the other side instead of syncing.
    #[arg(long, requires = "n")]
    pub fix: bool,
}

#[derive(Clone, Args)]
pub struct SearchArgs {
    pub attr: SearchAttr,

    pub pattern: String,

    /// Default: prefix for filename/notes/label, exact for keyword/collection/album.
    #[arg(long = "match", value_enum)]
    pub mode: Option<MatchMode>,

    #[arg(long, value_enum)]
    pub orderby: Option<SearchOrder>,

    /// Ascending order (default is descending).
    #[arg(long)]
    pub asc: bool,

    /// Maximum rows to print.
    #[arg(short = 'n')]
    pub limit: Option<usize>,

    /// Print full records.
    #[arg(long)]
    pub more: bool,
}

#[derive(Clone, Args)]
pub struct ListArgs {
    #[arg(long, value_enum)]
    pub orderby: Option<ListOrder>,

    #[arg(long)]
    pub asc: bool,

    #[arg(short = 'n')]
    pub limit: Option<usize>,

    #[arg(long)]
    pub more: bool,

    /// List attribute values with their file counts instead of files.
    #[arg(long, value_enum)]
    pub keys: Option<ListKeys>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SearchAttr {
    Filename,
    Notes,
    Label,
    Keyword,
    Collection,
    Album,
}

impl SearchAttr {
    pub fn bucket(self) -> Bucket {
        match self {
            SearchAttr::Filename => Bucket::Filename,
            SearchAttr::Notes => Bucket::Notes,
            SearchAttr::Label => Bucket::Label,
            SearchAttr::Keyword => Bucket::Keyword,
            SearchAttr::Collection => Bucket::Collection,
            SearchAttr::Album => Bucket::Album,
        }
    }

    /// Free text matches by prefix; tags match exactly.
    pub fn default_mode(self) -> MatchMode {
        match self {
            SearchAttr::Filename | SearchAttr::Notes | SearchAttr::Label => MatchMode::Prefix,
            SearchAttr::Keyword | SearchAttr::Collection | SearchAttr::Album => MatchMode::Exact,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SearchOrder {
    Ctime,
    Utime,
    Filename,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ListOrder {
    Ctime,
    Utime,
    Size,
    Like,
}

impl ListOrder {
    pub fn bucket(self) -> Bucket {
        match self {
            ListOrder::Ctime => Bucket::CTime,
            ListOrder::Utime => Bucket::UTime,
            ListOrder::Size => Bucket::Size,
            ListOrder::Like => Bucket::Like,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ListKeys {
    Labels,
    Notes,
    Keywords,
    Collections,
    Albums,
}

impl ListKeys {
    pub fn bucket(self) -> Bucket {
        match self {
            ListKeys::Labels => Bucket::Label,
            ListKeys::Notes => Bucket::Notes,
            ListKeys::Keywords => Bucket::Keyword,
            ListKeys::Collections => Bucket::Collection,
            ListKeys::Albums => Bucket::Album,
        }
    }
}
