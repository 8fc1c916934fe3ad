//! Backup: diff a source project against a backup root, repair damage, sync.

pub mod diff;
pub mod fix;
pub mod status;
pub mod sync;

pub use diff::{ChangedFile, ChangedFiles, changed_files};
pub use fix::{FixReport, FixSide, auto_fix, auto_fix_one_way};
pub use status::{ProjectStatus, SpaceProbe, SysinfoProbe, check_status};
pub use sync::{apply_changes, sync_backup};
