//! Volume lookup for a path: which mounted disk holds it and how much space is free.

use log::debug;
use std::path::Path;

use sysinfo::{Disk, Disks};

use crate::error::{Error, PathContext, Result};

/// Free bytes on the volume containing `path`.
pub fn available_space(path: &Path) -> Result<u64> {
    let canonical = path.canonicalize().at(path)?;
    let disks = Disks::new_with_refreshed_list();
    let disk = disk_for_path(&disks, &canonical).ok_or_else(|| {
        Error::NotFound(format!("mounted volume for {}", canonical.display()))
    })?;
    debug!(
        "{} is on {} ({} bytes free)",
        canonical.display(),
        disk.mount_point().display(),
        disk.available_space()
    );
    Ok(disk.available_space())
}

/// The disk with the longest mount point that prefixes `path`.
fn disk_for_path<'a>(disks: &'a Disks, path: &Path) -> Option<&'a Disk> {
    disks
        .list()
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
}
