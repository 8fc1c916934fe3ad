//! Exclusive advisory lock on the index store, with a bounded wait.

use fs2::FileExt as _;
use log::debug;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::{Error, PathContext, Result};
use crate::utils::config::LockConsts;

/// Held for as long as an index store is open. Released on drop.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Try to lock `path` (creating it if needed) until `timeout` elapses, then fail with
    /// [`Error::Locked`].
    pub fn acquire(path: &Path, timeout: Duration) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .at(path)?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    debug!("Locked {}", path.display());
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                    if Instant::now() >= deadline {
                        return Err(Error::Locked {
                            path: path.to_path_buf(),
                        });
                    }
                    std::thread::sleep(Duration::from_millis(LockConsts::RETRY_INTERVAL_MS));
                }
                Err(e) => return Err(e).at(path),
            }
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        debug!("Unlocked {}", self.path.display());
    }
}
