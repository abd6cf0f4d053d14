use std::fs::{File, OpenOptions};
use std::path::Path;

use parking_lot::{Mutex, MutexGuard};
use tracing::warn;

use super::error::StorageResult;

/// Exclusive advisory lock on the store's `.lock` file.
///
/// Released when dropped.
pub(crate) struct FileLockGuard {
    file: File,
}

impl FileLockGuard {
    pub(crate) fn acquire(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        file.lock()?;
        Ok(Self { file })
    }
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(error = %e, "Failed to release store lock");
        }
    }
}

/// Serializes read-modify-write sections across threads and processes.
#[derive(Debug, Default)]
pub(crate) struct StoreLock {
    local: Mutex<()>,
}

/// Held for the duration of a critical section.
pub(crate) struct StoreLockGuard<'a> {
    // field order matters: the file lock is released before the thread lock
    _file: FileLockGuard,
    _local: MutexGuard<'a, ()>,
}

impl StoreLock {
    pub(crate) fn acquire(&self, lock_path: &Path) -> StorageResult<StoreLockGuard<'_>> {
        let local = self.local.lock();
        let file = FileLockGuard::acquire(lock_path)?;
        Ok(StoreLockGuard {
            _file: file,
            _local: local,
        })
    }
}
