//! Process-exclusive hold on the backing store file.
//!
//! Advisory on platforms that support it (all of our Tier-1 targets).
//! Released automatically by the OS on abnormal process termination; the
//! next `open` on the same path recovers with no manual intervention.

use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;

use crate::error::BlockStoreError;

pub fn open_and_lock(path: &Path) -> Result<File, BlockStoreError> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(file),
        Err(_) => Err(BlockStoreError::FileLocked),
    }
}

pub fn unlock(file: &File) {
    // Best-effort; the OS releases the lock on close/drop regardless.
    let _ = FileExt::unlock(file);
}
