//! Filesystem helpers for daemon directories, keyrings and templates.
//!
//! Every failure maps to [`CncoreError::Filesystem`] with the offending path
//! in the message.

use cncore_shared::errors::{CncoreError, CncoreResult};
use nix::unistd::{Gid, Uid, chown};
use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Numeric owner applied to files the daemons must read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl Owner {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self { uid, gid }
    }

    pub fn apply(&self, path: &Path) -> CncoreResult<()> {
        chown(
            path,
            Some(Uid::from_raw(self.uid)),
            Some(Gid::from_raw(self.gid)),
        )
        .map_err(|e| {
            CncoreError::Filesystem(format!(
                "Failed to chown {} to {}:{}: {}",
                path.display(),
                self.uid,
                self.gid,
                e
            ))
        })
    }
}

/// Change ownership of `path` when an owner is configured.
pub fn set_owner(path: &Path, owner: Option<Owner>) -> CncoreResult<()> {
    match owner {
        Some(owner) => owner.apply(path),
        None => Ok(()),
    }
}

/// Create `dir` (and parents) if absent, then hand it to `owner`.
///
/// Existing directories are left untouched.
pub fn ensure_dir(dir: &Path, owner: Option<Owner>) -> CncoreResult<()> {
    if dir.exists() {
        return Ok(());
    }

    std::fs::create_dir_all(dir).map_err(|e| {
        CncoreError::Filesystem(format!(
            "Failed to create directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    set_owner(dir, owner)
}

/// Write `contents` to `path`, creating it with `mode` if it does not exist.
pub fn write_file(path: &Path, contents: &[u8], mode: u32) -> CncoreResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)
        .map_err(|e| {
            CncoreError::Filesystem(format!("Failed to open {}: {}", path.display(), e))
        })?;

    file.write_all(contents).map_err(|e| {
        CncoreError::Filesystem(format!("Failed to write {}: {}", path.display(), e))
    })
}

/// Replace every occurrence of `placeholder` in the file at `path`.
pub fn replace_in_file(path: &Path, placeholder: &str, value: &str) -> CncoreResult<()> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        CncoreError::Filesystem(format!("Failed to read {}: {}", path.display(), e))
    })?;

    std::fs::write(path, contents.replace(placeholder, value)).map_err(|e| {
        CncoreError::Filesystem(format!("Failed to write {}: {}", path.display(), e))
    })
}
