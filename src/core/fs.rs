//! Filesystem capability consumed by the scanner and by `ensure`.
//!
//! The workspace root takes this as an explicit constructor argument so tests
//! can substitute an instance; there is no process-wide default.

use std::fs;
use std::io;
use std::path::Path;

/// A directory entry as the scanner sees it: a name and whether it is a
/// directory. Symlinks are resolved by the implementation.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

pub trait Filesystem: Send + Sync {
    /// Returns Ok(true) if the path exists and is a directory.
    fn is_dir(&self, path: &Path) -> io::Result<bool>;

    /// Reads the immediate children of a directory.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Creates a directory and all of its parents.
    fn mkdir_all(&self, path: &Path) -> io::Result<()>;

    /// Links `dst` to `src`: a symlink where the platform supports it, a
    /// recursive copy otherwise.
    fn symlink_or_copy(&self, src: &Path, dst: &Path) -> io::Result<()>;
}

/// The production implementation, backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        Ok(fs::metadata(path)?.is_dir())
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.path().is_dir();
            entries.push(DirEntry { name, is_dir });
        }
        Ok(entries)
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    #[cfg(unix)]
    fn symlink_or_copy(&self, src: &Path, dst: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(src, dst)
    }

    #[cfg(not(unix))]
    fn symlink_or_copy(&self, src: &Path, dst: &Path) -> io::Result<()> {
        copy_recursive(src, dst)
    }
}

#[cfg(not(unix))]
fn copy_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let target = dst.join(entry.file_name());
        if entry.path().is_dir() {
            copy_recursive(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
