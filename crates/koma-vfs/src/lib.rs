//! Virtual file system abstraction.
//!
//! The shell core only touches storage through [`Vfs`]. Paths handed to a
//! `Vfs` are absolute; callers resolve user input with [`resolve_path`].

mod memory;
pub mod tape;

pub use memory::MemoryVfs;

use koma_types::error::Result;

/// Kind of a VFS node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One child returned by [`Vfs::readdir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes (0 for directories).
    pub size: u64,
}

/// Metadata returned by [`Vfs::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VfsMetadata {
    pub kind: EntryKind,
    pub size: u64,
}

/// Storage backend consumed by the shell.
pub trait Vfs {
    /// List the direct children of a directory, sorted by name.
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>>;

    /// Read a whole file. Fails with a `no such file` error when absent.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Create or truncate a file. The parent directory must exist.
    fn write(&mut self, path: &str, data: &[u8]) -> Result<()>;

    fn stat(&self, path: &str) -> Result<VfsMetadata>;

    /// Create a directory and any missing parents.
    fn mkdir(&mut self, path: &str) -> Result<()>;

    /// Remove a file or an empty directory.
    fn remove(&mut self, path: &str) -> Result<()>;

    fn exists(&self, path: &str) -> bool;

    /// Read a file as text, replacing invalid UTF-8.
    fn read_to_string(&self, path: &str) -> Result<String> {
        let data = self.read(path)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    fn is_dir(&self, path: &str) -> bool {
        self.stat(path)
            .is_ok_and(|meta| meta.kind == EntryKind::Directory)
    }
}

/// Resolve a possibly-relative path against the current working directory.
///
/// `.` components are dropped and `..` pops one level; `..` at the root
/// stays at the root.
pub fn resolve_path(cwd: &str, input: &str) -> String {
    let raw = if input.starts_with('/') {
        input.to_string()
    } else if cwd == "/" {
        format!("/{input}")
    } else {
        format!("{cwd}/{input}")
    };

    let mut parts: Vec<&str> = Vec::new();
    for component in raw.split('/') {
        match component {
            "" | "." => {},
            ".." => {
                parts.pop();
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", parts.join("/"))
    }
}
