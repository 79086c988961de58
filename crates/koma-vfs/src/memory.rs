//! In-memory VFS.
//!
//! Backs tests, fixtures, and the `koma` binary. The tree is a single
//! `BTreeMap` keyed by normalized absolute path, so a directory's children
//! form one contiguous key range.

use std::borrow::Cow;
use std::collections::BTreeMap;

use koma_types::error::{KomaError, Result};

use crate::{EntryKind, Vfs, VfsEntry, VfsMetadata};

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

impl Node {
    fn kind(&self) -> EntryKind {
        match self {
            Node::File(_) => EntryKind::File,
            Node::Dir => EntryKind::Directory,
        }
    }

    fn size(&self) -> u64 {
        match self {
            Node::File(data) => data.len() as u64,
            Node::Dir => 0,
        }
    }
}

/// A file tree held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryVfs {
    nodes: BTreeMap<String, Node>,
}

impl MemoryVfs {
    /// Create a tree containing only `/`.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        Self { nodes }
    }

    /// Number of files and directories, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when only the root directory exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }
}

impl Default for MemoryVfs {
    fn default() -> Self {
        Self::new()
    }
}

/// Leading `/`, no empty components, no trailing `/` except for the root.
fn normalize(path: &str) -> Cow<'_, str> {
    let clean = path.starts_with('/')
        && !path.contains("//")
        && (path.len() == 1 || !path.ends_with('/'));
    if clean {
        return Cow::Borrowed(path);
    }
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    Cow::Owned(format!("/{}", parts.join("/")))
}

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

/// Key prefix shared by every descendant of `dir`.
fn child_prefix(dir: &str) -> String {
    if dir == "/" {
        "/".to_string()
    } else {
        format!("{dir}/")
    }
}

impl Vfs for MemoryVfs {
    fn readdir(&self, path: &str) -> Result<Vec<VfsEntry>> {
        let path = normalize(path);
        match self.nodes.get(path.as_ref()) {
            Some(Node::Dir) => {},
            Some(Node::File(_)) => {
                return Err(KomaError::Vfs(format!("not a directory: {path}")));
            },
            None => return Err(KomaError::Vfs(format!("no such directory: {path}"))),
        }

        let prefix = child_prefix(&path);
        let entries = self
            .nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, node)| {
                let name = &key[prefix.len()..];
                (!name.is_empty() && !name.contains('/')).then(|| VfsEntry {
                    name: name.to_string(),
                    kind: node.kind(),
                    size: node.size(),
                })
            })
            .collect();
        Ok(entries)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let path = normalize(path);
        match self.nodes.get(path.as_ref()) {
            Some(Node::File(data)) => Ok(data.clone()),
            Some(Node::Dir) => Err(KomaError::Vfs(format!("is a directory: {path}"))),
            None => Err(KomaError::Vfs(format!("no such file: {path}"))),
        }
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let path = normalize(path);
        if let Some(Node::Dir) = self.nodes.get(path.as_ref()) {
            return Err(KomaError::Vfs(format!("is a directory: {path}")));
        }
        let par = parent(&path);
        match self.nodes.get(par) {
            Some(Node::Dir) => {},
            Some(Node::File(_)) => {
                return Err(KomaError::Vfs(format!("not a directory: {par}")));
            },
            None => {
                return Err(KomaError::Vfs(format!(
                    "parent directory does not exist: {par}"
                )));
            },
        }
        self.nodes.insert(path.into_owned(), Node::File(data.to_vec()));
        Ok(())
    }

    fn stat(&self, path: &str) -> Result<VfsMetadata> {
        let path = normalize(path);
        self.nodes
            .get(path.as_ref())
            .map(|node| VfsMetadata {
                kind: node.kind(),
                size: node.size(),
            })
            .ok_or_else(|| KomaError::Vfs(format!("no such path: {path}")))
    }

    fn mkdir(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        match self.nodes.get(path.as_ref()) {
            Some(Node::Dir) => return Ok(()),
            Some(Node::File(_)) => {
                return Err(KomaError::Vfs(format!("file exists: {path}")));
            },
            None => {},
        }
        let par = parent(&path).to_string();
        if !self.nodes.contains_key(&par) {
            self.mkdir(&par)?;
        }
        self.nodes.insert(path.into_owned(), Node::Dir);
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        let path = normalize(path);
        if path.as_ref() == "/" {
            return Err(KomaError::Vfs("cannot remove root".to_string()));
        }
        match self.nodes.get(path.as_ref()) {
            Some(Node::Dir) => {
                let prefix = child_prefix(&path);
                let has_children = self
                    .nodes
                    .range(prefix.clone()..)
                    .next()
                    .is_some_and(|(key, _)| key.starts_with(&prefix));
                if has_children {
                    return Err(KomaError::Vfs(format!("directory not empty: {path}")));
                }
            },
            Some(Node::File(_)) => {},
            None => return Err(KomaError::Vfs(format!("no such path: {path}"))),
        }
        self.nodes.remove(path.as_ref());
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(normalize(path).as_ref())
    }
}
