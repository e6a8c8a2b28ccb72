//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services and tree
//! managers to be tested with mock implementations.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::infrastructure::error::SourceError;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Replace file content atomically.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Entries of a directory, sorted by path.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Raw node record as delivered by a remote tree database.
///
/// Every field is optional at the boundary; managers decide what is usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTreeRecord {
    pub id: Option<i64>,
    pub parent: Option<i64>,
    pub name: Option<String>,
    pub leaf: Option<bool>,
    pub index: Option<i64>,
}

/// Remote tree database (OTDB) access.
pub trait RemoteTreeSource: Send + Sync {
    /// Fetch one node; `None` asks for the top node of the tree.
    fn fetch_node(&self, tree_id: i64, node_id: Option<i64>) -> Result<RawTreeRecord, SourceError>;

    /// Descendants of `node_id` down to `depth` levels, in source order.
    fn fetch_children(
        &self,
        tree_id: i64,
        node_id: i64,
        depth: u32,
    ) -> Result<Vec<RawTreeRecord>, SourceError>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in walkdir::WalkDir::new(path).min_depth(1).max_depth(1) {
            let entry = entry.map_err(io::Error::from)?;
            entries.push(entry.into_path());
        }
        entries.sort();
        Ok(entries)
    }
}
