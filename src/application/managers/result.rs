//! Tree manager browsing an observation result directory.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::{Fetched, FetchError, ResultEntry, TreeManager, TreeNode};
use crate::infrastructure::traits::FileSystem;

pub struct ResultTreeManager {
    fs: Arc<dyn FileSystem>,
}

impl ResultTreeManager {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

fn fetch_error(path: &std::path::Path, err: io::Error) -> FetchError {
    let message = format!("{}: {}", path.display(), err);
    match err.kind() {
        io::ErrorKind::NotFound => FetchError::Corrupted(message),
        _ => FetchError::Unavailable(message),
    }
}

impl TreeManager for ResultTreeManager {
    type Payload = ResultEntry;
    type RootArgs = PathBuf;

    fn is_leaf(&self, payload: &ResultEntry) -> bool {
        !payload.is_dir
    }

    fn label(&self, node: &TreeNode<ResultEntry>) -> String {
        if node.payload.is_dir {
            format!("{}/", node.name.trim_end_matches('/'))
        } else {
            node.name.clone()
        }
    }

    fn fetch_children(&self, payload: &ResultEntry) -> Result<Vec<Fetched<ResultEntry>>, FetchError> {
        if !payload.is_dir {
            return Ok(Vec::new());
        }
        let entries = self
            .fs
            .list_dir(&payload.path)
            .map_err(|e| fetch_error(&payload.path, e))?;
        Ok(entries
            .into_iter()
            .map(|path| match path.file_name().and_then(|n| n.to_str()).map(str::to_owned) {
                Some(name) => Fetched::Node {
                    name,
                    payload: ResultEntry {
                        is_dir: self.fs.is_dir(&path),
                        path,
                    },
                },
                None => Fetched::Malformed {
                    reason: format!("unreadable file name: {}", path.display()),
                },
            })
            .collect())
    }

    fn root_payload(&self, path: PathBuf) -> Result<(ResultEntry, String), FetchError> {
        if !self.fs.exists(&path) {
            return Err(FetchError::Corrupted(format!(
                "{} does not exist",
                path.display()
            )));
        }
        let name = path.display().to_string();
        Ok((
            ResultEntry {
                is_dir: self.fs.is_dir(&path),
                path,
            },
            name,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::RealFileSystem;
    use tempfile::TempDir;

    #[test]
    fn given_missing_root_when_opening_then_corrupted() {
        let temp = TempDir::new().unwrap();
        let manager = ResultTreeManager::new(Arc::new(RealFileSystem));

        let err = manager.root_payload(temp.path().join("gone")).unwrap_err();

        assert!(matches!(err, FetchError::Corrupted(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn given_directory_root_when_opening_then_named_by_path() {
        let temp = TempDir::new().unwrap();
        let manager = ResultTreeManager::new(Arc::new(RealFileSystem));

        let (entry, name) = manager.root_payload(temp.path().to_path_buf()).unwrap();

        assert!(entry.is_dir);
        assert_eq!(name, temp.path().display().to_string());
    }
}
