//! Remote tree source backed by a TOML dump of OTDB trees.
//!
//! ```toml
//! [[trees]]
//! id = 12
//! [[trees.nodes]]
//! id = 1
//! name = "LOFAR"
//! leaf = false
//! [[trees.nodes]]
//! id = 2
//! parent = 1
//! name = "LOFAR.ObsSW"
//! leaf = false
//! ```

use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::infrastructure::error::{InfraError, InfraResult, SourceError};
use crate::infrastructure::traits::{FileSystem, RawTreeRecord, RemoteTreeSource};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDump {
    #[serde(default)]
    pub trees: Vec<DumpedTree>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpedTree {
    pub id: i64,
    #[serde(default)]
    pub nodes: Vec<RawTreeRecord>,
}

/// In-process stand-in for the remote database.
#[derive(Debug, Clone, Default)]
pub struct DumpTreeSource {
    dump: TreeDump,
}

impl DumpTreeSource {
    pub fn new(dump: TreeDump) -> Self {
        Self { dump }
    }

    pub fn load(fs: &dyn FileSystem, path: &Path) -> InfraResult<Self> {
        debug!("load tree dump: {}", path.display());
        let content = fs
            .read_to_string(path)
            .map_err(|e| InfraError::io(format!("read tree dump {}", path.display()), e))?;
        let dump: TreeDump = toml::from_str(&content).map_err(|e| InfraError::Dump {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(dump))
    }

    fn tree(&self, tree_id: i64) -> Result<&DumpedTree, SourceError> {
        self.dump
            .trees
            .iter()
            .find(|t| t.id == tree_id)
            .ok_or(SourceError::TreeNotFound(tree_id))
    }
}

impl RemoteTreeSource for DumpTreeSource {
    fn fetch_node(&self, tree_id: i64, node_id: Option<i64>) -> Result<RawTreeRecord, SourceError> {
        let tree = self.tree(tree_id)?;
        let found = match node_id {
            Some(id) => tree.nodes.iter().find(|n| n.id == Some(id)),
            None => tree.nodes.iter().find(|n| n.parent.is_none()),
        };
        found.cloned().ok_or(SourceError::NodeNotFound {
            tree_id,
            node_id: node_id.unwrap_or_default(),
        })
    }

    fn fetch_children(
        &self,
        tree_id: i64,
        node_id: i64,
        depth: u32,
    ) -> Result<Vec<RawTreeRecord>, SourceError> {
        let tree = self.tree(tree_id)?;
        if !tree.nodes.iter().any(|n| n.id == Some(node_id)) {
            return Err(SourceError::NodeNotFound { tree_id, node_id });
        }

        let mut result = Vec::new();
        let mut queue = VecDeque::from([(node_id, 0u32)]);
        while let Some((current, level)) = queue.pop_front() {
            if level >= depth {
                continue;
            }
            for record in tree.nodes.iter().filter(|n| n.parent == Some(current)) {
                result.push(record.clone());
                if let Some(id) = record.id {
                    queue.push_back((id, level + 1));
                }
            }
        }
        Ok(result)
    }
}
