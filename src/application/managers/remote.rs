//! Tree manager browsing a remote OTDB tree.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{Fetched, FetchError, OtdbNode, TreeManager, TreeNode};
use crate::infrastructure::error::SourceError;
use crate::infrastructure::traits::{RawTreeRecord, RemoteTreeSource};

/// Entry point of a remote tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteRoot {
    pub tree_id: i64,
    /// `None` opens the top node of the tree
    pub node_id: Option<i64>,
}

pub struct RemoteTreeManager {
    source: Arc<dyn RemoteTreeSource>,
    fetch_depth: u32,
    index_suffix: bool,
}

impl RemoteTreeManager {
    pub fn new(source: Arc<dyn RemoteTreeSource>) -> Self {
        Self {
            source,
            fetch_depth: 1,
            index_suffix: true,
        }
    }

    /// Depth passed to the source; only records parented on the node are kept.
    pub fn with_fetch_depth(mut self, depth: u32) -> Self {
        self.fetch_depth = depth.max(1);
        self
    }

    pub fn with_index_suffix(mut self, enabled: bool) -> Self {
        self.index_suffix = enabled;
        self
    }

    /// Records without a parent can only be placed when a single level was requested.
    fn is_direct_child(&self, record: &RawTreeRecord, node_id: i64) -> bool {
        match record.parent {
            Some(parent) => parent == node_id,
            None => self.fetch_depth == 1,
        }
    }

    fn interpret(tree_id: i64, record: RawTreeRecord) -> Result<OtdbNode, String> {
        let node_id = record.id.ok_or("record without id")?;
        let name = record
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| format!("node {} has no name", node_id))?;
        let leaf = record
            .leaf
            .ok_or_else(|| format!("node {} has no leaf flag", node_id))?;
        let index = match record.index {
            Some(i) if i >= 0 => {
                Some(u32::try_from(i).map_err(|_| format!("node {} index {} out of range", node_id, i))?)
            }
            _ => None,
        };
        Ok(OtdbNode {
            tree_id,
            node_id,
            name,
            leaf,
            index,
        })
    }
}

fn fetch_error(err: SourceError) -> FetchError {
    match err {
        SourceError::Disconnected(_) | SourceError::Timeout(_) => {
            FetchError::Unavailable(err.to_string())
        }
        SourceError::NodeNotFound { .. } | SourceError::TreeNotFound(_) => {
            FetchError::Malformed(err.to_string())
        }
    }
}

impl TreeManager for RemoteTreeManager {
    type Payload = OtdbNode;
    type RootArgs = RemoteRoot;

    fn is_leaf(&self, payload: &OtdbNode) -> bool {
        payload.leaf
    }

    fn label(&self, node: &TreeNode<OtdbNode>) -> String {
        node.payload.display_name(self.index_suffix)
    }

    fn fetch_children(&self, payload: &OtdbNode) -> Result<Vec<Fetched<OtdbNode>>, FetchError> {
        if payload.leaf {
            return Ok(Vec::new());
        }
        debug!(
            "fetch_children: tree={} node={} depth={}",
            payload.tree_id, payload.node_id, self.fetch_depth
        );
        let records = self
            .source
            .fetch_children(payload.tree_id, payload.node_id, self.fetch_depth)
            .map_err(fetch_error)?;

        Ok(records
            .into_iter()
            .filter(|r| r.id != Some(payload.node_id))
            .filter(|r| self.is_direct_child(r, payload.node_id))
            .map(|record| match Self::interpret(payload.tree_id, record) {
                Ok(node) => Fetched::Node {
                    name: node.name.clone(),
                    payload: node,
                },
                Err(reason) => Fetched::Malformed { reason },
            })
            .collect())
    }

    fn root_payload(&self, args: RemoteRoot) -> Result<(OtdbNode, String), FetchError> {
        let record = self
            .source
            .fetch_node(args.tree_id, args.node_id)
            .map_err(fetch_error)?;
        let node = Self::interpret(args.tree_id, record).map_err(FetchError::Malformed)?;
        let name = node.name.clone();
        Ok((node, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LazyTree;

    /// Answers every fetch down to `depth` without parent ids.
    struct ParentlessSource;

    fn unparented(id: i64, name: &str) -> RawTreeRecord {
        RawTreeRecord {
            id: Some(id),
            parent: None,
            name: Some(name.into()),
            leaf: Some(false),
            index: None,
        }
    }

    impl RemoteTreeSource for ParentlessSource {
        fn fetch_node(&self, _tree_id: i64, _node_id: Option<i64>) -> Result<RawTreeRecord, SourceError> {
            Ok(unparented(1, "LOFAR"))
        }

        fn fetch_children(
            &self,
            _tree_id: i64,
            node_id: i64,
            depth: u32,
        ) -> Result<Vec<RawTreeRecord>, SourceError> {
            let mut records = match node_id {
                1 => vec![unparented(2, "LOFAR.ObsSW")],
                2 => vec![unparented(3, "LOFAR.ObsSW.Observation")],
                _ => Vec::new(),
            };
            if node_id == 1 && depth > 1 {
                records.push(unparented(3, "LOFAR.ObsSW.Observation"));
            }
            Ok(records)
        }
    }

    fn child_labels(manager: RemoteTreeManager) -> Vec<String> {
        let mut tree = LazyTree::new(manager);
        let root = tree
            .open_root(RemoteRoot {
                tree_id: 7,
                node_id: None,
            })
            .unwrap();
        tree.children(root)
            .unwrap()
            .into_iter()
            .map(|id| tree.label(id).unwrap())
            .collect()
    }

    #[test]
    fn given_parentless_records_when_fetching_one_level_then_all_are_children() {
        let manager = RemoteTreeManager::new(Arc::new(ParentlessSource));

        assert_eq!(child_labels(manager), ["ObsSW"]);
    }

    #[test]
    fn given_parentless_records_when_fetching_deeper_then_none_attached() {
        let manager = RemoteTreeManager::new(Arc::new(ParentlessSource)).with_fetch_depth(2);

        let labels = child_labels(manager);

        assert!(labels.is_empty(), "unplaceable records attached: {labels:?}");
    }

    #[test]
    fn given_negative_index_when_interpreting_then_no_index() {
        let node = RemoteTreeManager::interpret(
            1,
            RawTreeRecord {
                id: Some(5),
                parent: None,
                name: Some("LOFAR.PIC".into()),
                leaf: Some(true),
                index: Some(-1),
            },
        )
        .unwrap();
        assert_eq!(node.index, None);
        assert!(node.leaf);
    }

    #[test]
    fn given_missing_leaf_flag_when_interpreting_then_malformed() {
        let err = RemoteTreeManager::interpret(
            1,
            RawTreeRecord {
                id: Some(5),
                name: Some("x".into()),
                ..RawTreeRecord::default()
            },
        )
        .unwrap_err();
        assert!(err.contains("leaf"));
    }

    #[test]
    fn given_source_errors_when_mapping_then_retryability_follows_kind() {
        assert!(fetch_error(SourceError::Timeout(500)).is_retryable());
        assert!(fetch_error(SourceError::Disconnected("eof".into())).is_retryable());
        assert!(!fetch_error(SourceError::TreeNotFound(3)).is_retryable());
    }
}
