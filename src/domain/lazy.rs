//! Lazily populated trees.
//!
//! A [`LazyTree`] owns a [`TreeManager`] and an arena of [`TreeNode`]s. Children of a
//! node are fetched from the manager's data source the first time somebody asks for
//! them, and never again for the lifetime of that node.

use generational_arena::{Arena, Index};
use tracing::{debug, instrument, warn};

use crate::domain::error::{DomainError, DomainResult, FetchError};

/// Handle of a node inside a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

/// Population state of a node. Transitions only go forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Population {
    /// Children not fetched yet (or last fetch failed retryably)
    Pending,
    /// Children fetched and attached
    Populated,
    /// Fetch failed permanently; the node shows no children
    Broken(String),
}

/// Tree node wrapping an opaque payload.
#[derive(Debug)]
pub struct TreeNode<P> {
    /// Domain payload owned by this node
    pub payload: P,
    /// Name given at creation; managers may derive a different label
    pub name: String,
    state: Population,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl<P> TreeNode<P> {
    pub fn state(&self) -> &Population {
        &self.state
    }

    pub fn is_populated(&self) -> bool {
        self.state == Population::Populated
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Attached children. Empty until the node is populated.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// One item of a fetched child batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<P> {
    Node { payload: P, name: String },
    /// Child that could not be interpreted; skipped during population
    Malformed { reason: String },
}

/// Counters of one population run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateReport {
    pub added: usize,
    pub skipped: usize,
}

/// Arena storage for tree nodes.
#[derive(Debug)]
pub struct NodeArena<P> {
    arena: Arena<TreeNode<P>>,
    root: Option<NodeId>,
}

impl<P> Default for NodeArena<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> NodeArena<P> {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Insert a node. Without a parent it becomes the root.
    #[instrument(level = "trace", skip(self, payload))]
    pub fn insert_node(&mut self, payload: P, name: String, parent: Option<NodeId>) -> NodeId {
        let node = TreeNode {
            payload,
            name,
            state: Population::Pending,
            parent,
            children: Vec::new(),
        };
        let node_id = NodeId(self.arena.insert(node));

        if let Some(parent_id) = parent {
            if let Some(parent) = self.arena.get_mut(parent_id.0) {
                parent.children.push(node_id);
            }
        } else {
            self.root = Some(node_id);
        }

        node_id
    }

    pub fn get_node(&self, id: NodeId) -> Option<&TreeNode<P>> {
        self.arena.get(id.0)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut TreeNode<P>> {
        self.arena.get_mut(id.0)
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn mark_populated(&mut self, id: NodeId) -> DomainResult<()> {
        let node = self.get_node_mut(id).ok_or(DomainError::UnknownNode(id))?;
        node.state = Population::Populated;
        Ok(())
    }

    pub fn mark_broken(&mut self, id: NodeId, reason: String) -> DomainResult<()> {
        let node = self.get_node_mut(id).ok_or(DomainError::UnknownNode(id))?;
        node.state = Population::Broken(reason);
        Ok(())
    }

    /// Pre-order walk over the nodes materialised so far.
    pub fn iter(&self) -> NodeIterator<'_, P> {
        NodeIterator::new(self, self.root)
    }

    /// Post-order walk starting at `start`.
    pub fn iter_postorder(&self, start: NodeId) -> PostOrderIterator<'_, P> {
        PostOrderIterator::new(self, Some(start))
    }

    /// Depth of the materialised part of the tree.
    pub fn depth(&self) -> usize {
        self.root.map(|root| self.calculate_depth(root)).unwrap_or(0)
    }

    fn calculate_depth(&self, id: NodeId) -> usize {
        if let Some(node) = self.get_node(id) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Remove `id` and everything below it. Returns the number of freed nodes.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_subtree(&mut self, id: NodeId) -> usize {
        let doomed: Vec<NodeId> = self.iter_postorder(id).map(|(id, _)| id).collect();
        if let Some(parent_id) = self.get_node(id).and_then(|n| n.parent) {
            if let Some(parent) = self.get_node_mut(parent_id) {
                parent.children.retain(|&c| c != id);
            }
        }
        if self.root == Some(id) {
            self.root = None;
        }
        for node_id in &doomed {
            self.arena.remove(node_id.0);
        }
        doomed.len()
    }

    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
    }
}

pub struct NodeIterator<'a, P> {
    nodes: &'a NodeArena<P>,
    stack: Vec<NodeId>,
}

impl<'a, P> NodeIterator<'a, P> {
    fn new(nodes: &'a NodeArena<P>, start: Option<NodeId>) -> Self {
        Self {
            nodes,
            stack: start.into_iter().collect(),
        }
    }
}

impl<'a, P> Iterator for NodeIterator<'a, P> {
    type Item = (NodeId, &'a TreeNode<P>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.nodes.get_node(current) {
                // Reverse push keeps left-to-right order
                self.stack.extend(node.children.iter().rev());
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a, P> {
    nodes: &'a NodeArena<P>,
    stack: Vec<(NodeId, bool)>,
}

impl<'a, P> PostOrderIterator<'a, P> {
    fn new(nodes: &'a NodeArena<P>, start: Option<NodeId>) -> Self {
        Self {
            nodes,
            stack: start.map(|id| (id, false)).into_iter().collect(),
        }
    }
}

impl<'a, P> Iterator for PostOrderIterator<'a, P> {
    type Item = (NodeId, &'a TreeNode<P>);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.nodes.get_node(current) {
                if visited {
                    return Some((current, node));
                }
                self.stack.push((current, true));
                for &child in node.children.iter().rev() {
                    self.stack.push((child, false));
                }
            }
        }
        None
    }
}

/// Capability every tree data source implements.
///
/// Implementors decide leafness, labels and where children come from. The
/// provided methods hold the population protocol shared by all variants: fetch a
/// whole batch, attach it, then flip the state.
pub trait TreeManager {
    type Payload;
    /// Discriminated entry-point argument (tree id, anchor step, directory...)
    type RootArgs;

    /// Must be answerable from the payload alone, without fetching children.
    fn is_leaf(&self, payload: &Self::Payload) -> bool;

    fn label(&self, node: &TreeNode<Self::Payload>) -> String;

    fn fetch_children(
        &self,
        payload: &Self::Payload,
    ) -> Result<Vec<Fetched<Self::Payload>>, FetchError>;

    fn root_payload(&self, args: Self::RootArgs) -> Result<(Self::Payload, String), FetchError>;

    /// Fetch and attach the children of `id`.
    ///
    /// Does not look at the population flag; [`LazyTree::child_count`] guards
    /// against repeated population. Malformed children are skipped and counted.
    /// A retryable failure leaves the node pending, any other failure marks it broken.
    fn populate_children(
        &self,
        nodes: &mut NodeArena<Self::Payload>,
        id: NodeId,
    ) -> DomainResult<PopulateReport> {
        let node = nodes.get_node(id).ok_or(DomainError::UnknownNode(id))?;
        let label = self.label(node);
        let batch = match self.fetch_children(&node.payload) {
            Ok(batch) => batch,
            Err(source) => {
                if source.is_retryable() {
                    debug!("populate '{}': retryable failure: {}", label, source);
                } else {
                    warn!("populate '{}': giving up: {}", label, source);
                    nodes.mark_broken(id, source.to_string())?;
                }
                return Err(DomainError::Fetch {
                    node: label,
                    source,
                });
            }
        };

        let mut report = PopulateReport::default();
        for item in batch {
            match item {
                Fetched::Node { payload, name } => {
                    nodes.insert_node(payload, name, Some(id));
                    report.added += 1;
                }
                Fetched::Malformed { reason } => {
                    warn!("populate '{}': skipping malformed child: {}", label, reason);
                    report.skipped += 1;
                }
            }
        }
        nodes.mark_populated(id)?;
        debug!(
            "populate '{}': added={} skipped={}",
            label, report.added, report.skipped
        );
        Ok(report)
    }

    /// Build a fresh root node in `nodes`.
    fn root_node(
        &self,
        nodes: &mut NodeArena<Self::Payload>,
        args: Self::RootArgs,
    ) -> DomainResult<NodeId> {
        let (payload, name) = self.root_payload(args).map_err(DomainError::Root)?;
        Ok(nodes.insert_node(payload, name, None))
    }
}

/// A tree that fetches children on demand through its manager.
pub struct LazyTree<M: TreeManager> {
    manager: M,
    nodes: NodeArena<M::Payload>,
}

impl<M: TreeManager> LazyTree<M> {
    pub fn new(manager: M) -> Self {
        Self {
            manager,
            nodes: NodeArena::new(),
        }
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    pub fn nodes(&self) -> &NodeArena<M::Payload> {
        &self.nodes
    }

    pub fn root(&self) -> Option<NodeId> {
        self.nodes.root()
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode<M::Payload>> {
        self.nodes.get_node(id)
    }

    /// Open a new root, discarding the previously opened tree.
    #[instrument(level = "debug", skip(self, args))]
    pub fn open_root(&mut self, args: M::RootArgs) -> DomainResult<NodeId> {
        self.nodes.clear();
        self.manager.root_node(&mut self.nodes, args)
    }

    /// Number of children, populating the node on first access.
    pub fn child_count(&mut self, id: NodeId) -> DomainResult<usize> {
        let node = self.nodes.get_node(id).ok_or(DomainError::UnknownNode(id))?;
        if node.state == Population::Pending {
            self.manager.populate_children(&mut self.nodes, id)?;
        }
        self.nodes
            .get_node(id)
            .map(|n| n.children.len())
            .ok_or(DomainError::UnknownNode(id))
    }

    /// Children of `id`, populating it on first access.
    pub fn children(&mut self, id: NodeId) -> DomainResult<Vec<NodeId>> {
        self.child_count(id)?;
        self.nodes
            .get_node(id)
            .map(|n| n.children.clone())
            .ok_or(DomainError::UnknownNode(id))
    }

    pub fn child_at(&mut self, id: NodeId, index: usize) -> DomainResult<Option<NodeId>> {
        Ok(self.children(id)?.get(index).copied())
    }

    pub fn is_leaf(&self, id: NodeId) -> DomainResult<bool> {
        let node = self.nodes.get_node(id).ok_or(DomainError::UnknownNode(id))?;
        Ok(self.manager.is_leaf(&node.payload))
    }

    pub fn label(&self, id: NodeId) -> DomainResult<String> {
        let node = self.nodes.get_node(id).ok_or(DomainError::UnknownNode(id))?;
        Ok(self.manager.label(node))
    }

    /// Drop `id` and its subtree.
    pub fn discard(&mut self, id: NodeId) -> usize {
        self.nodes.remove_subtree(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    /// Payload is a numeric id; children of `n` are `n*10+1 ..= n*10+fanout`.
    struct NumberManager {
        fanout: u32,
        calls: Cell<usize>,
        failures: RefCell<VecDeque<FetchError>>,
    }

    impl NumberManager {
        fn new(fanout: u32) -> Self {
            Self {
                fanout,
                calls: Cell::new(0),
                failures: RefCell::new(VecDeque::new()),
            }
        }
    }

    impl TreeManager for NumberManager {
        type Payload = u32;
        type RootArgs = u32;

        fn is_leaf(&self, payload: &u32) -> bool {
            *payload >= 100
        }

        fn label(&self, node: &TreeNode<u32>) -> String {
            format!("{}#{}", node.name, node.payload)
        }

        fn fetch_children(&self, payload: &u32) -> Result<Vec<Fetched<u32>>, FetchError> {
            self.calls.set(self.calls.get() + 1);
            if let Some(err) = self.failures.borrow_mut().pop_front() {
                return Err(err);
            }
            Ok((1..=self.fanout)
                .map(|i| {
                    if i == 2 && *payload == 1 {
                        Fetched::Malformed {
                            reason: "bad".into(),
                        }
                    } else {
                        let id = payload * 10 + i;
                        Fetched::Node {
                            payload: id,
                            name: format!("n{}", id),
                        }
                    }
                })
                .collect())
        }

        fn root_payload(&self, args: u32) -> Result<(u32, String), FetchError> {
            Ok((args, "root".to_string()))
        }
    }

    #[test]
    fn given_pending_node_when_counting_twice_then_fetches_once() {
        let mut tree = LazyTree::new(NumberManager::new(3));
        let root = tree.open_root(5).unwrap();

        assert_eq!(tree.child_count(root).unwrap(), 3);
        assert_eq!(tree.child_count(root).unwrap(), 3);
        assert_eq!(tree.manager().calls.get(), 1);
    }

    #[test]
    fn given_malformed_child_when_populating_then_siblings_survive() {
        let mut tree = LazyTree::new(NumberManager::new(3));
        let root = tree.open_root(1).unwrap();

        let children = tree.children(root).unwrap();
        let labels: Vec<String> = children.iter().map(|&c| tree.label(c).unwrap()).collect();
        assert_eq!(labels, vec!["n11#11", "n13#13"]);
    }

    #[test]
    fn given_label_request_when_node_pending_then_state_unchanged() {
        let mut tree = LazyTree::new(NumberManager::new(2));
        let root = tree.open_root(7).unwrap();

        assert_eq!(tree.label(root).unwrap(), "root#7");
        assert!(!tree.is_leaf(root).unwrap());
        let node = tree.node(root).unwrap();
        assert_eq!(node.state(), &Population::Pending);
        assert!(node.children().is_empty());
        assert_eq!(tree.manager().calls.get(), 0);
    }

    #[test]
    fn given_retryable_failure_when_counting_then_node_can_be_retried() {
        let manager = NumberManager::new(2);
        manager
            .failures
            .borrow_mut()
            .push_back(FetchError::Unavailable("down".into()));
        let mut tree = LazyTree::new(manager);
        let root = tree.open_root(4).unwrap();

        let err = tree.child_count(root).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(tree.node(root).unwrap().state(), &Population::Pending);
        assert!(tree.node(root).unwrap().children().is_empty());

        assert_eq!(tree.child_count(root).unwrap(), 2);
        assert_eq!(tree.manager().calls.get(), 2);
    }

    #[test]
    fn given_permanent_failure_when_counting_then_node_is_broken() {
        let manager = NumberManager::new(2);
        manager
            .failures
            .borrow_mut()
            .push_back(FetchError::Malformed("garbage".into()));
        let mut tree = LazyTree::new(manager);
        let root = tree.open_root(4).unwrap();

        assert!(tree.child_count(root).is_err());
        assert!(matches!(
            tree.node(root).unwrap().state(),
            Population::Broken(_)
        ));
        assert_eq!(tree.child_count(root).unwrap(), 0);
        assert_eq!(tree.manager().calls.get(), 1);
    }

    #[test]
    fn given_failing_sibling_when_populating_then_other_siblings_unaffected() {
        let mut tree = LazyTree::new(NumberManager::new(2));
        let root = tree.open_root(3).unwrap();
        let children = tree.children(root).unwrap();
        tree.manager()
            .failures
            .borrow_mut()
            .push_back(FetchError::Unavailable("flaky".into()));

        assert!(tree.child_count(children[0]).is_err());
        assert_eq!(tree.child_count(children[1]).unwrap(), 2);
        assert_eq!(tree.node(children[0]).unwrap().state(), &Population::Pending);
    }

    #[test]
    fn given_populated_subtree_when_discarding_then_nodes_are_freed() {
        let mut tree = LazyTree::new(NumberManager::new(2));
        let root = tree.open_root(2).unwrap();
        let children = tree.children(root).unwrap();
        tree.children(children[0]).unwrap();
        assert_eq!(tree.nodes().len(), 5);
        assert_eq!(tree.nodes().depth(), 3);

        assert_eq!(tree.discard(children[0]), 3);
        assert_eq!(tree.nodes().len(), 2);
        assert!(tree.node(children[0]).is_none());
        assert_eq!(tree.child_count(root).unwrap(), 1);
    }

    #[test]
    fn given_open_tree_when_opening_new_root_then_old_nodes_are_gone() {
        let mut tree = LazyTree::new(NumberManager::new(2));
        let old = tree.open_root(2).unwrap();
        tree.children(old).unwrap();

        let new = tree.open_root(3).unwrap();
        assert!(tree.node(old).is_none());
        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.root(), Some(new));
    }
}
