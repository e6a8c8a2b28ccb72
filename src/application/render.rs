//! Rendering of lazy trees as text trees.

use termtree::Tree;
use tracing::{debug, instrument};

use crate::domain::{DomainError, DomainResult, LazyTree, NodeId, TreeManager};

/// Placeholder shown instead of children that could not be loaded.
pub fn load_failure_label(err: &DomainError) -> String {
    format!("<could not load: {}>", err)
}

/// Expand `id` down to `max_depth` levels and convert it to a text tree.
///
/// Nodes are populated on the way, exactly like a tree widget expanding them.
/// A fetch failure becomes a placeholder leaf; the walk continues with siblings.
#[instrument(level = "debug", skip(tree))]
pub fn expand<M: TreeManager>(
    tree: &mut LazyTree<M>,
    id: NodeId,
    max_depth: usize,
) -> DomainResult<Tree<String>> {
    let mut rendered = Tree::new(tree.label(id)?);
    if max_depth == 0 || tree.is_leaf(id)? {
        return Ok(rendered);
    }

    match tree.children(id) {
        Ok(children) => {
            for child in children {
                rendered.push(expand(tree, child, max_depth - 1)?);
            }
        }
        Err(err @ DomainError::Fetch { .. }) => {
            debug!("expand: {}", err);
            rendered.push(Tree::new(load_failure_label(&err)));
        }
        Err(err) => return Err(err),
    }
    Ok(rendered)
}
