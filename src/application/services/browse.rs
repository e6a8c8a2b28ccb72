//! Tree browsing service
//!
//! Opens a lazy tree on one of the data sources and renders the part a user
//! would see after expanding it down to a depth limit.

use std::path::Path;
use std::sync::Arc;

use termtree::Tree;
use tracing::debug;

use crate::application::managers::{
    RemoteRoot, RemoteTreeManager, ResultTreeManager, StepRoot, StepTreeManager,
};
use crate::application::render::expand;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DomainError, LazyTree, SharedStrategy, StepAnchor};
use crate::infrastructure::traits::{FileSystem, RemoteTreeSource};

/// Browsing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowseOptions {
    pub max_depth: usize,
    pub fetch_depth: u32,
    pub index_suffix: bool,
}

impl Default for BrowseOptions {
    fn default() -> Self {
        Self {
            max_depth: 3,
            fetch_depth: 1,
            index_suffix: true,
        }
    }
}

pub struct BrowseService {
    fs: Arc<dyn FileSystem>,
    options: BrowseOptions,
}

impl BrowseService {
    pub fn new(fs: Arc<dyn FileSystem>, options: BrowseOptions) -> Self {
        Self { fs, options }
    }

    pub fn options(&self) -> &BrowseOptions {
        &self.options
    }

    /// Browse a remote OTDB tree from `root`.
    pub fn browse_remote(
        &self,
        source: Arc<dyn RemoteTreeSource>,
        root: RemoteRoot,
        max_depth: Option<usize>,
    ) -> ApplicationResult<Tree<String>> {
        debug!("browse_remote: {:?}", root);
        let manager = RemoteTreeManager::new(source)
            .with_fetch_depth(self.options.fetch_depth)
            .with_index_suffix(self.options.index_suffix);
        let mut tree = LazyTree::new(manager);
        let root_id = tree.open_root(root)?;
        Ok(expand(
            &mut tree,
            root_id,
            max_depth.unwrap_or(self.options.max_depth),
        )?)
    }

    /// Browse an observation result directory.
    pub fn browse_results(
        &self,
        dir: &Path,
        max_depth: Option<usize>,
    ) -> ApplicationResult<Tree<String>> {
        debug!("browse_results: {}", dir.display());
        let mut tree = LazyTree::new(ResultTreeManager::new(Arc::clone(&self.fs)));
        let root_id = tree.open_root(dir.to_path_buf())?;
        Ok(expand(
            &mut tree,
            root_id,
            max_depth.unwrap_or(self.options.max_depth),
        )?)
    }

    /// Browse the step forest of `strategy`, optionally anchored at the first step named `from`.
    pub fn browse_strategy(
        &self,
        strategy: SharedStrategy,
        title: &str,
        from: Option<&str>,
        max_depth: Option<usize>,
    ) -> ApplicationResult<Tree<String>> {
        let root = match from {
            None => StepRoot {
                title: title.to_string(),
                anchor: StepAnchor::Strategy,
            },
            Some(name) => {
                let guard = strategy
                    .read()
                    .map_err(|_| DomainError::LockPoisoned)?;
                let id = guard
                    .find_by_name(name)
                    .first()
                    .copied()
                    .ok_or_else(|| ApplicationError::StepNotFound(name.to_string()))?;
                let title = guard.path_of(id)?.join("/");
                StepRoot {
                    title,
                    anchor: StepAnchor::Step(id),
                }
            }
        };
        debug!("browse_strategy: {}", root.title);

        let mut tree = LazyTree::new(StepTreeManager::new(strategy));
        let root_id = tree.open_root(root)?;
        Ok(expand(&mut tree, root_id, max_depth.unwrap_or(usize::MAX))?)
    }
}
