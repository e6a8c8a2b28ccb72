//! Tree manager browsing the step forest of a shared strategy.

use std::sync::RwLockReadGuard;

use crate::domain::{
    Fetched, FetchError, SharedStrategy, StepAnchor, Strategy, TreeManager, TreeNode,
};

/// Entry point of a step tree: a display title and where it is anchored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRoot {
    pub title: String,
    pub anchor: StepAnchor,
}

pub struct StepTreeManager {
    strategy: SharedStrategy,
}

impl StepTreeManager {
    pub fn new(strategy: SharedStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> &SharedStrategy {
        &self.strategy
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Strategy>, FetchError> {
        self.strategy
            .read()
            .map_err(|_| FetchError::Corrupted("strategy lock poisoned".into()))
    }
}

impl TreeManager for StepTreeManager {
    type Payload = StepAnchor;
    type RootArgs = StepRoot;

    fn is_leaf(&self, payload: &StepAnchor) -> bool {
        let Ok(strategy) = self.read() else {
            return true;
        };
        match payload {
            StepAnchor::Strategy => strategy.roots().is_empty(),
            StepAnchor::Step(id) => strategy.step(*id).map_or(true, |s| s.is_leaf()),
        }
    }

    /// Roots carry their title, steps render as `Name (OPERATION)`.
    fn label(&self, node: &TreeNode<StepAnchor>) -> String {
        let StepAnchor::Step(id) = node.payload else {
            return node.name.clone();
        };
        if node.parent().is_none() {
            return node.name.clone();
        }
        let Ok(strategy) = self.read() else {
            return node.name.clone();
        };
        match strategy.step(id) {
            Some(step) if step.operation_name.is_empty() => step.name().to_string(),
            Some(step) => format!("{} ({})", step.name(), step.operation_name),
            None => node.name.clone(),
        }
    }

    fn fetch_children(&self, payload: &StepAnchor) -> Result<Vec<Fetched<StepAnchor>>, FetchError> {
        let strategy = self.read()?;
        let owner = match payload {
            StepAnchor::Strategy => None,
            StepAnchor::Step(id) => Some(*id),
        };
        let children = strategy
            .children_of(owner)
            .ok_or_else(|| FetchError::Malformed(format!("step {:?} no longer exists", owner)))?;
        Ok(children
            .iter()
            .map(|&id| match strategy.step(id) {
                Some(step) => Fetched::Node {
                    payload: StepAnchor::Step(id),
                    name: step.name().to_string(),
                },
                None => Fetched::Malformed {
                    reason: format!("dangling step {:?}", id),
                },
            })
            .collect())
    }

    fn root_payload(&self, args: StepRoot) -> Result<(StepAnchor, String), FetchError> {
        if let StepAnchor::Step(id) = args.anchor {
            if self.read()?.step(id).is_none() {
                return Err(FetchError::Malformed(format!("step {:?} no longer exists", id)));
            }
        }
        Ok((args.anchor, args.title))
    }
}
