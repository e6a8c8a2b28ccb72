//! Strategy: owner of the step forest and its cascading edit engine.
//!
//! A step is addressed by the names on the path from a root to it, never by
//! identity. The same template step may be instantiated in several parallel
//! branches; every structural edit is replayed in each branch whose parent
//! carries the target name, so the branches keep the same shape while their
//! attributes stay independent.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use generational_arena::Arena;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::step::{Step, StepId, StepTemplate};

/// Strategy shared between an editor and a tree manager. One coarse lock per cascade.
pub type SharedStrategy = Arc<RwLock<Strategy>>;

/// Outcome of one cascading edit.
///
/// `skipped` counts branches whose sibling list did not match the requested
/// index/name and were left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub applied: usize,
    pub skipped: usize,
}

impl CascadeReport {
    pub fn is_noop(&self) -> bool {
        self.applied == 0
    }
}

impl fmt::Display for CascadeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} branch(es) edited, {} skipped", self.applied, self.skipped)
    }
}

/// Steps sharing an ancestor-name path whose child names disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParityViolation {
    pub path: Vec<String>,
    /// Distinct child-name sequences found under `path`
    pub variants: Vec<Vec<String>>,
}

impl fmt::Display for ParityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            self.path.join("/"),
            self.variants
                .iter()
                .map(|v| format!("[{}]", v.join(", ")))
                .join(" vs ")
        )
    }
}

/// Owner of the step forest.
#[derive(Debug, Default)]
pub struct Strategy {
    steps: Arena<Step>,
    roots: Vec<StepId>,
}

impl Strategy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_templates(templates: &[StepTemplate]) -> Self {
        let mut strategy = Self::new();
        for template in templates {
            let id = strategy.instantiate(template, None);
            strategy.roots.push(id);
        }
        strategy
    }

    /// Detached copy of the whole forest.
    pub fn to_templates(&self) -> Vec<StepTemplate> {
        self.roots
            .iter()
            .filter_map(|&id| self.template_of(id))
            .collect()
    }

    /// Detached copy of the subtree at `id`.
    pub fn template_of(&self, id: StepId) -> Option<StepTemplate> {
        let step = self.step(id)?;
        Some(StepTemplate {
            name: step.name.clone(),
            operation_name: step.operation_name.clone(),
            attributes: step.attributes.clone(),
            children: step
                .children
                .iter()
                .filter_map(|&c| self.template_of(c))
                .collect(),
        })
    }

    pub fn share(self) -> SharedStrategy {
        Arc::new(RwLock::new(self))
    }

    pub fn roots(&self) -> &[StepId] {
        &self.roots
    }

    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.get(id.0)
    }

    /// Mutable access for attribute edits. Shape stays owned by the strategy.
    pub fn step_mut(&mut self, id: StepId) -> Option<&mut Step> {
        self.steps.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Children of `owner`, or the root list for `None`.
    pub fn children_of(&self, owner: Option<StepId>) -> Option<&[StepId]> {
        match owner {
            None => Some(&self.roots),
            Some(id) => self.step(id).map(|s| s.children.as_slice()),
        }
    }

    pub fn child_names(&self, owner: Option<StepId>) -> Vec<&str> {
        self.children_of(owner)
            .unwrap_or_default()
            .iter()
            .filter_map(|&c| self.step(c))
            .map(Step::name)
            .collect()
    }

    /// Pre-order walk over the forest.
    pub fn iter(&self) -> impl Iterator<Item = (StepId, &Step)> + '_ {
        let mut stack: Vec<StepId> = self.roots.iter().rev().copied().collect();
        std::iter::from_fn(move || {
            while let Some(id) = stack.pop() {
                if let Some(step) = self.step(id) {
                    stack.extend(step.children.iter().rev());
                    return Some((id, step));
                }
            }
            None
        })
    }

    /// All steps named `name`, in pre-order.
    pub fn find_by_name(&self, name: &str) -> Vec<StepId> {
        self.iter()
            .filter(|(_, s)| s.name == name)
            .map(|(id, _)| id)
            .collect()
    }

    /// Names from the root down to `id`, inclusive.
    pub fn path_of(&self, id: StepId) -> DomainResult<Vec<String>> {
        let mut path = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            let step = self.step(cur).ok_or(DomainError::UnknownStep(cur))?;
            path.push(step.name.clone());
            current = step.parent;
        }
        path.reverse();
        Ok(path)
    }

    /// Parent name (None at root level) and sibling index of `id`.
    pub fn position_of(&self, id: StepId) -> DomainResult<(Option<String>, usize)> {
        let step = self.step(id).ok_or(DomainError::UnknownStep(id))?;
        let parent_name = match step.parent {
            Some(p) => Some(
                self.step(p)
                    .ok_or(DomainError::UnknownStep(p))?
                    .name
                    .clone(),
            ),
            None => None,
        };
        let index = self
            .children_of(step.parent)
            .and_then(|siblings| siblings.iter().position(|&s| s == id))
            .ok_or(DomainError::UnknownStep(id))?;
        Ok((parent_name, index))
    }

    /// Append a copy of `new_child` under every step named `parent_name`.
    ///
    /// With `None` the copy goes to the root list only.
    #[instrument(level = "debug", skip(self, new_child), fields(child = %new_child.name))]
    pub fn cascading_step_insertion(
        &mut self,
        parent_name: Option<&str>,
        new_child: &StepTemplate,
    ) -> CascadeReport {
        let mut report = CascadeReport::default();
        // Targets are fixed before mutating so fresh copies are never targets themselves.
        for owner in self.owners(parent_name) {
            let id = self.instantiate(new_child, owner);
            if let Some(siblings) = self.siblings_mut(owner) {
                siblings.push(id);
                report.applied += 1;
            }
        }
        debug!("insertion: {}", report);
        report
    }

    /// Remove the child at `index` named `child_name` under every step named `parent_name`.
    ///
    /// A branch whose child at `index` is missing or carries another name is left as is.
    #[instrument(level = "debug", skip(self))]
    pub fn cascading_step_deletion(
        &mut self,
        parent_name: Option<&str>,
        child_name: &str,
        index: usize,
    ) -> CascadeReport {
        let mut report = CascadeReport::default();
        for owner in self.owners(parent_name) {
            // An earlier deletion may have freed this owner
            if owner.is_some_and(|id| self.step(id).is_none()) {
                debug!("deletion: skipping {:?}, removed earlier in this cascade", owner);
                report.skipped += 1;
                continue;
            }
            if !self.child_matches(owner, index, child_name) {
                debug!("deletion: skipping {:?}, no '{}' at {}", owner, child_name, index);
                report.skipped += 1;
                continue;
            }
            if let Some(siblings) = self.siblings_mut(owner) {
                let removed = siblings.remove(index);
                self.free_subtree(removed);
                report.applied += 1;
            }
        }
        debug!("deletion: {}", report);
        report
    }

    /// Move the child named `child_name` from `old_index` to `new_index` under
    /// every step named `parent_name`.
    ///
    /// `new_index` is a position in the list after removal.
    #[instrument(level = "debug", skip(self))]
    pub fn cascading_step_move(
        &mut self,
        parent_name: Option<&str>,
        child_name: &str,
        old_index: usize,
        new_index: usize,
    ) -> CascadeReport {
        let mut report = CascadeReport::default();
        for owner in self.owners(parent_name) {
            let fits = self
                .children_of(owner)
                .is_some_and(|siblings| new_index < siblings.len());
            if !fits || !self.child_matches(owner, old_index, child_name) {
                debug!(
                    "move: skipping {:?}, cannot move '{}' {} -> {}",
                    owner, child_name, old_index, new_index
                );
                report.skipped += 1;
                continue;
            }
            if let Some(siblings) = self.siblings_mut(owner) {
                let moved = siblings.remove(old_index);
                siblings.insert(new_index, moved);
                report.applied += 1;
            }
        }
        debug!("move: {}", report);
        report
    }

    /// Cascading deletion addressed by a concrete step.
    pub fn delete_step(&mut self, id: StepId) -> DomainResult<CascadeReport> {
        let (parent_name, index) = self.position_of(id)?;
        let name = self.step(id).ok_or(DomainError::UnknownStep(id))?.name.clone();
        Ok(self.cascading_step_deletion(parent_name.as_deref(), &name, index))
    }

    /// Cascading move addressed by a concrete step.
    pub fn move_step(&mut self, id: StepId, new_index: usize) -> DomainResult<CascadeReport> {
        let (parent_name, index) = self.position_of(id)?;
        let name = self.step(id).ok_or(DomainError::UnknownStep(id))?.name.clone();
        Ok(self.cascading_step_move(parent_name.as_deref(), &name, index, new_index))
    }

    /// Groups of same-path steps whose child-name sequences differ.
    pub fn parity_violations(&self) -> Vec<ParityViolation> {
        let mut groups: BTreeMap<Vec<String>, Vec<Vec<String>>> = BTreeMap::new();
        for (id, step) in self.iter() {
            let Ok(path) = self.path_of(id) else { continue };
            let names = step
                .children
                .iter()
                .filter_map(|&c| self.step(c))
                .map(|c| c.name.clone())
                .collect();
            groups.entry(path).or_default().push(names);
        }
        groups
            .into_iter()
            .filter_map(|(path, sequences)| {
                let variants: Vec<Vec<String>> = sequences.into_iter().unique().collect();
                (variants.len() > 1).then_some(ParityViolation { path, variants })
            })
            .collect()
    }

    /// Sibling lists addressed by `parent_name`: the root list, or each matching step.
    fn owners(&self, parent_name: Option<&str>) -> Vec<Option<StepId>> {
        match parent_name {
            None => vec![None],
            Some(name) => self.find_by_name(name).into_iter().map(Some).collect(),
        }
    }

    fn child_matches(&self, owner: Option<StepId>, index: usize, name: &str) -> bool {
        self.children_of(owner)
            .and_then(|siblings| siblings.get(index))
            .and_then(|&c| self.step(c))
            .is_some_and(|c| c.name == name)
    }

    fn siblings_mut(&mut self, owner: Option<StepId>) -> Option<&mut Vec<StepId>> {
        match owner {
            None => Some(&mut self.roots),
            Some(id) => self.steps.get_mut(id.0).map(|s| &mut s.children),
        }
    }

    fn instantiate(&mut self, template: &StepTemplate, parent: Option<StepId>) -> StepId {
        let id = StepId(self.steps.insert(Step {
            name: template.name.clone(),
            operation_name: template.operation_name.clone(),
            attributes: template.attributes.clone(),
            parent,
            children: Vec::new(),
        }));
        let children: Vec<StepId> = template
            .children
            .iter()
            .map(|child| self.instantiate(child, Some(id)))
            .collect();
        if let Some(step) = self.steps.get_mut(id.0) {
            step.children = children;
        }
        id
    }

    fn free_subtree(&mut self, id: StepId) {
        if let Some(step) = self.steps.remove(id.0) {
            for child in step.children {
                self.free_subtree(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(strategy: &Strategy, owner: Option<StepId>) -> Vec<String> {
        strategy
            .child_names(owner)
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn roots(list: &[&str]) -> Strategy {
        let templates: Vec<StepTemplate> = list.iter().map(|n| StepTemplate::new(*n)).collect();
        Strategy::from_templates(&templates)
    }

    #[test]
    fn given_null_parent_when_inserting_then_appends_to_roots_only() {
        let mut strategy = Strategy::from_templates(&[
            StepTemplate::new("A").with_child(StepTemplate::new("X")),
        ]);

        let report = strategy.cascading_step_insertion(None, &StepTemplate::new("A"));

        assert_eq!(report.applied, 1);
        assert_eq!(names(&strategy, None), vec!["A", "A"]);
        let first = strategy.roots()[0];
        assert_eq!(names(&strategy, Some(first)), vec!["X"]);
    }

    #[test]
    fn given_mismatched_name_at_index_when_deleting_then_nothing_removed() {
        let mut strategy = roots(&["A", "B", "A"]);

        let report = strategy.cascading_step_deletion(None, "B", 0);

        assert_eq!(report, CascadeReport { applied: 0, skipped: 1 });
        assert_eq!(names(&strategy, None), vec!["A", "B", "A"]);
    }

    #[test]
    fn given_out_of_range_index_when_deleting_then_branch_skipped() {
        let mut strategy = roots(&["A"]);
        let report = strategy.cascading_step_deletion(None, "A", 5);
        assert_eq!(report.skipped, 1);
        assert_eq!(strategy.len(), 1);
    }

    #[test]
    fn given_root_list_when_moving_first_to_last_then_reordered() {
        let mut strategy = roots(&["A", "B", "C"]);

        let report = strategy.cascading_step_move(None, "A", 0, 2);

        assert_eq!(report.applied, 1);
        assert_eq!(names(&strategy, None), vec!["B", "C", "A"]);
    }

    #[test]
    fn given_target_past_end_when_moving_then_branch_unchanged() {
        let mut strategy = roots(&["A", "B", "C"]);
        let report = strategy.cascading_step_move(None, "A", 0, 3);
        assert_eq!(report.skipped, 1);
        assert_eq!(names(&strategy, None), vec!["A", "B", "C"]);
    }

    #[test]
    fn given_deleted_subtree_when_looking_up_old_ids_then_they_are_gone() {
        let mut strategy = Strategy::from_templates(&[StepTemplate::new("A")
            .with_child(StepTemplate::new("B").with_child(StepTemplate::new("C")))]);
        let a = strategy.roots()[0];
        let b = strategy.step(a).unwrap().children()[0];
        let c = strategy.step(b).unwrap().children()[0];

        let report = strategy.delete_step(b).unwrap();

        assert_eq!(report.applied, 1);
        assert!(strategy.step(b).is_none());
        assert!(strategy.step(c).is_none());
        assert_eq!(strategy.len(), 1);
    }

    #[test]
    fn given_nested_step_when_resolving_path_and_position_then_names_follow_parents() {
        let strategy = Strategy::from_templates(&[StepTemplate::new("Solve")
            .with_child(StepTemplate::new("Predict"))
            .with_child(StepTemplate::new("Correct"))]);
        let solve = strategy.roots()[0];
        let correct = strategy.step(solve).unwrap().children()[1];

        assert_eq!(strategy.path_of(correct).unwrap(), vec!["Solve", "Correct"]);
        assert_eq!(
            strategy.position_of(correct).unwrap(),
            (Some("Solve".to_string()), 1)
        );
        assert_eq!(strategy.position_of(solve).unwrap(), (None, 0));
    }

    #[test]
    fn given_self_named_child_when_inserting_then_copies_are_not_retargeted() {
        let mut strategy = roots(&["A", "A"]);

        let report = strategy.cascading_step_insertion(Some("A"), &StepTemplate::new("A"));

        assert_eq!(report.applied, 2);
        assert_eq!(strategy.len(), 4);
    }

    #[test]
    fn given_diverged_branches_when_checking_parity_then_violation_reported() {
        let strategy = Strategy::from_templates(&[
            StepTemplate::new("Cal").with_child(StepTemplate::new("Solve")),
            StepTemplate::new("Cal").with_child(StepTemplate::new("Predict")),
        ]);

        let violations = strategy.parity_violations();

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, vec!["Cal"]);
        assert_eq!(violations[0].variants.len(), 2);
    }
}
