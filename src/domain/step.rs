//! Steps of an observation strategy.

use std::collections::BTreeMap;

use generational_arena::Index;
use serde::{Deserialize, Serialize};

/// Handle of a step inside its [`Strategy`](crate::domain::Strategy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepId(pub(crate) Index);

/// Free-form operation attributes with unique keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationAttributes(BTreeMap<String, String>);

impl OperationAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, returning the previous value.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for OperationAttributes {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OperationAttributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A named node of the operation tree.
///
/// Shape (`parent`, `children`) is only changed by the owning strategy; the
/// operation name and attributes are free to edit per instance.
#[derive(Debug, Clone)]
pub struct Step {
    pub(crate) name: String,
    pub operation_name: String,
    pub attributes: OperationAttributes,
    pub(crate) parent: Option<StepId>,
    pub(crate) children: Vec<StepId>,
}

impl Step {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lookup-only back reference.
    pub fn parent(&self) -> Option<StepId> {
        self.parent
    }

    pub fn children(&self) -> &[StepId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Detached value form of a step subtree.
///
/// Argument of cascading insertions (each branch gets its own copy) and the
/// persisted shape of a strategy document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTemplate {
    pub name: String,
    #[serde(default, rename = "operation", skip_serializing_if = "String::is_empty")]
    pub operation_name: String,
    #[serde(default, skip_serializing_if = "OperationAttributes::is_empty")]
    pub attributes: OperationAttributes,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StepTemplate>,
}

impl StepTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation_name = operation.into();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.add(key, value);
        self
    }

    pub fn with_child(mut self, child: StepTemplate) -> Self {
        self.children.push(child);
        self
    }

    /// Number of steps in this subtree, including itself.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(StepTemplate::size).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_existing_key_when_adding_then_previous_value_returned() {
        let mut attrs = OperationAttributes::new();
        assert_eq!(attrs.add("MaxIter", "10"), None);
        assert_eq!(attrs.add("MaxIter", "20"), Some("10".to_string()));
        assert_eq!(attrs.get("MaxIter"), Some("20"));
        assert_eq!(attrs.len(), 1);
    }

    #[test]
    fn given_attributes_when_removing_and_clearing_then_store_empties() {
        let mut attrs: OperationAttributes = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(attrs.remove("a"), Some("1".to_string()));
        assert!(!attrs.contains("a"));
        attrs.clear();
        assert!(attrs.is_empty());
    }

    #[test]
    fn given_nested_template_when_sizing_then_counts_all_steps() {
        let template = StepTemplate::new("Solve")
            .with_operation("SOLVE")
            .with_child(StepTemplate::new("Predict"))
            .with_child(StepTemplate::new("Subtract").with_child(StepTemplate::new("Correct")));
        assert_eq!(template.size(), 4);
    }
}
