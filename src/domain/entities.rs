//! Domain entities: payloads carried by tree nodes

use std::path::PathBuf;

use crate::domain::step::StepId;

/// Node of a remote OTDB tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtdbNode {
    pub tree_id: i64,
    pub node_id: i64,
    /// Full dotted name, e.g. `LOFAR.ObsSW.Observation`
    pub name: String,
    pub leaf: bool,
    /// Instance index for repeated nodes
    pub index: Option<u32>,
}

impl OtdbNode {
    /// Last component of the dotted name.
    pub fn short_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Display label: short name plus `[index]` when asked for and present.
    pub fn display_name(&self, index_suffix: bool) -> String {
        match self.index {
            Some(index) if index_suffix => format!("{}[{}]", self.short_name(), index),
            _ => self.short_name().to_string(),
        }
    }
}

/// Where a step tree is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAnchor {
    /// The strategy itself: children are the root steps
    Strategy,
    Step(StepId),
}

/// Entry in an observation result directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, index: Option<u32>) -> OtdbNode {
        OtdbNode {
            tree_id: 1,
            node_id: 2,
            name: name.to_string(),
            leaf: false,
            index,
        }
    }

    #[test]
    fn given_dotted_name_when_labelling_then_prefix_stripped() {
        assert_eq!(node("LOFAR.ObsSW.Observation", None).display_name(true), "Observation");
        assert_eq!(node("LOFAR", None).display_name(true), "LOFAR");
    }

    #[test]
    fn given_indexed_node_when_labelling_then_suffix_follows_setting() {
        let n = node("LOFAR.PIC.Station", Some(3));
        assert_eq!(n.display_name(true), "Station[3]");
        assert_eq!(n.display_name(false), "Station");
    }
}
