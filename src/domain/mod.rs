//! Domain layer: lazy trees, steps and the cascading edit engine
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod entities;
pub mod error;
pub mod lazy;
pub mod step;
pub mod strategy;

pub use entities::{OtdbNode, ResultEntry, StepAnchor};
pub use error::{DomainError, DomainResult, FetchError};
pub use lazy::{
    Fetched, LazyTree, NodeArena, NodeId, PopulateReport, Population, TreeManager, TreeNode,
};
pub use step::{OperationAttributes, Step, StepId, StepTemplate};
pub use strategy::{CascadeReport, ParityViolation, SharedStrategy, Strategy};
