//! bbstree: lazy tree browsing and cascading step editing for observation strategies
//!
//! - `domain`: lazy tree nodes, the `TreeManager` capability and the step forest
//! - `application`: tree manager variants, rendering and services
//! - `infrastructure`: filesystem, tree dump source, DI container
//! - `cli`: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
