//! Application services

pub mod browse;
pub mod strategy;

pub use browse::{BrowseOptions, BrowseService};
pub use strategy::{StrategyDocument, StrategyService};
