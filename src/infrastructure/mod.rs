//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements I/O boundary traits, loads tree dumps and wires up services.

pub mod di;
pub mod dump;
pub mod error;
pub mod traits;

pub use error::{InfraError, InfraResult, SourceError};
