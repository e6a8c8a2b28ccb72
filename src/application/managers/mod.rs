//! Tree manager variants, one per data source.

pub mod remote;
pub mod result;
pub mod step;

pub use remote::{RemoteRoot, RemoteTreeManager};
pub use result::ResultTreeManager;
pub use step::{StepRoot, StepTreeManager};
