//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::Path;
use std::sync::Arc;

use crate::application::services::{BrowseService, StrategyService};
use crate::config::Settings;
use crate::infrastructure::dump::DumpTreeSource;
use crate::infrastructure::traits::{FileSystem, RealFileSystem, RemoteTreeSource};
use crate::infrastructure::InfraResult;

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    pub strategy_service: StrategyService,
    pub browse_service: BrowseService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);
        let strategy_service =
            StrategyService::new(Arc::clone(&fs)).with_warn_on_skip(settings.cascade.warn_on_skip);
        let browse_service = BrowseService::new(Arc::clone(&fs), settings.browse_options());

        Self {
            settings,
            fs,
            strategy_service,
            browse_service,
        }
    }

    /// Open the tree dump at `path`, or the default dump in the data directory.
    pub fn remote_source(&self, path: Option<&Path>) -> InfraResult<Arc<dyn RemoteTreeSource>> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self.settings.default_dump_path(),
        };
        let source = DumpTreeSource::load(self.fs.as_ref(), &path)?;
        Ok(Arc::new(source))
    }
}
