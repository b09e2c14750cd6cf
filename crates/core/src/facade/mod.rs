use crate::config::ScanConfig;
use crate::query::{ResourceFinder, TypeFinder};
use std::sync::Arc;
use typescout_api::{ArtifactScope, MetadataReader};

/// Entry point bundling a scope, a header reader and scan settings.
///
/// Every finder handed out evaluates against its own scan cache, so results
/// always reflect the scope as it is when `find` runs.
#[derive(Clone)]
pub struct Discovery {
    scope: Arc<dyn ArtifactScope>,
    reader: Arc<dyn MetadataReader>,
    config: ScanConfig,
}

impl Discovery {
    pub fn new(scope: Arc<dyn ArtifactScope>, reader: Arc<dyn MetadataReader>) -> Self {
        Self {
            scope,
            reader,
            config: ScanConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn scope(&self) -> &Arc<dyn ArtifactScope> {
        &self.scope
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Find artifacts extending or implementing `target`.
    pub fn subtypes_of(&self, target: impl Into<String>) -> TypeFinder {
        TypeFinder::new(target, Arc::clone(&self.scope), Arc::clone(&self.reader))
            .with_config(self.config.clone())
    }

    /// Find artifacts by capability markers alone. At least one marker must
    /// be added with `having` before `find`.
    pub fn types(&self) -> TypeFinder {
        self.subtypes_of(self.reader.root_type())
    }

    pub fn resources(&self) -> ResourceFinder {
        ResourceFinder::new(Arc::clone(&self.scope))
    }
}
