use super::pattern::Pattern;
use super::resolver::SubtypeResolver;
use crate::cache::ScanCache;
use crate::config::ScanConfig;
use crate::scan::{Enumerator, Scanner};
use indexmap::IndexSet;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use typescout_api::{
    ArtifactHandle, ArtifactIdentity, ArtifactScope, DiscoveryError, MetadataReader,
    MetadataRecord, Result,
};

/// How required capability markers combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Every required marker must be present.
    #[default]
    All,
    /// One required marker is enough.
    Any,
}

impl MatchMode {
    /// Markers are checked on the artifact's own declaration only.
    /// No required markers means everything matches.
    pub fn accepts(self, record: &MetadataRecord, required: &IndexSet<String>) -> bool {
        if required.is_empty() {
            return true;
        }
        match self {
            MatchMode::All => required.iter().all(|m| record.has_marker(m)),
            MatchMode::Any => required.iter().any(|m| record.has_marker(m)),
        }
    }
}

/// Immutable, validated discovery request.
#[derive(Clone)]
pub struct QuerySpec {
    target: String,
    markers: IndexSet<String>,
    mode: MatchMode,
    namespaces: Vec<String>,
    locations: Vec<Pattern>,
    scope: Arc<dyn ArtifactScope>,
}

impl QuerySpec {
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn markers(&self) -> &IndexSet<String> {
        &self.markers
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    pub fn locations(&self) -> &[Pattern] {
        &self.locations
    }

    pub fn scope(&self) -> &Arc<dyn ArtifactScope> {
        &self.scope
    }

    /// Run Enumerator → Scanner → Resolver → marker filter against a fresh
    /// scan cache, then resolve the survivors to handles.
    pub fn evaluate(
        &self,
        reader: &dyn MetadataReader,
        config: &ScanConfig,
    ) -> Result<BTreeSet<ArtifactHandle>> {
        let start = Instant::now();
        let scope = self.scope.as_ref();
        let root = reader.root_type();

        let candidates = Enumerator::new(scope)
            .include_nested(config.include_nested)
            .list(&self.namespaces, &self.locations)?;

        let cache = ScanCache::new();
        Scanner::new(scope, reader, &cache)
            .with_location_filter(&self.locations, config.filter_ancestors)
            .with_workers(config.workers())
            .scan(candidates)?;

        let records = cache.records();
        let matched: HashSet<ArtifactIdentity> = if self.target == root {
            records
                .iter()
                .filter(|(_, record)| self.mode.accepts(record, &self.markers))
                .map(|(identity, _)| identity.clone())
                .collect()
        } else {
            SubtypeResolver::new(&records, root)
                .subtypes_of(&self.target)?
                .into_iter()
                .filter(|identity| {
                    records
                        .get(identity)
                        .is_some_and(|record| self.mode.accepts(record, &self.markers))
                })
                .collect()
        };

        let handles: BTreeSet<ArtifactHandle> = matched
            .into_iter()
            .filter_map(|identity| match scope.locate(&identity) {
                Some(location) => Some(ArtifactHandle { identity, location }),
                None => {
                    debug!("{}", DiscoveryError::TypeResolution { identity });
                    None
                }
            })
            .collect();

        info!(
            "Query for {} in {} matched {} of {} scanned artifacts in {:?}",
            self.target,
            scope.name(),
            handles.len(),
            records.len(),
            start.elapsed()
        );
        Ok(handles)
    }
}

impl fmt::Debug for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySpec")
            .field("target", &self.target)
            .field("markers", &self.markers)
            .field("mode", &self.mode)
            .field("namespaces", &self.namespaces)
            .field(
                "locations",
                &self.locations.iter().map(Pattern::as_str).collect::<Vec<_>>(),
            )
            .field("scope", &self.scope.name())
            .finish()
    }
}

/// Fluent builder for a type query.
///
/// ```ignore
/// let plugins = discovery
///     .subtypes_of("com.acme.Plugin")
///     .within("com.acme.plugins")
///     .having("com.acme.Enabled")
///     .find()?;
/// ```
#[derive(Clone)]
pub struct TypeFinder {
    target: String,
    markers: IndexSet<String>,
    mode: MatchMode,
    namespaces: IndexSet<String>,
    locations: IndexSet<String>,
    scope: Arc<dyn ArtifactScope>,
    reader: Arc<dyn MetadataReader>,
    config: ScanConfig,
}

impl TypeFinder {
    pub fn new(
        target: impl Into<String>,
        scope: Arc<dyn ArtifactScope>,
        reader: Arc<dyn MetadataReader>,
    ) -> Self {
        Self {
            target: target.into(),
            markers: IndexSet::new(),
            mode: MatchMode::All,
            namespaces: IndexSet::new(),
            locations: IndexSet::new(),
            scope,
            reader,
            config: ScanConfig::default(),
        }
    }

    /// Only consider artifacts in this namespace (recursively).
    pub fn within(mut self, namespace: impl Into<String>) -> Self {
        self.namespaces.insert(namespace.into());
        self
    }

    /// Only consider artifacts whose location contains a match of `pattern`.
    pub fn by_url(mut self, pattern: impl Into<String>) -> Self {
        self.locations.insert(pattern.into());
        self
    }

    /// Require a capability marker on the artifact's own declaration.
    pub fn having(mut self, marker: impl Into<String>) -> Self {
        self.markers.insert(marker.into());
        self
    }

    /// One of the required markers suffices.
    pub fn any(mut self) -> Self {
        self.mode = MatchMode::Any;
        self
    }

    /// All required markers must be present (the default).
    pub fn all(mut self) -> Self {
        self.mode = MatchMode::All;
        self
    }

    /// Evaluate against another scope.
    pub fn using(mut self, scope: Arc<dyn ArtifactScope>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    /// Freeze the builder into a validated [`QuerySpec`].
    pub fn spec(&self) -> Result<QuerySpec> {
        if self.target == self.reader.root_type() && self.markers.is_empty() {
            return Err(DiscoveryError::InvalidQuery(format!(
                "querying {} needs at least one capability marker",
                self.target
            )));
        }
        Ok(QuerySpec {
            target: self.target.clone(),
            markers: self.markers.clone(),
            mode: self.mode,
            namespaces: self.namespaces.iter().cloned().collect(),
            locations: Pattern::compile_all(&self.locations)?,
            scope: Arc::clone(&self.scope),
        })
    }

    /// Build the query and evaluate it.
    pub fn find(&self) -> Result<BTreeSet<ArtifactHandle>> {
        let spec = self.spec()?;
        debug!("Evaluating {:?}", spec);
        spec.evaluate(self.reader.as_ref(), &self.config)
    }
}

impl fmt::Debug for TypeFinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeFinder")
            .field("target", &self.target)
            .field("markers", &self.markers)
            .field("mode", &self.mode)
            .field("namespaces", &self.namespaces)
            .field("locations", &self.locations)
            .field("scope", &self.scope.name())
            .field("config", &self.config)
            .finish()
    }
}
