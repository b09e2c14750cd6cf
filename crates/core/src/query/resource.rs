use super::pattern::{MatchStyle, Pattern};
use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use tracing::debug;
use typescout_api::{ArtifactLocation, ArtifactScope, DiscoveryError, Result};

/// Validated resource lookup.
#[derive(Debug, Clone)]
pub struct ResourceQuerySpec {
    names: Vec<Pattern>,
    locations: Vec<Pattern>,
    style: MatchStyle,
}

impl ResourceQuerySpec {
    pub fn new(names: Vec<Pattern>, locations: Vec<Pattern>, style: MatchStyle) -> Result<Self> {
        if names.is_empty() {
            return Err(DiscoveryError::InvalidQuery(
                "resource lookup needs at least one name pattern".to_string(),
            ));
        }
        Ok(Self {
            names,
            locations,
            style,
        })
    }

    pub fn style(&self) -> MatchStyle {
        self.style
    }

    /// A resource qualifies when its name satisfies every name pattern and,
    /// if location patterns exist, its location satisfies at least one.
    pub fn evaluate(&self, scope: &dyn ArtifactScope) -> Result<Vec<ArtifactLocation>> {
        let resources = scope.resources().map_err(|e| {
            DiscoveryError::Enumeration(format!("resources of {}: {e}", scope.name()))
        })?;

        // Same resource name across several entries yields several locations.
        let mut by_name: IndexMap<&str, Vec<&ArtifactLocation>> = IndexMap::new();
        for resource in &resources {
            by_name
                .entry(resource.name.as_str())
                .or_default()
                .push(&resource.location);
        }

        let mut found: IndexSet<ArtifactLocation> = IndexSet::new();
        for (name, locations) in by_name {
            if !self.names.iter().all(|p| p.is_match(name, self.style)) {
                continue;
            }
            for location in locations {
                if self.location_admitted(location) {
                    found.insert(location.clone());
                }
            }
        }

        debug!(
            "Resource lookup in {} matched {} of {} resources",
            scope.name(),
            found.len(),
            resources.len()
        );
        Ok(found.into_iter().collect())
    }

    fn location_admitted(&self, location: &ArtifactLocation) -> bool {
        if self.locations.is_empty() {
            return true;
        }
        let target = location.match_target();
        self.locations.iter().any(|p| p.is_match(&target, self.style))
    }
}

/// Fluent builder for resource lookups. Shares no state with type scans.
#[derive(Clone)]
pub struct ResourceFinder {
    names: IndexSet<String>,
    locations: IndexSet<String>,
    scope: Arc<dyn ArtifactScope>,
}

impl ResourceFinder {
    pub fn new(scope: Arc<dyn ArtifactScope>) -> Self {
        Self {
            names: IndexSet::new(),
            locations: IndexSet::new(),
            scope,
        }
    }

    pub fn by_name(mut self, pattern: impl Into<String>) -> Self {
        self.names.insert(pattern.into());
        self
    }

    pub fn by_url(mut self, pattern: impl Into<String>) -> Self {
        self.locations.insert(pattern.into());
        self
    }

    pub fn using(mut self, scope: Arc<dyn ArtifactScope>) -> Self {
        self.scope = scope;
        self
    }

    pub fn spec(&self, style: MatchStyle) -> Result<ResourceQuerySpec> {
        ResourceQuerySpec::new(
            Pattern::compile_all(&self.names)?,
            Pattern::compile_all(&self.locations)?,
            style,
        )
    }

    /// Partial matching: a pattern may match any part of the subject.
    pub fn find(&self) -> Result<Vec<ArtifactLocation>> {
        self.spec(MatchStyle::Find)?.evaluate(self.scope.as_ref())
    }

    /// Whole-string matching.
    pub fn matches(&self) -> Result<Vec<ArtifactLocation>> {
        self.spec(MatchStyle::Match)?.evaluate(self.scope.as_ref())
    }
}
