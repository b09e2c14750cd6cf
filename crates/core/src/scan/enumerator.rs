use crate::query::pattern::{MatchStyle, Pattern, any_matches};
use tracing::debug;
use typescout_api::{
    ArtifactIdentity, ArtifactLocation, ArtifactScope, DiscoveryError, Result,
};

/// A top-level scan candidate with a resolved location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub identity: ArtifactIdentity,
    pub location: ArtifactLocation,
}

/// Lists candidate artifacts of a scope, narrowed by namespace and location.
pub struct Enumerator<'a> {
    scope: &'a dyn ArtifactScope,
    include_nested: bool,
}

impl<'a> Enumerator<'a> {
    pub fn new(scope: &'a dyn ArtifactScope) -> Self {
        Self {
            scope,
            include_nested: false,
        }
    }

    pub fn include_nested(mut self, include: bool) -> Self {
        self.include_nested = include;
        self
    }

    /// An empty `namespaces` slice means every artifact in the scope.
    /// Location patterns use partial matching; an empty slice admits all.
    pub fn list(&self, namespaces: &[String], locations: &[Pattern]) -> Result<Vec<Candidate>> {
        let entries = self.scope.artifacts().map_err(|e| {
            DiscoveryError::Enumeration(format!("scope {}: {e}", self.scope.name()))
        })?;

        let total = entries.len();
        let mut unresolved = 0usize;
        let candidates: Vec<Candidate> = entries
            .into_iter()
            .filter(|entry| self.include_nested || !entry.identity.is_nested())
            .filter(|entry| {
                namespaces.is_empty() || namespaces.iter().any(|ns| entry.identity.in_namespace(ns))
            })
            .filter_map(|entry| match entry.location {
                Some(location) => Some(Candidate {
                    identity: entry.identity,
                    location,
                }),
                None => {
                    unresolved += 1;
                    debug!("No location for {}, skipping", entry.identity);
                    None
                }
            })
            .filter(|candidate| {
                any_matches(locations, &candidate.location.match_target(), MatchStyle::Find)
            })
            .collect();

        debug!(
            "Enumerated {} of {} artifacts in scope {} ({} unresolved)",
            candidates.len(),
            total,
            self.scope.name(),
            unresolved
        );
        Ok(candidates)
    }
}
