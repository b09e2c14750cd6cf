//! In-memory implementation of ArtifactScope.
//!
//! Holds artifacts and resources as byte buffers keyed by name. Useful for
//! embedding pre-extracted artifacts and for exercising the engine without
//! touching the filesystem.

use indexmap::IndexMap;
use typescout_api::{
    ArtifactEntry, ArtifactIdentity, ArtifactLocation, ArtifactScope, BoxError, ResourceEntry,
};

#[derive(Debug, Clone)]
struct StoredArtifact {
    location: Option<ArtifactLocation>,
}

/// Scope backed by byte buffers.
#[derive(Debug, Clone, Default)]
pub struct MemoryScope {
    name: String,
    artifacts: IndexMap<ArtifactIdentity, StoredArtifact>,
    resources: Vec<ResourceEntry>,
    blobs: IndexMap<String, Vec<u8>>,
}

impl MemoryScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add an artifact stored under its own name.
    pub fn with_artifact(self, identity: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.with_artifact_at(identity, identity, bytes)
    }

    /// Add an artifact stored under an explicit location key, e.g.
    /// `lib/api.jar!/com/acme/Plugin.class`.
    pub fn with_artifact_at(
        mut self,
        identity: &str,
        key: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let key = key.into();
        self.blobs.insert(key.clone(), bytes.into());
        self.artifacts.insert(
            ArtifactIdentity::new(identity),
            StoredArtifact {
                location: Some(ArtifactLocation::Memory(key)),
            },
        );
        self
    }

    /// List an artifact whose bytes cannot be resolved.
    pub fn with_unresolved(mut self, identity: &str) -> Self {
        self.artifacts
            .insert(ArtifactIdentity::new(identity), StoredArtifact { location: None });
        self
    }

    /// Add a resource stored under its name. Names may repeat; each call adds
    /// another location (`name`, `name#1`, ...).
    pub fn with_resource(mut self, name: &str, bytes: impl Into<Vec<u8>>) -> Self {
        let mut key = name.to_string();
        let mut n = 0;
        while self.blobs.contains_key(&key) {
            n += 1;
            key = format!("{name}#{n}");
        }
        self.blobs.insert(key.clone(), bytes.into());
        self.resources
            .push(ResourceEntry::new(name, ArtifactLocation::Memory(key)));
        self
    }
}

impl ArtifactScope for MemoryScope {
    fn name(&self) -> &str {
        &self.name
    }

    fn artifacts(&self) -> Result<Vec<ArtifactEntry>, BoxError> {
        Ok(self
            .artifacts
            .iter()
            .map(|(identity, stored)| ArtifactEntry {
                identity: identity.clone(),
                location: stored.location.clone(),
            })
            .collect())
    }

    fn locate(&self, identity: &ArtifactIdentity) -> Option<ArtifactLocation> {
        self.artifacts.get(identity)?.location.clone()
    }

    fn open(&self, location: &ArtifactLocation) -> Result<Vec<u8>, BoxError> {
        match location {
            ArtifactLocation::Memory(key) => self
                .blobs
                .get(key)
                .cloned()
                .ok_or_else(|| format!("no bytes stored under {key}").into()),
            other => Err(format!("{other} is not held by memory scope {}", self.name).into()),
        }
    }

    fn resources(&self) -> Result<Vec<ResourceEntry>, BoxError> {
        Ok(self.resources.clone())
    }
}
