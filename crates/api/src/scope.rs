//! Seams between the discovery engine and the artifact format it reads.
//!
//! - [`ArtifactScope`] knows where artifacts live (a classpath, an in-memory
//!   fixture, ...) and how to open them.
//! - [`MetadataReader`] knows how to turn one artifact's bytes into a
//!   [`MetadataRecord`] without loading anything else.

use crate::models::{ArtifactEntry, ArtifactIdentity, ArtifactLocation, MetadataRecord, ResourceEntry};

/// Error type for scope and reader operations
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The searchable universe of artifacts a query is evaluated against.
pub trait ArtifactScope: Send + Sync {
    /// Scope name (for logging/debugging)
    fn name(&self) -> &str;

    /// List every artifact visible through this scope.
    /// An error here means the scope could not be listed at all.
    fn artifacts(&self) -> Result<Vec<ArtifactEntry>, BoxError>;

    /// Resolve the binary location of one artifact, if visible.
    fn locate(&self, identity: &ArtifactIdentity) -> Option<ArtifactLocation>;

    /// Read the raw bytes behind a location.
    fn open(&self, location: &ArtifactLocation) -> Result<Vec<u8>, BoxError>;

    /// List every non-type resource visible through this scope.
    fn resources(&self) -> Result<Vec<ResourceEntry>, BoxError>;
}

/// Header-only parser for one compiled-artifact format.
pub trait MetadataReader: Send + Sync {
    /// Name of the universal root type. It terminates ancestor recursion and
    /// is never stored as a scanned artifact.
    fn root_type(&self) -> &str;

    /// Extract direct ancestors and markers from one artifact.
    fn read(&self, bytes: &[u8]) -> Result<MetadataRecord, BoxError>;
}
