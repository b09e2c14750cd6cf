use crate::models::ArtifactIdentity;

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// Binary stream missing or malformed. Scoped to one artifact.
    #[error("artifact {identity} is unreadable: {reason}")]
    ArtifactUnreadable {
        identity: ArtifactIdentity,
        reason: String,
    },
    /// A discovered identity could not be mapped back to a loadable handle.
    #[error("type {identity} could not be resolved in scope")]
    TypeResolution { identity: ArtifactIdentity },
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    /// The scope could not be listed at all.
    #[error("enumeration failed: {0}")]
    Enumeration(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl DiscoveryError {
    /// Whether the failure is local to one artifact and recovered by the scanner.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            DiscoveryError::ArtifactUnreadable { .. } | DiscoveryError::TypeResolution { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
