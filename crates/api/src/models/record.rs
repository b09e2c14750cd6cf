use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Header metadata parsed from one artifact: its direct ancestors
/// (supertype and implemented interfaces) and its directly attached
/// capability markers. Immutable once built.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    ancestors: BTreeSet<String>,
    markers: BTreeSet<String>,
}

impl MetadataRecord {
    pub fn new(
        ancestors: impl IntoIterator<Item = String>,
        markers: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            ancestors: ancestors.into_iter().collect(),
            markers: markers.into_iter().collect(),
        }
    }

    pub fn ancestors(&self) -> &BTreeSet<String> {
        &self.ancestors
    }

    pub fn markers(&self) -> &BTreeSet<String> {
        &self.markers
    }

    pub fn extends(&self, name: &str) -> bool {
        self.ancestors.contains(name)
    }

    pub fn has_marker(&self, name: &str) -> bool {
        self.markers.contains(name)
    }
}
