use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use typescout_api::{ArtifactIdentity, DiscoveryError, MetadataRecord, Result};

/// Computes subtype closures over a snapshot of scanned records.
pub struct SubtypeResolver<'a> {
    root: &'a str,
    /// ancestor name -> artifacts declaring it directly
    children: HashMap<&'a str, Vec<&'a ArtifactIdentity>>,
}

impl<'a> SubtypeResolver<'a> {
    pub fn new(records: &'a HashMap<ArtifactIdentity, Arc<MetadataRecord>>, root: &'a str) -> Self {
        let mut children: HashMap<&str, Vec<&ArtifactIdentity>> = HashMap::new();
        for (identity, record) in records {
            for ancestor in record.ancestors() {
                children.entry(ancestor.as_str()).or_default().push(identity);
            }
        }
        Self { root, children }
    }

    /// Every artifact whose ancestor chain reaches `target`.
    ///
    /// The root type has every artifact as a subtype and is rejected; query
    /// it by capability markers instead.
    pub fn subtypes_of(&self, target: &str) -> Result<HashSet<ArtifactIdentity>> {
        if target == self.root {
            return Err(DiscoveryError::InvalidQuery(format!(
                "{target} is the root type; query by capability markers instead"
            )));
        }

        let mut found: HashSet<ArtifactIdentity> = HashSet::new();
        let mut frontier = vec![target];
        while let Some(current) = frontier.pop() {
            let Some(direct) = self.children.get(current) else {
                continue;
            };
            for child in direct {
                if found.insert((*child).clone()) {
                    frontier.push(child.as_str());
                }
            }
        }
        Ok(found)
    }
}
