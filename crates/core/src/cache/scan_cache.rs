use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use typescout_api::{ArtifactIdentity, MetadataRecord};

#[derive(Debug, Clone)]
enum Slot {
    /// Claimed by a worker that is parsing it right now.
    Pending,
    Ready(Arc<MetadataRecord>),
    /// Parsed once and failed; never retried within the session.
    Unreadable,
}

/// Outcome of [`ScanCache::get_or_create`].
#[derive(Debug, Clone)]
pub enum Lookup {
    /// This call parsed the artifact.
    Fresh(Arc<MetadataRecord>),
    /// Another call parsed it earlier.
    Cached(Arc<MetadataRecord>),
    /// Another call (or an enclosing frame of this one) is parsing it.
    Pending,
    /// An earlier attempt failed.
    Unreadable,
}

impl Lookup {
    pub fn record(&self) -> Option<&Arc<MetadataRecord>> {
        match self {
            Lookup::Fresh(record) | Lookup::Cached(record) => Some(record),
            Lookup::Pending | Lookup::Unreadable => None,
        }
    }
}

/// Concurrent identity → record map, write-once per key.
///
/// A key is claimed atomically before its producer runs, so exactly one
/// parse happens per identity no matter how many workers reach it. The
/// claim also makes the cache the visited set of the ancestor walk: cycles
/// observe `Pending` and stop.
#[derive(Debug, Default)]
pub struct ScanCache {
    entries: DashMap<ArtifactIdentity, Slot>,
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create<E>(
        &self,
        identity: &ArtifactIdentity,
        produce: impl FnOnce() -> Result<MetadataRecord, E>,
    ) -> Result<Lookup, E> {
        // The shard guard is released before `produce` runs; producers may
        // re-enter the cache.
        match self.entries.entry(identity.clone()) {
            Entry::Occupied(occupied) => {
                return Ok(match occupied.get() {
                    Slot::Pending => Lookup::Pending,
                    Slot::Ready(record) => Lookup::Cached(Arc::clone(record)),
                    Slot::Unreadable => Lookup::Unreadable,
                });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Pending);
            }
        }

        let mut claim = Claim {
            entries: &self.entries,
            identity,
            settled: false,
        };
        let outcome = produce();
        claim.settled = true;

        match outcome {
            Ok(record) => {
                let record = Arc::new(record);
                self.entries
                    .insert(identity.clone(), Slot::Ready(Arc::clone(&record)));
                Ok(Lookup::Fresh(record))
            }
            Err(err) => {
                self.entries.insert(identity.clone(), Slot::Unreadable);
                Err(err)
            }
        }
    }

    /// Whether the identity has been claimed, whatever the outcome.
    pub fn contains(&self, identity: &ArtifactIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn get(&self, identity: &ArtifactIdentity) -> Option<Arc<MetadataRecord>> {
        match self.entries.get(identity)?.value() {
            Slot::Ready(record) => Some(Arc::clone(record)),
            Slot::Pending | Slot::Unreadable => None,
        }
    }

    /// Number of successfully parsed artifacts.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.value(), Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Point-in-time copy of every parsed record.
    pub fn records(&self) -> HashMap<ArtifactIdentity, Arc<MetadataRecord>> {
        self.entries
            .iter()
            .filter_map(|entry| match entry.value() {
                Slot::Ready(record) => Some((entry.key().clone(), Arc::clone(record))),
                Slot::Pending | Slot::Unreadable => None,
            })
            .collect()
    }
}

/// Marks a claimed key unreadable when its producer unwinds.
struct Claim<'a> {
    entries: &'a DashMap<ArtifactIdentity, Slot>,
    identity: &'a ArtifactIdentity,
    settled: bool,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.entries.insert(self.identity.clone(), Slot::Unreadable);
        }
    }
}
