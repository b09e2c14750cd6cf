use super::enumerator::Candidate;
use crate::cache::{Lookup, ScanCache};
use crate::query::pattern::{MatchStyle, Pattern, any_matches};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use typescout_api::{
    ArtifactIdentity, ArtifactLocation, ArtifactScope, DiscoveryError, MetadataReader,
    MetadataRecord, Result,
};

/// Populates a [`ScanCache`] from a set of candidates, in parallel.
///
/// Each candidate is one unit of work on a bounded pool. Inside a unit the
/// ancestors of every freshly parsed artifact are walked inline (an explicit
/// stack, not new pool tasks), so concurrency never exceeds the pool size.
/// The cache's claim-on-first-access doubles as the visited set.
pub struct Scanner<'a> {
    scope: &'a dyn ArtifactScope,
    reader: &'a dyn MetadataReader,
    cache: &'a ScanCache,
    locations: &'a [Pattern],
    filter_ancestors: bool,
    workers: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(
        scope: &'a dyn ArtifactScope,
        reader: &'a dyn MetadataReader,
        cache: &'a ScanCache,
    ) -> Self {
        Self {
            scope,
            reader,
            cache,
            locations: &[],
            filter_ancestors: true,
            workers: 1,
        }
    }

    pub fn with_location_filter(mut self, locations: &'a [Pattern], filter_ancestors: bool) -> Self {
        self.locations = locations;
        self.filter_ancestors = filter_ancestors;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Scan every candidate and its transitive ancestors. Blocks until all
    /// work has finished; per-artifact failures are logged and counted.
    pub fn scan(&self, candidates: Vec<Candidate>) -> Result<ScanReport> {
        let start = Instant::now();
        let stats = ScanStats::default();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("typescout-scan-{i}"))
            .build()
            .map_err(|e| DiscoveryError::Internal(format!("cannot start scan workers: {e}")))?;

        let submitted = candidates.len();
        pool.scope(|s| {
            for candidate in candidates {
                let stats = &stats;
                s.spawn(move |_| self.run_item(candidate, stats));
            }
        });
        drop(pool);

        let report = stats.into_report(submitted, start.elapsed());
        info!(
            "Scan of {} complete: {} candidates, {} parsed, {} unreadable, {} excluded, {} failed in {:?}",
            self.scope.name(),
            report.candidates,
            report.parsed,
            report.unreadable,
            report.excluded,
            report.failed,
            report.duration
        );
        Ok(report)
    }

    fn run_item(&self, candidate: Candidate, stats: &ScanStats) {
        let identity = candidate.identity.clone();
        match catch_unwind(AssertUnwindSafe(|| self.walk(candidate, stats))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                stats.unreadable.fetch_add(1, Ordering::Relaxed);
                debug!("Skipping {}: {}", identity, err);
            }
            Err(_) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Work item for {} panicked; continuing scan", identity);
            }
        }
    }

    /// Parse one candidate and walk its ancestor graph depth-first.
    fn walk(&self, candidate: Candidate, stats: &ScanStats) -> Result<()> {
        let mut stack = match self.visit(&candidate.identity, candidate.location, stats)? {
            Some(Lookup::Fresh(record)) => ancestors_of(&record),
            // Whoever parsed it walks its ancestors.
            _ => return Ok(()),
        };

        while let Some(ancestor) = stack.pop() {
            if ancestor.as_str() == self.reader.root_type() || self.cache.contains(&ancestor) {
                continue;
            }
            let Some(location) = self.scope.locate(&ancestor) else {
                debug!("Ancestor {} is not visible in {}", ancestor, self.scope.name());
                continue;
            };
            if self.filter_ancestors && !self.admits(&location) {
                stats.excluded.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            // A panic drops this ancestor only; the rest of the stack is still walked.
            match catch_unwind(AssertUnwindSafe(|| self.visit(&ancestor, location, stats))) {
                Ok(Ok(Some(Lookup::Fresh(record)))) => stack.extend(ancestors_of(&record)),
                Ok(Ok(_)) => {}
                Ok(Err(err)) => {
                    stats.unreadable.fetch_add(1, Ordering::Relaxed);
                    debug!("Skipping ancestor {}: {}", ancestor, err);
                }
                Err(_) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    warn!("Reading ancestor {} panicked; skipping it", ancestor);
                }
            }
        }
        Ok(())
    }

    /// Parse one artifact through the cache. `Ok(None)` for the root type.
    fn visit(
        &self,
        identity: &ArtifactIdentity,
        location: ArtifactLocation,
        stats: &ScanStats,
    ) -> Result<Option<Lookup>> {
        if identity.as_str() == self.reader.root_type() {
            return Ok(None);
        }

        let lookup = self
            .cache
            .get_or_create(identity, || {
                let bytes = self.scope.open(&location)?;
                self.reader.read(&bytes)
            })
            .map_err(|e| DiscoveryError::ArtifactUnreadable {
                identity: identity.clone(),
                reason: format!("{location}: {e}"),
            })?;

        if matches!(lookup, Lookup::Fresh(_)) {
            stats.parsed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(Some(lookup))
    }

    fn admits(&self, location: &ArtifactLocation) -> bool {
        any_matches(self.locations, &location.match_target(), MatchStyle::Find)
    }
}

fn ancestors_of(record: &MetadataRecord) -> Vec<ArtifactIdentity> {
    record
        .ancestors()
        .iter()
        .map(|a| ArtifactIdentity::new(a.as_str()))
        .collect()
}

#[derive(Default)]
struct ScanStats {
    parsed: AtomicUsize,
    unreadable: AtomicUsize,
    excluded: AtomicUsize,
    failed: AtomicUsize,
}

impl ScanStats {
    fn into_report(self, candidates: usize, duration: Duration) -> ScanReport {
        ScanReport {
            candidates,
            parsed: self.parsed.into_inner(),
            unreadable: self.unreadable.into_inner(),
            excluded: self.excluded.into_inner(),
            failed: self.failed.into_inner(),
            duration,
        }
    }
}

/// Result of a scan operation
#[derive(Debug, Default, Clone)]
pub struct ScanReport {
    /// Top-level candidates submitted
    pub candidates: usize,
    /// Artifacts parsed, ancestors included
    pub parsed: usize,
    /// Artifacts whose bytes could not be read or parsed
    pub unreadable: usize,
    /// Ancestors rejected by the location filter
    pub excluded: usize,
    /// Work items that panicked
    pub failed: usize,
    /// Time taken for the scan
    pub duration: Duration,
}
