mod common;

use common::{LineReader, ROOT, ScopeExt};
use std::sync::Arc;
use typescout_api::{
    ArtifactEntry, ArtifactHandle, ArtifactIdentity, ArtifactLocation, ArtifactScope, BoxError,
    DiscoveryError, ResourceEntry,
};
use typescout_core::{Discovery, MemoryScope, ScanConfig};

fn names(found: &std::collections::BTreeSet<ArtifactHandle>) -> Vec<&str> {
    found.iter().map(|h| h.name()).collect()
}

fn layered() -> MemoryScope {
    MemoryScope::new("layered")
        .with("Base", &[], &[])
        .with("Mid", &["Base"], &[])
        .with("Leaf", &["Mid"], &["Plugin"])
}

fn discovery(scope: MemoryScope, reader: Arc<LineReader>) -> Discovery {
    Discovery::new(Arc::new(scope), reader).with_config(ScanConfig::default().with_worker_threads(4))
}

#[test]
fn test_layered_scenario() {
    let discovery = discovery(layered(), LineReader::new());

    let all = discovery.subtypes_of("Base").find().unwrap();
    assert_eq!(names(&all), vec!["Leaf", "Mid"]);

    let plugins = discovery.subtypes_of("Base").having("Plugin").find().unwrap();
    assert_eq!(names(&plugins), vec!["Leaf"]);

    let both = discovery
        .subtypes_of("Base")
        .having("Plugin")
        .having("Other")
        .find()
        .unwrap();
    assert!(both.is_empty());
}

#[test]
fn test_match_any_admits_partial_marker_sets() {
    let scope = MemoryScope::new("markers")
        .with("Api", &[], &[])
        .with("One", &["Api"], &["M1"])
        .with("Two", &["Api"], &["M1", "M2"])
        .with("None", &["Api"], &[]);
    let discovery = discovery(scope, LineReader::new());

    let all = discovery.subtypes_of("Api").having("M1").having("M2").find().unwrap();
    assert_eq!(names(&all), vec!["Two"]);

    let any = discovery
        .subtypes_of("Api")
        .having("M1")
        .having("M2")
        .any()
        .find()
        .unwrap();
    assert_eq!(names(&any), vec!["One", "Two"]);
}

#[test]
fn test_markers_are_not_inherited() {
    let scope = MemoryScope::new("inherit")
        .with("Api", &[], &[])
        .with("Marked", &["Api"], &["Plugin"])
        .with("Child", &["Marked"], &[]);
    let discovery = discovery(scope, LineReader::new());

    let found = discovery.subtypes_of("Api").having("Plugin").find().unwrap();
    assert_eq!(names(&found), vec!["Marked"]);
}

#[test]
fn test_reevaluation_is_idempotent() {
    let discovery = discovery(layered(), LineReader::new());
    let finder = discovery.subtypes_of("Base");
    let first = finder.find().unwrap();
    let second = finder.find().unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_each_query_rescans_with_a_fresh_cache() {
    let reader = LineReader::new();
    let discovery = discovery(layered(), Arc::clone(&reader));
    discovery.subtypes_of("Base").find().unwrap();
    discovery.subtypes_of("Base").find().unwrap();
    assert_eq!(reader.parses_of("Mid"), 2);
}

#[test]
fn test_diamond_parsed_once_and_reported_once() {
    let scope = MemoryScope::new("diamond")
        .with("Top", &[], &[])
        .with("Left", &["Top"], &[])
        .with("Right", &["Top"], &[])
        .with("Bottom", &["Left", "Right"], &[]);
    let reader = LineReader::new();
    let discovery = discovery(scope, Arc::clone(&reader));

    let found = discovery.subtypes_of("Top").find().unwrap();
    assert_eq!(names(&found), vec!["Bottom", "Left", "Right"]);
    for name in ["Top", "Left", "Right", "Bottom"] {
        assert_eq!(reader.parses_of(name), 1, "{name} parsed more than once");
    }
}

#[test]
fn test_unreadable_artifact_does_not_disturb_results() {
    let healthy = discovery(layered(), LineReader::new())
        .subtypes_of("Base")
        .find()
        .unwrap();

    let scope = layered()
        .with_artifact("Corrupt", b"\xCA\xFE garbage".to_vec())
        .with_artifact("Exploding", b"panic".to_vec())
        .with_unresolved("Ghost");
    let degraded = discovery(scope, LineReader::new())
        .subtypes_of("Base")
        .find()
        .unwrap();

    assert_eq!(healthy, degraded);
}

#[test]
fn test_unreadable_intermediate_breaks_only_its_chain() {
    let scope = MemoryScope::new("broken-mid")
        .with("Base", &[], &[])
        .with_artifact("Mid", b"not an artifact".to_vec())
        .with("Leaf", &["Mid"], &[])
        .with("Direct", &["Base"], &[]);
    let found = discovery(scope, LineReader::new())
        .subtypes_of("Base")
        .find()
        .unwrap();
    assert_eq!(names(&found), vec!["Direct"]);
}

#[test]
fn test_root_target_without_markers_fails_before_scanning() {
    let reader = LineReader::new();
    let discovery = discovery(layered(), Arc::clone(&reader));

    let err = discovery.types().find().unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidQuery(_)));

    let err = discovery.subtypes_of(ROOT).find().unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidQuery(_)));
    assert_eq!(reader.total_parses(), 0);
}

#[test]
fn test_marker_only_query() {
    let scope = layered().with("Standalone", &[], &["Plugin", "Extra"]);
    let discovery = discovery(scope, LineReader::new());

    let found = discovery.types().having("Plugin").find().unwrap();
    assert_eq!(names(&found), vec!["Leaf", "Standalone"]);

    let found = discovery.types().having("Plugin").having("Extra").find().unwrap();
    assert_eq!(names(&found), vec!["Standalone"]);

    let found = discovery
        .types()
        .having("Missing")
        .having("Extra")
        .any()
        .find()
        .unwrap();
    assert_eq!(names(&found), vec!["Standalone"]);
}

#[test]
fn test_namespace_filter_still_follows_ancestors() {
    let scope = MemoryScope::new("namespaces")
        .with("api.Service", &[], &[])
        .with("lib.Adapter", &["api.Service"], &[])
        .with("app.Impl", &["lib.Adapter"], &[])
        .with("other.Impl", &["api.Service"], &[]);
    let reader = LineReader::new();
    let discovery = discovery(scope, Arc::clone(&reader));

    let found = discovery.subtypes_of("api.Service").within("app").find().unwrap();
    assert_eq!(names(&found), vec!["app.Impl", "lib.Adapter"]);
    assert_eq!(reader.parses_of("other.Impl"), 0);
}

#[test]
fn test_location_filter_applies_to_candidates_and_ancestors() {
    let scope = MemoryScope::new("jars")
        .with_artifact_at("Base", "api.jar!/Base", common::artifact("Base", &[], &[]))
        .with_artifact_at("Mid", "lib.jar!/Mid", common::artifact("Mid", &["Base"], &[]))
        .with_artifact_at("Leaf", "app.jar!/Leaf", common::artifact("Leaf", &["Mid"], &[]));

    let filtered = discovery(scope.clone(), LineReader::new())
        .subtypes_of("Base")
        .by_url(r"app\.jar")
        .find()
        .unwrap();
    assert!(filtered.is_empty(), "Mid is outside the filter, so Leaf cannot reach Base");

    let direct = discovery(scope.clone(), LineReader::new())
        .subtypes_of("Mid")
        .by_url(r"app\.jar")
        .find()
        .unwrap();
    assert_eq!(names(&direct), vec!["Leaf"]);

    let unfiltered_ancestors = Discovery::new(Arc::new(scope), LineReader::new())
        .with_config(ScanConfig {
            filter_ancestors: false,
            ..ScanConfig::default()
        })
        .subtypes_of("Base")
        .by_url(r"app\.jar")
        .find()
        .unwrap();
    assert_eq!(names(&unfiltered_ancestors), vec!["Leaf", "Mid"]);
}

#[test]
fn test_cyclic_ancestry_terminates() {
    let scope = MemoryScope::new("cycle")
        .with("A", &["B"], &[])
        .with("B", &["A"], &[])
        .with("C", &["A"], &[]);
    let found = discovery(scope, LineReader::new())
        .subtypes_of("A")
        .find()
        .unwrap();
    assert_eq!(names(&found), vec!["A", "B", "C"]);
}

#[test]
fn test_using_switches_scope() {
    let discovery = discovery(layered(), LineReader::new());
    let other: Arc<dyn ArtifactScope> = Arc::new(
        MemoryScope::new("other")
            .with("Base", &[], &[])
            .with("Elsewhere", &["Base"], &[]),
    );
    let found = discovery.subtypes_of("Base").using(other).find().unwrap();
    assert_eq!(names(&found), vec!["Elsewhere"]);
}

#[test]
fn test_invalid_location_pattern_rejected() {
    let err = discovery(layered(), LineReader::new())
        .subtypes_of("Base")
        .by_url("(")
        .find()
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidPattern { .. }));
}

/// Lists artifacts but refuses to resolve some of them afterwards.
struct Forgetful {
    inner: MemoryScope,
    hidden: Vec<ArtifactIdentity>,
}

impl ArtifactScope for Forgetful {
    fn name(&self) -> &str {
        "forgetful"
    }

    fn artifacts(&self) -> Result<Vec<ArtifactEntry>, BoxError> {
        self.inner.artifacts()
    }

    fn locate(&self, identity: &ArtifactIdentity) -> Option<ArtifactLocation> {
        if self.hidden.contains(identity) {
            None
        } else {
            self.inner.locate(identity)
        }
    }

    fn open(&self, location: &ArtifactLocation) -> Result<Vec<u8>, BoxError> {
        self.inner.open(location)
    }

    fn resources(&self) -> Result<Vec<ResourceEntry>, BoxError> {
        self.inner.resources()
    }
}

#[test]
fn test_unresolvable_handles_are_dropped() {
    let scope = Forgetful {
        inner: layered(),
        hidden: vec![ArtifactIdentity::new("Leaf")],
    };
    let found = Discovery::new(Arc::new(scope), LineReader::new())
        .subtypes_of("Base")
        .find()
        .unwrap();
    assert_eq!(names(&found), vec!["Mid"]);
}

#[test]
fn test_resources_share_nothing_with_type_scans() {
    let scope = layered()
        .with_resource("a/x.txt", b"a".to_vec())
        .with_resource("b/x.txt", b"b".to_vec());
    let reader = LineReader::new();
    let discovery = discovery(scope, Arc::clone(&reader));

    let found = discovery.resources().by_name(r"x\.txt").find().unwrap();
    assert_eq!(found.len(), 2);
    let found = discovery.resources().by_name(r"x\.txt").by_url("^a/").find().unwrap();
    assert_eq!(found, vec![ArtifactLocation::Memory("a/x.txt".to_string())]);
    assert_eq!(reader.total_parses(), 0);
}
