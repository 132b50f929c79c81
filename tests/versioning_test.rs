// tests/versioning_test.rs
mod common;

use deterministic_versions::history::{HistoryConfig, HistoryProvider, LocalHistory};
use deterministic_versions::{Version, VersionEngine, VersionerError};
use std::sync::Arc;
use std::thread;

fn engine_at(path: &std::path::Path) -> VersionEngine<LocalHistory> {
    let history = LocalHistory::open(path, HistoryConfig::default()).unwrap();
    VersionEngine::new(history).unwrap()
}

fn resolve(engine: &VersionEngine<LocalHistory>, sha: &str) -> String {
    engine.resolve(Some(sha)).unwrap().to_string()
}

#[test]
fn test_head_of_default_branch() {
    let fixture = common::release_lines();
    let engine = engine_at(fixture.path());

    assert_eq!(engine.resolve(None).unwrap(), Version::new(4, 2, 4));
    assert_eq!(engine.build_number(None).unwrap(), "0");
}

#[test]
fn test_release_branch_commits() {
    let fixture = common::release_lines();
    let engine = engine_at(fixture.path());

    assert_eq!(resolve(&engine, &fixture.sha("r41b")), "4.1.8");
    assert_eq!(resolve(&engine, &fixture.sha("r41a")), "4.1.7");
    assert_eq!(resolve(&engine, &fixture.sha("r32")), "3.2.3");
    assert_eq!(resolve(&engine, &fixture.sha("r10")), "1.0.2");
}

#[test]
fn test_default_branch_history() {
    let fixture = common::release_lines();
    let engine = engine_at(fixture.path());

    assert_eq!(resolve(&engine, &fixture.sha("c2")), "0.0.1");
    assert_eq!(resolve(&engine, &fixture.sha("c11")), "4.1.6");
    assert_eq!(resolve(&engine, &fixture.sha("c12")), "4.2.1");
}

#[test]
fn test_unreleasable_branches() {
    let fixture = common::release_lines();
    let engine = engine_at(fixture.path());

    assert_eq!(resolve(&engine, &fixture.sha("f1")), "4.2.65535");
    assert_eq!(resolve(&engine, &fixture.sha("t1")), "4.1.65535");
    assert_eq!(resolve(&engine, &fixture.sha("dangling")), "4.1.65535");
}

#[test]
fn test_build_numbers() {
    let fixture = common::release_lines();
    let engine = engine_at(fixture.path());

    assert_eq!(
        engine.build_number(Some(fixture.sha("r41b").as_str())).unwrap(),
        "401000008"
    );
    assert_eq!(
        engine.build_number(Some(fixture.sha("r10").as_str())).unwrap(),
        "100000002"
    );
    assert_eq!(engine.build_number(Some(fixture.sha("c11").as_str())).unwrap(), "0");
    assert_eq!(engine.build_number(Some(fixture.sha("f1").as_str())).unwrap(), "0");
}

#[test]
fn test_detached_head_on_release_branch() {
    let fixture = common::release_lines();
    let repo = fixture.repo();
    repo.set_head_detached(fixture.commits["r41a"]).unwrap();

    let engine = engine_at(fixture.path());
    assert_eq!(engine.resolve(None).unwrap(), Version::new(4, 1, 7));
    assert_eq!(engine.build_number(None).unwrap(), "401000007");
}

#[test]
fn test_checked_out_feature_branch() {
    let fixture = common::release_lines();
    fixture.checkout_local("feature", "f1");

    let engine = engine_at(fixture.path());
    assert_eq!(engine.resolve(None).unwrap(), Version::new(4, 2, 65535));
}

#[test]
fn test_unpushed_release_branch_is_not_found() {
    let fixture = common::release_lines();
    fixture.checkout_local("release-5.0.x", "c15");

    let engine = engine_at(fixture.path());
    let catalog = engine.catalog().unwrap();
    assert!(!catalog.iter().any(|r| r.branch == "release-5.0.x"));

    match engine.resolve(None) {
        Err(VersionerError::ReleaseBranchNotFound { branch }) => {
            assert_eq!(branch, "release-5.0.x")
        }
        other => panic!("expected ReleaseBranchNotFound, got {:?}", other),
    }
    assert!(matches!(
        engine.build_number(None),
        Err(VersionerError::ReleaseBranchNotFound { .. })
    ));
}

#[test]
fn test_remote_tracking_branches() {
    let fixture = common::release_lines();
    let history = LocalHistory::open(fixture.path(), HistoryConfig::default()).unwrap();

    let branches = history.get_all_branches().unwrap();
    assert!(branches.contains(&"origin/release-4.1.x".to_string()));
    assert!(branches.iter().all(|b| b.starts_with("origin/")));
    assert!(!branches.iter().any(|b| b.ends_with("/HEAD")));

    assert_eq!(
        history.get_branch_for_commit(&fixture.sha("r41a")).unwrap(),
        "release-4.1.x"
    );
    assert_eq!(
        history
            .get_merge_base("origin/main", "release-4.1.x")
            .unwrap(),
        fixture.sha("c11")
    );

    let engine = VersionEngine::new(history).unwrap();
    assert_eq!(engine.resolve(None).unwrap(), Version::new(4, 2, 4));
    assert_eq!(resolve(&engine, &fixture.sha("r41b")), "4.1.8");
    assert_eq!(resolve(&engine, &fixture.sha("r32")), "3.2.3");
    assert_eq!(resolve(&engine, &fixture.sha("f1")), "4.2.65535");
}

#[test]
fn test_missing_default_branch_names_the_query() {
    let fixture = common::release_lines();
    let history =
        LocalHistory::open(fixture.path(), HistoryConfig::new("trunk", "origin")).unwrap();
    let engine = VersionEngine::new(history).unwrap();

    let err = engine.resolve(Some(fixture.sha("r41b").as_str())).unwrap_err();
    assert!(matches!(err, VersionerError::Query { .. }));
    assert!(err.to_string().contains("get_merge_base"));
}

#[test]
fn test_results_are_stable() {
    let fixture = common::release_lines();

    let first = engine_at(fixture.path());
    let second = engine_at(fixture.path());
    for name in ["c2", "c11", "r41b", "r32", "f1", "t1"] {
        assert_eq!(
            resolve(&first, &fixture.sha(name)),
            resolve(&second, &fixture.sha(name)),
            "commit {}",
            name
        );
    }
}

#[test]
fn test_concurrent_head_resolution() {
    let fixture = common::release_lines();
    let engine = Arc::new(engine_at(fixture.path()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.resolve_head().unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Version::new(4, 2, 4));
    }
}
