// Shared git fixture for integration tests
#![allow(dead_code)]

use git2::{Oid, Repository, Signature, Time};
use std::collections::HashMap;
use std::path::Path;
use tempfile::TempDir;

/// A clone of a repository with several release lines cut from `main`.
///
/// ```text
/// main:           c1 - c2 - c3 - c4 - c5 - ... - c11 - c12 - ... - c15
/// release-1.0.x:        \ r10
/// release-3.2.x:                  \ r32
/// release-4.0.x:                       (tip = c5)
/// release-4.1.x:                                  \ r41a - r41b
/// topic:                                          \ t1
/// feature:                                                         \ f1
/// ```
///
/// Every branch exists in the clone as `origin/<name>`; only `main` is also
/// a local branch, and `HEAD` is attached to it. `dangling` is a commit off
/// `c11` that no ref points at.
pub struct Fixture {
    pub origin: TempDir,
    pub dir: TempDir,
    pub commits: HashMap<&'static str, Oid>,
}

impl Fixture {
    /// Path of the clone
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn repo(&self) -> Repository {
        Repository::open(self.dir.path()).unwrap()
    }

    /// Full sha of a named commit
    pub fn sha(&self, name: &str) -> String {
        self.commits[name].to_string()
    }

    /// Create a local, unpushed branch at a named commit and check it out
    pub fn checkout_local(&self, branch: &str, commit: &str) {
        let repo = self.repo();
        let target = repo.find_commit(self.commits[commit]).unwrap();
        repo.branch(branch, &target, true).unwrap();
        repo.set_head(&format!("refs/heads/{}", branch)).unwrap();
    }
}

struct Builder<'r> {
    repo: &'r Repository,
    clock: i64,
    commits: HashMap<&'static str, Oid>,
}

impl<'r> Builder<'r> {
    fn commit(&mut self, name: &'static str, parent: Option<&str>) -> Oid {
        self.clock += 60;
        let tree_id = self.repo.treebuilder(None).unwrap().write().unwrap();
        let tree = self.repo.find_tree(tree_id).unwrap();
        let sig =
            Signature::new("Test User", "test@example.com", &Time::new(self.clock, 0)).unwrap();
        let parents: Vec<_> = parent
            .map(|p| self.repo.find_commit(self.commits[p]).unwrap())
            .into_iter()
            .collect();
        let parent_refs: Vec<_> = parents.iter().collect();
        let oid = self
            .repo
            .commit(None, &sig, &sig, name, &tree, &parent_refs)
            .unwrap();
        self.commits.insert(name, oid);
        oid
    }

    fn chain(&mut self, names: &[&'static str], parent: Option<&str>) {
        let mut parent = parent.map(|p| p.to_string());
        for name in names {
            self.commit(name, parent.as_deref());
            parent = Some(name.to_string());
        }
    }

    fn branch(&self, branch: &str, commit: &str) {
        let commit = self.repo.find_commit(self.commits[commit]).unwrap();
        self.repo.branch(branch, &commit, true).unwrap();
    }
}

pub fn release_lines() -> Fixture {
    let origin = TempDir::new().unwrap();
    let repo = Repository::init(origin.path()).unwrap();

    let commits = {
        let mut b = Builder {
            repo: &repo,
            clock: 1_600_000_000,
            commits: HashMap::new(),
        };

        b.chain(&["c1", "c2"], None);
        b.commit("r10", Some("c2"));
        b.chain(&["c3", "c4"], Some("c2"));
        b.commit("r32", Some("c4"));
        b.chain(
            &["c5", "c6", "c7", "c8", "c9", "c10", "c11"],
            Some("c4"),
        );
        b.chain(&["r41a", "r41b"], Some("c11"));
        b.commit("t1", Some("c11"));
        b.chain(&["c12", "c13", "c14", "c15"], Some("c11"));
        b.commit("f1", Some("c15"));

        b.branch("main", "c15");
        b.branch("release-1.0.x", "r10");
        b.branch("release-3.2.x", "r32");
        b.branch("release-4.0.x", "c5");
        b.branch("release-4.1.x", "r41b");
        b.branch("topic", "t1");
        b.branch("feature", "f1");
        b.commits
    };

    repo.set_head("refs/heads/main").unwrap();

    let clone = TempDir::new().unwrap();
    let url = format!("file://{}", origin.path().display());
    let clone_repo = Repository::clone(&url, clone.path()).unwrap();

    // unreachable commits are not cloned, so this one is made in the clone
    let mut b = Builder {
        repo: &clone_repo,
        clock: 1_700_000_000,
        commits,
    };
    b.commit("dangling", Some("c11"));
    let commits = b.commits;
    drop(clone_repo);

    Fixture {
        origin,
        dir: clone,
        commits,
    }
}
