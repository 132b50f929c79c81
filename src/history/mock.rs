use crate::domain::branch::strip_remote;
use crate::domain::commit::same_commit;
use crate::error::{Result, VersionerError};
use crate::history::{candidate_branches, HistoryConfig, HistoryProvider};
use std::collections::{BTreeMap, HashMap, HashSet};

/// In-memory commit graph for testing without a real repository
pub struct MockHistory {
    config: HistoryConfig,
    parents: HashMap<String, Vec<String>>,
    order: Vec<String>,
    branches: BTreeMap<String, String>,
    head: Option<String>,
    checked_out: Option<String>,
    fail_on: Option<&'static str>,
}

impl MockHistory {
    /// Create a new empty mock history
    pub fn new(config: HistoryConfig) -> Self {
        MockHistory {
            config,
            parents: HashMap::new(),
            order: Vec::new(),
            branches: BTreeMap::new(),
            head: None,
            checked_out: None,
            fail_on: None,
        }
    }

    /// Add a commit with the given parents (first parent first)
    pub fn add_commit(&mut self, id: impl Into<String>, parents: &[&str]) {
        let id = id.into();
        self.parents
            .insert(id.clone(), parents.iter().map(|p| p.to_string()).collect());
        self.order.push(id);
    }

    /// Add a run of commits, each the child of the previous one
    pub fn add_chain(&mut self, parent: Option<&str>, ids: &[&str]) {
        let mut previous = parent.map(|p| p.to_string());
        for id in ids {
            match &previous {
                Some(p) => self.add_commit(*id, &[p.as_str()]),
                None => self.add_commit(*id, &[]),
            }
            previous = Some(id.to_string());
        }
    }

    /// Point a branch at a commit. Names may carry the remote prefix.
    pub fn set_branch(&mut self, name: impl Into<String>, tip: impl Into<String>) {
        self.branches.insert(name.into(), tip.into());
    }

    /// Check out a branch; HEAD follows its tip
    pub fn checkout(&mut self, branch: impl Into<String>) {
        self.checked_out = Some(branch.into());
        self.head = None;
    }

    /// Detach HEAD at a commit
    pub fn detach(&mut self, commit: impl Into<String>) {
        self.checked_out = None;
        self.head = Some(commit.into());
    }

    /// Make every call of the named query fail
    pub fn fail_on(&mut self, query: &'static str) {
        self.fail_on = Some(query);
    }

    fn check(&self, query: &'static str) -> Result<()> {
        if self.fail_on == Some(query) {
            return Err(VersionerError::remote(format!("injected failure in {}", query)));
        }
        Ok(())
    }

    fn branch_tip(&self, name: &str) -> Option<&String> {
        let name = strip_remote(name, &self.config.remote);
        self.branches
            .get(&format!("{}/{}", self.config.remote, name))
            .or_else(|| self.branches.get(name))
    }

    fn resolve(&self, spec: &str) -> Result<String> {
        if spec == "HEAD" {
            return self.head_commit();
        }
        if let Some(tip) = self.branch_tip(spec) {
            return Ok(tip.clone());
        }
        self.order
            .iter()
            .find(|id| same_commit(id, spec))
            .cloned()
            .ok_or_else(|| VersionerError::branch(format!("Cannot resolve '{}'", spec)))
    }

    fn head_commit(&self) -> Result<String> {
        if let Some(branch) = &self.checked_out {
            return self
                .branch_tip(branch)
                .cloned()
                .ok_or_else(|| VersionerError::branch(format!("Branch not found: {}", branch)));
        }
        self.head
            .clone()
            .ok_or_else(|| VersionerError::branch("HEAD is not set"))
    }

    /// Every commit reachable from `id`, including itself
    fn ancestors(&self, id: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(parents) = self.parents.get(&current) {
                stack.extend(parents.iter().cloned());
            }
        }
        seen
    }
}

impl HistoryProvider for MockHistory {
    fn config(&self) -> &HistoryConfig {
        &self.config
    }

    fn get_all_branches(&self) -> Result<Vec<String>> {
        self.check("get_all_branches")?;
        Ok(self.branches.keys().cloned().collect())
    }

    fn get_branch_for_commit(&self, commit: &str) -> Result<String> {
        self.check("get_branch_for_commit")?;
        let id = self.resolve(commit)?;

        if let Some(branch) = &self.checked_out {
            if self.branch_tip(branch) == Some(&id) {
                return Ok(branch.clone());
            }
        }

        let matcher = self.config.release_matcher()?;
        for candidate in candidate_branches(self.branches.keys(), &self.config, &matcher) {
            let tip = self.resolve(&candidate)?;
            if self.ancestors(&tip).contains(&id) {
                return Ok(candidate);
            }
        }

        for (name, tip) in &self.branches {
            if *tip == id {
                return Ok(strip_remote(name, &self.config.remote).to_string());
            }
        }

        Ok(id)
    }

    fn get_merge_base(&self, a: &str, b: &str) -> Result<String> {
        self.check("get_merge_base")?;
        let a = self.ancestors(&self.resolve(a)?);
        let b = self.ancestors(&self.resolve(b)?);
        let common: Vec<&String> = self.order.iter().filter(|id| a.contains(*id) && b.contains(*id)).collect();

        // best common ancestor: one that no other common ancestor descends from
        common
            .iter()
            .find(|candidate| {
                !common
                    .iter()
                    .any(|other| other != *candidate && self.ancestors(other).contains(**candidate))
            })
            .map(|id| id.to_string())
            .ok_or_else(|| VersionerError::branch("No merge base found"))
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        self.check("is_ancestor")?;
        let ancestor = self.resolve(ancestor)?;
        let descendant = self.resolve(descendant)?;
        Ok(self.ancestors(&descendant).contains(&ancestor))
    }

    fn get_distance(&self, from: &str, to: &str) -> Result<u32> {
        self.check("get_distance")?;
        let excluded = self.ancestors(&self.resolve(from)?);
        let included = self.ancestors(&self.resolve(to)?);
        Ok(included.difference(&excluded).count() as u32)
    }

    fn get_first_commit(&self) -> Result<String> {
        self.check("get_first_commit")?;
        let mut current = self.resolve(&self.config.default_branch)?;
        while let Some(parent) = self.parents.get(&current).and_then(|p| p.first()) {
            current = parent.clone();
        }
        Ok(current)
    }

    fn get_head_sha(&self) -> Result<String> {
        self.check("get_head_sha")?;
        self.head_commit()
    }
}
