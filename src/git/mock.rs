use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::domain::{tag, HEAD};
use crate::error::{GitExecError, GitSemverError, Result};
use crate::git::VersionControl;

/// One commit of a mock history.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCommit {
    pub commit: String,
    pub tree: String,
    pub tag: Option<String>,
}

impl MockCommit {
    pub fn new(commit: &str, tree: &str, tag: Option<&str>) -> Self {
        MockCommit {
            commit: commit.to_string(),
            tree: tree.to_string(),
            tag: tag.map(str::to_string),
        }
    }
}

/// Mock repository for testing without actual git operations
///
/// The history is linear and listed newest first, starting with `HEAD`.
/// The only valid repository path is the one given to
/// [`MockRepository::at`] (`.` by default).
pub struct MockRepository {
    path: PathBuf,
    history: Vec<MockCommit>,
    branch: String,
    working_tree: Option<String>,
    dirty: bool,
    build: String,
    tag_branches: HashMap<String, Vec<String>>,
    failing: HashSet<&'static str>,
    created: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    pushed: Mutex<Vec<String>>,
}

impl MockRepository {
    /// Create a new mock repository with a single untagged `HEAD` commit
    pub fn new() -> Self {
        MockRepository {
            path: PathBuf::from("."),
            history: vec![MockCommit::new(HEAD, "tree-HEAD", None)],
            branch: "main".to_string(),
            working_tree: None,
            dirty: false,
            build: "build".to_string(),
            tag_branches: HashMap::new(),
            failing: HashSet::new(),
            created: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            pushed: Mutex::new(Vec::new()),
        }
    }

    /// Six commits tagged `v2.0.0`, `v4.0.0` and `v6.0.0`, with an
    /// untagged `HEAD` on top.
    pub fn with_tagged_history() -> Self {
        let mut repo = Self::new();
        repo.history = vec![
            MockCommit::new(HEAD, "tree-HEAD", None),
            MockCommit::new("commit-6", "tree-6", Some("v6.0.0")),
            MockCommit::new("commit-5", "tree-5", None),
            MockCommit::new("commit-4", "tree-4", Some("v4.0.0")),
            MockCommit::new("commit-3", "tree-3", None),
            MockCommit::new("commit-2", "tree-2", Some("v2.0.0")),
            MockCommit::new("commit-1", "tree-1", None),
        ];
        repo
    }

    pub fn at(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Replace the history (newest first).
    pub fn set_history(&mut self, history: Vec<MockCommit>) {
        self.history = history;
    }

    /// Set the checked out branch. An empty name means detached HEAD.
    pub fn set_branch(&mut self, branch: impl Into<String>) {
        self.branch = branch.into();
    }

    /// Make the working tree hash to `tree` instead of `HEAD`'s tree.
    pub fn set_working_tree(&mut self, tree: impl Into<String>) {
        self.working_tree = Some(tree.into());
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn set_build(&mut self, build: impl Into<String>) {
        self.build = build.into();
    }

    /// Branches reported as containing `tag`.
    pub fn set_tag_branches(&mut self, tag: impl Into<String>, branches: &[&str]) {
        self.tag_branches.insert(
            tag.into(),
            branches.iter().map(|b| b.to_string()).collect(),
        );
    }

    /// Make the named operation (e.g. `"push_tag"`) fail.
    pub fn fail_on(&mut self, operation: &'static str) {
        self.failing.insert(operation);
    }

    pub fn created_tags(&self) -> Vec<String> {
        self.created.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn deleted_tags(&self) -> Vec<String> {
        self.deleted.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn pushed_tags(&self) -> Vec<String> {
        self.pushed.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn check(&self, operation: &'static str, repo: &Path) -> Result<()> {
        if self.failing.contains(operation) || repo != self.path {
            return Err(GitExecError::new("mockgit", &[operation], None, "mock failure").into());
        }
        Ok(())
    }

    fn record(list: &Mutex<Vec<String>>, tag: &str) {
        if let Ok(mut list) = list.lock() {
            list.push(tag.to_string());
        }
    }

    fn find(&self, name: &str) -> Option<&MockCommit> {
        self.history
            .iter()
            .find(|c| c.commit == name || c.tag.as_deref() == Some(name))
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionControl for MockRepository {
    fn check_repository(&self, dir: &Path) -> Result<PathBuf> {
        if dir == self.path {
            Ok(self.path.clone())
        } else {
            Err(GitSemverError::NotARepository {
                path: dir.to_path_buf(),
            })
        }
    }

    fn list_tags(&self, repo: &Path) -> Result<Vec<String>> {
        self.check("list_tags", repo)?;
        Ok(tag::filter_and_sort(
            self.history.iter().filter_map(|c| c.tag.as_deref()),
        ))
    }

    fn current_tree_hash(&self, repo: &Path) -> Result<String> {
        self.check("current_tree_hash", repo)?;
        Ok(match &self.working_tree {
            Some(tree) => tree.clone(),
            None => self.find(HEAD).map(|c| c.tree.clone()).unwrap_or_default(),
        })
    }

    fn hashes_for_tag(&self, repo: &Path, tag: &str) -> Result<(String, String)> {
        self.check("hashes_for_tag", repo)?;
        Ok(self
            .find(tag)
            .map(|c| (c.commit.clone(), c.tree.clone()))
            .unwrap_or_default())
    }

    fn closest_tag(&self, repo: &Path, from: &str) -> Result<String> {
        self.check("closest_tag", repo)?;
        Ok(self
            .history
            .iter()
            .skip_while(|c| c.commit != from)
            .find_map(|c| c.tag.clone())
            .unwrap_or_default())
    }

    fn current_branch(&self, repo: &Path) -> Result<String> {
        self.check("current_branch", repo)?;
        Ok(self.branch.clone())
    }

    fn branches_containing_tag(&self, repo: &Path, tag: &str) -> Result<Vec<String>> {
        self.check("branches_containing_tag", repo)?;
        let branches = self.tag_branches.get(tag).cloned().unwrap_or_default();
        if branches.contains(&self.branch) {
            return Ok(vec![self.branch.clone()]);
        }
        Ok(branches)
    }

    fn build_count(&self, repo: &Path) -> Result<String> {
        self.check("build_count", repo)?;
        Ok(self.build.clone())
    }

    fn fetch_tags(&self, repo: &Path) -> Result<()> {
        self.check("fetch_tags", repo)
    }

    fn create_tag(&self, repo: &Path, tag: &str) -> Result<()> {
        if tag.is_empty() {
            return Ok(());
        }
        self.check("create_tag", repo)?;
        Self::record(&self.created, tag);
        Ok(())
    }

    fn delete_tag(&self, repo: &Path, tag: &str) -> Result<()> {
        if tag.is_empty() {
            return Ok(());
        }
        self.check("delete_tag", repo)?;
        Self::record(&self.deleted, tag);
        Ok(())
    }

    fn push_tag(&self, repo: &Path, tag: &str) -> Result<()> {
        if tag.is_empty() {
            return Ok(());
        }
        self.check("push_tag", repo)?;
        Self::record(&self.pushed, tag);
        Ok(())
    }

    fn is_clean(&self, repo: &Path) -> Result<bool> {
        self.check("is_clean", repo)?;
        Ok(!self.dirty)
    }
}
