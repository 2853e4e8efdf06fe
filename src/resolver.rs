//! Version resolution.
//!
//! A [`Resolver`] combines a [`VersionControl`] client with an
//! [`Environment`] to work out which tag the working tree corresponds to,
//! which branch it was built from and whether that branch may produce
//! release versions. A resolver caches tag hashes, so create a fresh one
//! for every resolution.

use std::path::Path;

use tracing::debug;

use crate::domain::{TagRecord, VersionInfo, DEFAULT_RELEASE_BRANCHES, DEFAULT_TAG, HEAD};
use crate::env::{self, Environment};
use crate::error::Result;
use crate::git::VersionControl;

/// Environment variables consulted during resolution.
pub mod vars {
    pub const CI_COMMIT_TAG: &str = "CI_COMMIT_TAG";
    pub const CI_COMMIT_REF_NAME: &str = "CI_COMMIT_REF_NAME";
    pub const CI_COMMIT_REF_PROTECTED: &str = "CI_COMMIT_REF_PROTECTED";
    pub const CI_DEFAULT_BRANCH: &str = "CI_DEFAULT_BRANCH";
    pub const CI_PIPELINE_IID: &str = "CI_PIPELINE_IID";
    pub const GITHUB_REF_NAME: &str = "GITHUB_REF_NAME";
    pub const GITHUB_REF_TYPE: &str = "GITHUB_REF_TYPE";
    pub const GITHUB_REF_PROTECTED: &str = "GITHUB_REF_PROTECTED";
    pub const GITHUB_BASE_REF: &str = "GITHUB_BASE_REF";
    pub const GITHUB_RUN_NUMBER: &str = "GITHUB_RUN_NUMBER";
}

/// One step of a branch lookup chain.
type BranchSource<G, E> = fn(&mut Resolver<G, E>, &Path) -> Result<String>;

/// Single-use version resolution context.
pub struct Resolver<G, E> {
    git: G,
    env: E,
    release_branches: Vec<String>,
    clean: bool,
    tags: Vec<TagRecord>,
}

impl<G: VersionControl, E: Environment> Resolver<G, E> {
    pub fn new(git: G, env: E) -> Self {
        Resolver {
            git,
            env,
            release_branches: DEFAULT_RELEASE_BRANCHES.iter().map(|s| s.to_string()).collect(),
            clean: false,
            tags: Vec::new(),
        }
    }

    /// Branch names allowed to release when the CI says nothing about it.
    pub fn with_release_branches(mut self, branches: Vec<String>) -> Self {
        self.release_branches = branches;
        self
    }

    pub fn git(&self) -> &G {
        &self.git
    }

    /// Tag records looked up so far.
    pub fn tags(&self) -> &[TagRecord] {
        &self.tags
    }

    /// Environment variable value, trimmed.
    fn var(&self, name: &str) -> String {
        self.env.get(name).trim().to_string()
    }

    /// True if `branch` may produce versions without a suffix.
    ///
    /// Protected refs (GitLab or GitHub) always may. Otherwise only the
    /// default branch may: the one named by `CI_DEFAULT_BRANCH` if it is
    /// set, else a detached HEAD or one of the conventional default names.
    pub fn is_release_branch(&self, branch: &str) -> bool {
        if env::is_true(&self.env, vars::CI_COMMIT_REF_PROTECTED)
            || env::is_true(&self.env, vars::GITHUB_REF_PROTECTED)
        {
            return true;
        }
        if let Some(default_branch) = self.env.lookup(vars::CI_DEFAULT_BRANCH) {
            return branch == default_branch.trim();
        }
        branch.is_empty() || self.release_branches.iter().any(|b| b == branch)
    }

    /// Hashes of `tag`, looked up at most once per resolver.
    fn tag_record(&mut self, repo: &Path, tag: &str) -> Result<TagRecord> {
        if let Some(record) = self.tags.iter().find(|t| t.tag == tag) {
            return Ok(record.clone());
        }
        let (commit, tree) = self.git.hashes_for_tag(repo, tag)?;
        let record = TagRecord::new(tag, commit, tree);
        if !record.commit.is_empty() && !record.tree.is_empty() {
            self.tags.push(record.clone());
        }
        Ok(record)
    }

    /// Records the working tree as the `HEAD` pseudo tag.
    fn head_record(&mut self, repo: &Path) -> Result<TagRecord> {
        if let Some(record) = self.tags.iter().find(|t| t.is_head()) {
            return Ok(record.clone());
        }
        let tree = self.git.current_tree_hash(repo)?;
        let record = TagRecord::new(HEAD, "", tree);
        self.tags.push(record.clone());
        Ok(record)
    }

    /// Scans tags highest version first until one has the working tree's hash.
    fn examine_tags(&mut self, repo: &Path) -> Result<TagRecord> {
        self.clean = self.git.is_clean(repo)?;
        let head = self.head_record(repo)?;
        debug!(tree = %head.tree, clean = self.clean, "treehash HEAD");
        for tag in self.git.list_tags(repo)? {
            let record = self.tag_record(repo, &tag)?;
            if record.tree.is_empty() {
                continue;
            }
            debug!(tree = %record.tree, tag = %tag, "treehash");
            if record.tree == head.tree {
                break;
            }
        }
        Ok(head)
    }

    /// First known real tag whose tree is `tree`.
    fn known_tag_with_tree(&self, tree: &str) -> Option<&TagRecord> {
        self.tags.iter().find(|t| !t.is_head() && t.tree == tree)
    }

    /// The tag matching the working tree, else the closest one.
    ///
    /// The returned flag is true when the tree is clean and identical to
    /// the tag's tree. A non-blank `CI_COMMIT_TAG` wins outright.
    pub fn resolve_tag(&mut self, repo: &Path) -> Result<(String, bool)> {
        let ci_tag = self.var(vars::CI_COMMIT_TAG);
        if !ci_tag.is_empty() {
            return Ok((ci_tag, true));
        }

        let head = self.examine_tags(repo)?;
        if let Some(exact) = self.known_tag_with_tree(&head.tree) {
            return Ok((exact.tag.clone(), self.clean));
        }

        let closest = match self.git.closest_tag(repo, HEAD) {
            Ok(tag) => tag,
            Err(e) => {
                debug!(error = %e, "no closest tag");
                String::new()
            }
        };
        if closest.is_empty() {
            return Ok((DEFAULT_TAG.to_string(), false));
        }

        let mut found = self.tag_record(repo, &closest)?;
        if let Some(known) = self.known_tag_with_tree(&found.tree) {
            found = known.clone();
        }
        debug!(tree = %found.tree, tag = %found.tag, "closest to HEAD");
        let same_tree = self.clean && found.tree == head.tree;
        Ok((found.tag, same_tree))
    }

    /// Branch of the first tag-bearing branch that may release, else the
    /// first one found.
    fn branch_from_tag(&mut self, repo: &Path, tag: &str) -> Result<String> {
        let branches = self.git.branches_containing_tag(repo, tag)?;
        Ok(branches
            .iter()
            .find(|b| self.is_release_branch(b))
            .or_else(|| branches.first())
            .cloned()
            .unwrap_or_default())
    }

    fn branch_from_git(&mut self, repo: &Path) -> Result<String> {
        Ok(self.git.current_branch(repo)?.trim().to_string())
    }

    /// GitHub Actions: the PR base, or the branch holding a pushed tag.
    fn branch_from_github(&mut self, repo: &Path) -> Result<String> {
        let base = self.var(vars::GITHUB_BASE_REF);
        if !base.is_empty() {
            return Ok(base);
        }
        let ref_name = self.var(vars::GITHUB_REF_NAME);
        if ref_name.is_empty() {
            return Ok(String::new());
        }
        if self.var(vars::GITHUB_REF_TYPE) == "tag" {
            return self.branch_from_tag(repo, &ref_name);
        }
        Ok(ref_name)
    }

    /// GitLab CI: the ref name, unless it is really the pipeline's tag.
    fn branch_from_gitlab(&mut self, repo: &Path) -> Result<String> {
        let ref_name = self.var(vars::CI_COMMIT_REF_NAME);
        if ref_name.is_empty() {
            return Ok(String::new());
        }
        if self.var(vars::CI_COMMIT_TAG) == ref_name {
            return self.branch_from_tag(repo, &ref_name);
        }
        Ok(ref_name)
    }

    /// Current branch name, or an empty string when none can be found.
    ///
    /// Sources are tried in order: the checked out branch, then GitHub's
    /// variables, then GitLab's.
    pub fn resolve_branch(&mut self, repo: &Path) -> Result<String> {
        let sources: [BranchSource<G, E>; 3] = [
            Self::branch_from_git,
            Self::branch_from_github,
            Self::branch_from_gitlab,
        ];
        for source in sources {
            let branch = source(self, repo)?;
            if !branch.is_empty() {
                return Ok(branch);
            }
        }
        Ok(String::new())
    }

    /// Build counter: GitLab pipeline IID, GitHub run number, commit count.
    pub fn resolve_build(&mut self, repo: &Path) -> Result<String> {
        for name in [vars::CI_PIPELINE_IID, vars::GITHUB_RUN_NUMBER] {
            let build = self.var(name);
            if !build.is_empty() {
                return Ok(build);
            }
        }
        Ok(self.git.build_count(repo)?.trim().to_string())
    }

    /// Resolves everything about the working copy containing `dir`.
    pub fn resolve(&mut self, dir: &Path) -> Result<VersionInfo> {
        let repo = self.git.check_repository(dir)?;
        let (tag, same_tree) = self.resolve_tag(&repo)?;
        let mut info = VersionInfo {
            tag,
            same_tree,
            ..VersionInfo::default()
        };
        if !info.tag.is_empty() {
            info.build = self.resolve_build(&repo)?;
            info.branch = self.resolve_branch(&repo)?;
            info.is_release = self.is_release_branch(&info.branch);
            info.tags = self.tags.clone();
        }
        Ok(info)
    }
}
