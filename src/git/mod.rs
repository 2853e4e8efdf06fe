//! Git operations abstraction layer
//!
//! The resolver only needs a narrow set of read and write operations on a
//! repository. They are expressed by the [`VersionControl`] trait so that
//! the resolver can be driven by real repositories as well as fixtures.
//!
//! # Implementations
//!
//! - [`command::GitCommand`]: shells out to the `git` executable
//! - [`libgit2::Git2Client`]: uses libgit2 through the `git2` crate
//! - [`mock::MockRepository`]: deterministic fixture data for tests
//!
//! ```rust,no_run
//! # use git_semver::git::{GitCommand, VersionControl};
//! # fn example() -> git_semver::Result<()> {
//! let git = GitCommand::new("git")?;
//! let repo = git.check_repository(".".as_ref())?;
//! let tags = git.list_tags(&repo)?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod libgit2;
pub mod mock;

pub use command::GitCommand;
pub use libgit2::Git2Client;
pub use mock::{MockCommit, MockRepository};

use std::path::{Path, PathBuf};

use crate::error::{GitSemverError, Result};

/// Repository operations needed to resolve a version.
///
/// Every operation is scoped to a repository path previously returned by
/// [`VersionControl::check_repository`]. Operations taking a tag name are
/// no-ops when the name is empty.
pub trait VersionControl {
    /// Returns the absolute root of the working copy containing `dir`.
    ///
    /// Fails with [`GitSemverError::NotARepository`] when neither `dir`
    /// nor any of its parents has a `.git` directory.
    fn check_repository(&self, dir: &Path) -> Result<PathBuf> {
        find_repository_root(dir)
    }

    /// All semver-like tags, highest version first.
    fn list_tags(&self, repo: &Path) -> Result<Vec<String>>;

    /// Hash of the tree that would be committed right now.
    fn current_tree_hash(&self, repo: &Path) -> Result<String>;

    /// Commit and tree hashes of a tag or other revision.
    fn hashes_for_tag(&self, repo: &Path, tag: &str) -> Result<(String, String)>;

    /// Nearest semver tag reachable from `from`. Empty if there is none.
    ///
    /// For `HEAD` the search starts at the most recent tagged commit.
    fn closest_tag(&self, repo: &Path, from: &str) -> Result<String>;

    /// Checked out branch, or an empty string when detached.
    fn current_branch(&self, repo: &Path) -> Result<String>;

    /// Branches containing `tag`. If the checked out branch is among them
    /// it is the only one returned.
    fn branches_containing_tag(&self, repo: &Path, tag: &str) -> Result<Vec<String>>;

    /// Number of commits reachable from HEAD, or empty when unknown or zero.
    fn build_count(&self, repo: &Path) -> Result<String>;

    /// Fetches tags from the remote.
    fn fetch_tags(&self, repo: &Path) -> Result<()>;

    /// Creates a lightweight tag at HEAD.
    fn create_tag(&self, repo: &Path, tag: &str) -> Result<()>;

    /// Deletes a local tag.
    fn delete_tag(&self, repo: &Path, tag: &str) -> Result<()>;

    /// Pushes a tag to the remote.
    fn push_tag(&self, repo: &Path, tag: &str) -> Result<()>;

    /// True if no tracked file has uncommitted changes.
    fn is_clean(&self, repo: &Path) -> Result<bool>;
}

macro_rules! forward_version_control {
    ($($ty:ty),+) => {$(
        impl<V: VersionControl + ?Sized> VersionControl for $ty {
            fn check_repository(&self, dir: &Path) -> Result<PathBuf> {
                (**self).check_repository(dir)
            }
            fn list_tags(&self, repo: &Path) -> Result<Vec<String>> {
                (**self).list_tags(repo)
            }
            fn current_tree_hash(&self, repo: &Path) -> Result<String> {
                (**self).current_tree_hash(repo)
            }
            fn hashes_for_tag(&self, repo: &Path, tag: &str) -> Result<(String, String)> {
                (**self).hashes_for_tag(repo, tag)
            }
            fn closest_tag(&self, repo: &Path, from: &str) -> Result<String> {
                (**self).closest_tag(repo, from)
            }
            fn current_branch(&self, repo: &Path) -> Result<String> {
                (**self).current_branch(repo)
            }
            fn branches_containing_tag(&self, repo: &Path, tag: &str) -> Result<Vec<String>> {
                (**self).branches_containing_tag(repo, tag)
            }
            fn build_count(&self, repo: &Path) -> Result<String> {
                (**self).build_count(repo)
            }
            fn fetch_tags(&self, repo: &Path) -> Result<()> {
                (**self).fetch_tags(repo)
            }
            fn create_tag(&self, repo: &Path, tag: &str) -> Result<()> {
                (**self).create_tag(repo, tag)
            }
            fn delete_tag(&self, repo: &Path, tag: &str) -> Result<()> {
                (**self).delete_tag(repo, tag)
            }
            fn push_tag(&self, repo: &Path, tag: &str) -> Result<()> {
                (**self).push_tag(repo, tag)
            }
            fn is_clean(&self, repo: &Path) -> Result<bool> {
                (**self).is_clean(repo)
            }
        }
    )+};
}

forward_version_control!(Box<V>, &V);

/// Walks up from `dir` looking for a directory holding a `.git` directory.
///
/// A `.git` file (as used by worktrees and submodules) does not count.
pub fn find_repository_root(dir: &Path) -> Result<PathBuf> {
    let start = std::path::absolute(dir)?;
    for candidate in start.ancestors() {
        if candidate.join(".git").is_dir() {
            return Ok(candidate.to_path_buf());
        }
    }
    Err(GitSemverError::NotARepository { path: start })
}
