//! [`VersionControl`] backed by libgit2, for hosts without a `git` binary.

use std::collections::HashMap;
use std::path::Path;

use git2::{BranchType, ErrorCode, Oid, Repository, Sort, StatusOptions};
use tracing::debug;

use crate::domain::{last_name, tag, HEAD};
use crate::error::Result;
use crate::git::VersionControl;

/// Opens the repository with `git2` for every operation.
#[derive(Debug, Clone)]
pub struct Git2Client {
    remote: String,
}

impl Default for Git2Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Git2Client {
    pub fn new() -> Self {
        Git2Client {
            remote: "origin".to_string(),
        }
    }

    /// Remote used for fetching and pushing tags.
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    fn open(&self, repo: &Path) -> Result<Repository> {
        Ok(Repository::open(repo)?)
    }

    /// Maps each tagged commit to its semver tags, highest version first.
    fn tagged_commits(&self, repo: &Repository) -> Result<HashMap<Oid, Vec<String>>> {
        let names = repo.tag_names(None)?;
        let mut by_commit: HashMap<Oid, Vec<String>> = HashMap::new();
        for name in tag::filter_and_sort(names.iter().flatten()) {
            let reference = repo.find_reference(&format!("refs/tags/{}", name))?;
            // Tags pointing at trees or blobs carry no version history.
            if let Ok(commit) = reference.peel_to_commit() {
                by_commit.entry(commit.id()).or_default().push(name);
            }
        }
        Ok(by_commit)
    }
}

/// HEAD names a branch without commits. libgit2 reports this as either
/// `UnbornBranch` or `NotFound` depending on the call.
fn is_unborn(e: &git2::Error) -> bool {
    matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound)
}

/// Remote callbacks trying the SSH agent, then the usual key files, then
/// the default credential helper.
fn remote_callbacks<'a>() -> git2::RemoteCallbacks<'a> {
    let mut callbacks = git2::RemoteCallbacks::new();
    callbacks.credentials(|_url, username_from_url, allowed_types| {
        let username = username_from_url.unwrap_or("git");
        if allowed_types.contains(git2::CredentialType::SSH_KEY) {
            if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                return Ok(cred);
            }
            if let Some(home) = dirs::home_dir() {
                for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                    let path = home.join(".ssh").join(key);
                    if path.exists() {
                        if let Ok(cred) = git2::Cred::ssh_key(username, None, &path, None) {
                            return Ok(cred);
                        }
                    }
                }
            }
        }
        git2::Cred::default()
    });
    callbacks
}

impl VersionControl for Git2Client {
    fn list_tags(&self, repo: &Path) -> Result<Vec<String>> {
        let repo = self.open(repo)?;
        let names = repo.tag_names(None)?;
        let tags = tag::filter_and_sort(names.iter().flatten());
        Ok(tags)
    }

    fn current_tree_hash(&self, repo: &Path) -> Result<String> {
        let repo = self.open(repo)?;
        let mut index = repo.index()?;
        Ok(index.write_tree()?.to_string())
    }

    fn hashes_for_tag(&self, repo: &Path, tag: &str) -> Result<(String, String)> {
        let repo = self.open(repo)?;
        let commit = repo.revparse_single(tag)?.peel_to_commit()?;
        Ok((commit.id().to_string(), commit.tree_id().to_string()))
    }

    fn closest_tag(&self, repo: &Path, from: &str) -> Result<String> {
        let repo = self.open(repo)?;
        let tagged = self.tagged_commits(&repo)?;
        if tagged.is_empty() {
            return Ok(String::new());
        }

        let start = if from == HEAD {
            // Start from the most recently committed tagged commit.
            let mut latest: Option<(i64, Oid)> = None;
            for oid in tagged.keys() {
                let time = repo.find_commit(*oid)?.time().seconds();
                if latest.map_or(true, |(t, _)| time > t) {
                    latest = Some((time, *oid));
                }
            }
            match latest {
                Some((_, oid)) => oid,
                None => return Ok(String::new()),
            }
        } else {
            repo.revparse_single(from)?.peel_to_commit()?.id()
        };

        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push(start)?;
        for oid in revwalk {
            if let Some(names) = tagged.get(&oid?) {
                if let Some(name) = names.first() {
                    return Ok(name.clone());
                }
            }
        }
        Ok(String::new())
    }

    fn current_branch(&self, repo: &Path) -> Result<String> {
        let repo = self.open(repo)?;
        let branch = match repo.head() {
            Ok(head) if head.is_branch() => head.shorthand().unwrap_or_default().to_string(),
            Ok(_) => String::new(),
            Err(e) if is_unborn(&e) => {
                let head = repo.find_reference(HEAD)?;
                let name = head
                    .symbolic_target()
                    .and_then(|t| t.strip_prefix("refs/heads/"))
                    .unwrap_or_default()
                    .to_string();
                name
            }
            Err(e) => return Err(e.into()),
        };
        Ok(branch)
    }

    fn branches_containing_tag(&self, repo: &Path, tag: &str) -> Result<Vec<String>> {
        let tag = tag.strip_prefix("refs/").unwrap_or(tag);
        let tag = tag.strip_prefix("tags/").unwrap_or(tag);
        let repo = self.open(repo)?;
        let target = repo
            .find_reference(&format!("refs/tags/{}", tag))?
            .peel_to_commit()?
            .id();

        let mut branches = Vec::new();
        for entry in repo.branches(None)? {
            let (branch, _kind) = entry?;
            let name = match branch.name()? {
                Some(name) if !name.contains(HEAD) => name.to_string(),
                _ => continue,
            };
            let tip = match branch.get().target() {
                Some(tip) => tip,
                None => continue,
            };
            if tip != target && !repo.graph_descendant_of(tip, target)? {
                continue;
            }
            let name = last_name(&name).to_string();
            if branch.is_head() {
                return Ok(vec![name]);
            }
            branches.push(name);
        }
        Ok(branches)
    }

    fn build_count(&self, repo: &Path) -> Result<String> {
        let repo = self.open(repo)?;
        let mut revwalk = repo.revwalk()?;
        match revwalk.push_head() {
            Ok(()) => {}
            Err(e) if is_unborn(&e) => return Ok(String::new()),
            Err(e) => return Err(e.into()),
        }
        let count = revwalk.count();
        Ok(if count > 0 { count.to_string() } else { String::new() })
    }

    fn fetch_tags(&self, repo: &Path) -> Result<()> {
        let repo = self.open(repo)?;
        let mut remote = repo.find_remote(&self.remote)?;
        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks());
        remote.fetch(&["+refs/tags/*:refs/tags/*"], Some(&mut fetch_options), None)?;
        debug!(remote = %self.remote, "fetched tags");
        Ok(())
    }

    fn create_tag(&self, repo: &Path, tag: &str) -> Result<()> {
        if tag.is_empty() {
            return Ok(());
        }
        let repo = self.open(repo)?;
        let head = repo.head()?.peel_to_commit()?;
        repo.tag_lightweight(tag, head.as_object(), false)?;
        Ok(())
    }

    fn delete_tag(&self, repo: &Path, tag: &str) -> Result<()> {
        if tag.is_empty() {
            return Ok(());
        }
        self.open(repo)?.tag_delete(tag)?;
        Ok(())
    }

    fn push_tag(&self, repo: &Path, tag: &str) -> Result<()> {
        if tag.is_empty() {
            return Ok(());
        }
        let repo = self.open(repo)?;
        let mut remote = repo.find_remote(&self.remote)?;

        let mut callbacks = remote_callbacks();
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => Err(git2::Error::from_str(&format!(
                "Push failed for {}: {}",
                refname, status
            ))),
            None => Ok(()),
        });
        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let refspec = format!("refs/tags/{}:refs/tags/{}", tag, tag);
        remote.push(&[refspec.as_str()], Some(&mut push_options))?;
        debug!(remote = %self.remote, tag, "pushed tag");
        Ok(())
    }

    fn is_clean(&self, repo: &Path) -> Result<bool> {
        let repo = self.open(repo)?;
        let mut options = StatusOptions::new();
        options
            .include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);
        let clean = repo.statuses(Some(&mut options))?.is_empty();
        Ok(clean)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_outside_repository_fails() {
        let temp = tempfile::TempDir::new().unwrap();
        let client = Git2Client::new();
        assert!(client.list_tags(temp.path()).is_err());
    }

    #[test]
    fn test_empty_tag_operations_are_noops() {
        let client = Git2Client::new();
        let repo = Path::new("/nonexistent/repo");
        assert!(client.create_tag(repo, "").is_ok());
        assert!(client.delete_tag(repo, "").is_ok());
        assert!(client.push_tag(repo, "").is_ok());
    }
}
