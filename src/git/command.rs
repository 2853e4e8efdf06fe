//! [`VersionControl`] implemented by running the `git` executable.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::domain::{last_name, tag, HEAD};
use crate::error::{ExecCause, GitExecError, GitSemverError, Result};
use crate::git::VersionControl;

/// Runs `git -C <repo> ...` for every operation.
#[derive(Debug, Clone)]
pub struct GitCommand {
    git: PathBuf,
    remote: String,
}

impl GitCommand {
    /// Locates `git` (a path, or a name searched on `PATH`).
    ///
    /// # Returns
    /// * `Ok(GitCommand)` - The executable exists
    /// * `Err(GitSemverError::GitNotFound)` - It could not be located
    pub fn new(git: impl AsRef<Path>) -> Result<Self> {
        let git = look_path(git.as_ref())?;
        Ok(GitCommand {
            git,
            remote: "origin".to_string(),
        })
    }

    /// Remote used by [`VersionControl::push_tag`].
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    pub fn git_path(&self) -> &Path {
        &self.git
    }

    /// Runs git with `args` and returns trimmed stdout.
    pub fn exec(&self, args: &[&str]) -> Result<String> {
        let program = self.git.display().to_string();
        let output = Command::new(&self.git)
            .args(args)
            .output()
            .map_err(|e| GitExecError::new(&program, args, Some(ExecCause::Spawn(e)), ""));
        let result = output.and_then(|output| {
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(
                command = %format!("{} {}", program, args.join(" ")),
                stdout = stdout.len(),
                stderr = stderr.len(),
                status = %output.status,
            );
            if output.status.success() {
                Ok(stdout)
            } else {
                Err(GitExecError::new(
                    &program,
                    args,
                    Some(ExecCause::Status(output.status)),
                    stderr,
                ))
            }
        });
        if let Err(e) = &result {
            debug!(error = %e, "git failed");
        }
        result.map_err(GitSemverError::from)
    }

    fn exec_in(&self, repo: &Path, args: &[&str]) -> Result<String> {
        let repo = repo.to_string_lossy();
        let mut full = vec!["-C", &*repo];
        full.extend_from_slice(args);
        self.exec(&full)
    }
}

/// Resolves `git` the way a shell would.
fn look_path(git: &Path) -> Result<PathBuf> {
    let not_found = || GitSemverError::GitNotFound(git.display().to_string());
    if git.components().count() > 1 {
        return if git.is_file() {
            Ok(git.to_path_buf())
        } else {
            Err(not_found())
        };
    }
    let path = std::env::var_os("PATH").ok_or_else(not_found)?;
    std::env::split_paths(&path)
        .flat_map(|dir| {
            let candidate = dir.join(git);
            let exe = candidate.with_extension(std::env::consts::EXE_EXTENSION);
            [candidate, exe]
        })
        .find(|candidate| candidate.is_file())
        .ok_or_else(not_found)
}

impl VersionControl for GitCommand {
    fn list_tags(&self, repo: &Path) -> Result<Vec<String>> {
        let out = self.exec_in(repo, &["tag", "--sort=-v:refname"])?;
        // git's version sort already orders them; filtering keeps that order.
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|t| tag::is_semver_tag(t))
            .map(String::from)
            .collect())
    }

    fn current_tree_hash(&self, repo: &Path) -> Result<String> {
        self.exec_in(repo, &["write-tree"])
    }

    fn hashes_for_tag(&self, repo: &Path, tag: &str) -> Result<(String, String)> {
        // Peel annotated tags so the commit hash is never a tag object.
        let commit_ref = format!("{}^{{commit}}", tag);
        let tree_ref = format!("{}^{{tree}}", tag);
        let out = self.exec_in(repo, &["rev-parse", &commit_ref, &tree_ref])?;
        let hashes: Vec<&str> = out.lines().map(str::trim).collect();
        match hashes.as_slice() {
            [commit, tree] => Ok((commit.to_string(), tree.to_string())),
            _ => Ok((String::new(), String::new())),
        }
    }

    fn closest_tag(&self, repo: &Path, from: &str) -> Result<String> {
        if from == HEAD {
            let latest = self.exec_in(repo, &["rev-list", "--tags", "--max-count=1"])?;
            // The newest tagged commit may carry only non-version tags or
            // sit off HEAD's history; describing HEAD itself is the fallback.
            if !latest.is_empty() {
                match self.closest_tag(repo, latest.trim()) {
                    Ok(tag) if !tag.is_empty() => return Ok(tag),
                    Ok(_) => {}
                    Err(e) => debug!(error = %e, "no version tag at newest tagged commit"),
                }
            }
        }
        self.exec_in(
            repo,
            &[
                "describe",
                "--tags",
                "--match=v[0-9]*",
                "--match=[0-9]*",
                "--abbrev=0",
                from,
            ],
        )
    }

    fn current_branch(&self, repo: &Path) -> Result<String> {
        self.exec_in(repo, &["branch", "--show-current"])
    }

    fn branches_containing_tag(&self, repo: &Path, tag: &str) -> Result<Vec<String>> {
        let tag = tag.strip_prefix("refs/").unwrap_or(tag);
        let tag = tag.strip_prefix("tags/").unwrap_or(tag);
        let tag_ref = format!("tags/{}", tag);
        let out = self.exec_in(
            repo,
            &["branch", "--all", "--no-color", "--contains", &tag_ref],
        )?;
        Ok(parse_branch_listing(&out))
    }

    fn build_count(&self, repo: &Path) -> Result<String> {
        // Fails without any commit, which counts as unknown.
        let out = match self.exec_in(repo, &["rev-list", "HEAD", "--count"]) {
            Ok(out) => out,
            Err(e) => {
                debug!(error = %e, "no build count");
                return Ok(String::new());
            }
        };
        Ok(match out.trim().parse::<u64>() {
            Ok(n) if n > 0 => n.to_string(),
            _ => String::new(),
        })
    }

    fn fetch_tags(&self, repo: &Path) -> Result<()> {
        self.exec_in(repo, &["fetch", "--tags"]).map(|_| ())
    }

    fn create_tag(&self, repo: &Path, tag: &str) -> Result<()> {
        if tag.is_empty() {
            return Ok(());
        }
        self.exec_in(repo, &["tag", tag]).map(|_| ())
    }

    fn delete_tag(&self, repo: &Path, tag: &str) -> Result<()> {
        if tag.is_empty() {
            return Ok(());
        }
        self.exec_in(repo, &["tag", "-d", tag]).map(|_| ())
    }

    fn push_tag(&self, repo: &Path, tag: &str) -> Result<()> {
        if tag.is_empty() {
            return Ok(());
        }
        self.exec_in(repo, &["push", &self.remote, tag]).map(|_| ())
    }

    fn is_clean(&self, repo: &Path) -> Result<bool> {
        let out = self.exec_in(repo, &["status", "--untracked-files=no", "--porcelain"])?;
        Ok(out.is_empty())
    }
}

/// Parses `git branch --all` output into plain branch names.
///
/// Symbolic entries (`HEAD`, `(HEAD detached at ...)`) are skipped. When the
/// checked out branch (marked `*`) is present it is the sole result.
fn parse_branch_listing(out: &str) -> Vec<String> {
    let mut branches = Vec::new();
    for line in out.lines() {
        let line = line.trim();
        if line.len() < 2 || line.contains(HEAD) {
            continue;
        }
        let starred = line.starts_with('*');
        let name = line.trim_start_matches('*').trim();
        if name.is_empty() || name.contains(' ') {
            continue;
        }
        let name = last_name(name).to_string();
        if starred {
            return vec![name];
        }
        branches.push(name);
    }
    branches
}
