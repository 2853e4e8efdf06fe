//! Main workflow orchestration logic
//!
//! Runs one complete resolution, from repository check to tag push, with
//! the CLI parsing kept in `main.rs`. Output goes to a caller-supplied
//! writer so the workflow can be driven programmatically.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::codegen;
use crate::domain::{VersionInfo, DEFAULT_RELEASE_BRANCHES};
use crate::env::Environment;
use crate::error::{GitSemverError, Result};
use crate::git::VersionControl;
use crate::resolver::Resolver;

/// Arguments for the workflow
///
/// Mirrors the CLI flags without depending on clap.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowArgs {
    /// Directory inside the working copy
    pub repo: PathBuf,

    /// Write here instead of the supplied writer; relative to the repository root
    pub out: Option<PathBuf>,

    /// Package name override for generated Go source
    pub name: Option<String>,

    /// Emit Go source instead of the bare version
    pub go_package: bool,

    /// Skip `git fetch --tags`
    pub no_fetch: bool,

    /// Omit the trailing newline
    pub no_newline: bool,

    /// Increment the patch level, then create and push the new tag
    pub inc_patch: bool,

    /// Fallback release branch names
    pub release_branches: Vec<String>,
}

impl Default for WorkflowArgs {
    fn default() -> Self {
        WorkflowArgs {
            repo: PathBuf::from("."),
            out: None,
            name: None,
            go_package: false,
            no_fetch: false,
            no_newline: false,
            inc_patch: false,
            release_branches: DEFAULT_RELEASE_BRANCHES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Result of a successful workflow
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowResult {
    /// What was resolved (after any patch increment)
    pub info: VersionInfo,

    /// The text that was written
    pub content: String,

    /// File written to, if not the supplied writer
    pub written_to: Option<PathBuf>,

    /// Tag created and pushed by `inc_patch`
    pub new_tag: Option<String>,
}

/// Runs the whole workflow:
/// 1. Check the repository
/// 2. Fetch tags (unless `no_fetch`)
/// 3. Resolve the version
/// 4. Optionally increment the patch level
/// 5. Write the version or Go source
/// 6. Create and push the new tag, if any
///
/// If anything fails after the new tag was created, the tag is deleted
/// again before the error is returned.
pub fn run_workflow<G, E>(
    git: G,
    env: E,
    args: &WorkflowArgs,
    stdout: &mut dyn Write,
) -> Result<WorkflowResult>
where
    G: VersionControl,
    E: Environment,
{
    let repo = git.check_repository(&args.repo)?;
    if !args.no_fetch {
        git.fetch_tags(&repo)?;
    }

    let mut resolver = Resolver::new(git, env).with_release_branches(args.release_branches.clone());
    let mut info = resolver.resolve(&repo)?;
    let git = resolver.git();

    let new_tag = if args.inc_patch {
        Some(info.increment_patch()?)
    } else {
        None
    };

    let content = render(&info, &repo, args)?;
    let written_to = write_output(&repo, args.out.as_deref(), &content, stdout)?;

    if let Some(tag) = &new_tag {
        git.create_tag(&repo, tag)?;
        debug!(tag = %tag, "created tag");
        if let Err(e) = git.push_tag(&repo, tag) {
            rollback_tag(git, &repo, tag);
            return Err(e);
        }
    }

    Ok(WorkflowResult {
        info,
        content,
        written_to,
        new_tag,
    })
}

/// Deletes a tag created by this run. Failures are only logged.
fn rollback_tag<G: VersionControl>(git: &G, repo: &Path, tag: &str) {
    if let Err(e) = git.delete_tag(repo, tag) {
        warn!(tag, error = %e, "could not delete tag");
    }
}

/// The version line or the Go source, with the trailing newline unless disabled.
fn render(info: &VersionInfo, repo: &Path, args: &WorkflowArgs) -> Result<String> {
    let mut content = if args.go_package {
        codegen::go_package(info, repo, args.name.as_deref())?
    } else {
        info.version()
    };
    if !args.no_newline {
        content.push('\n');
    }
    Ok(content)
}

fn write_output(
    repo: &Path,
    out: Option<&Path>,
    content: &str,
    stdout: &mut dyn Write,
) -> Result<Option<PathBuf>> {
    match out.filter(|p| !p.as_os_str().is_empty()) {
        Some(path) => {
            let path = repo.join(path);
            fs::write(&path, content)?;
            Ok(Some(path))
        }
        None => {
            stdout.write_all(content.as_bytes())?;
            stdout.flush()?;
            Ok(None)
        }
    }
}

/// Process exit code for a failed run: the OS error code behind the
/// failure when there is one, else 125.
pub fn exit_code(err: &GitSemverError) -> i32 {
    err.raw_os_error().filter(|&code| code != 0).unwrap_or(125)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnvironment;
    use crate::git::MockRepository;

    #[test]
    fn test_workflow_args_default() {
        let args = WorkflowArgs::default();
        assert_eq!(args.repo, PathBuf::from("."));
        assert!(!args.inc_patch);
        assert_eq!(args.release_branches, vec!["default", "master", "main"]);
    }

    #[test]
    fn test_run_workflow_prints_version() {
        let mut out = Vec::new();
        let result = run_workflow(
            MockRepository::with_tagged_history(),
            MapEnvironment::new(),
            &WorkflowArgs::default(),
            &mut out,
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "v6.0.0-main.build\n");
        assert_eq!(result.content, "v6.0.0-main.build\n");
        assert_eq!(result.new_tag, None);
    }

    #[test]
    fn test_run_workflow_no_newline() {
        let mut out = Vec::new();
        let args = WorkflowArgs {
            no_newline: true,
            ..WorkflowArgs::default()
        };
        run_workflow(
            MockRepository::with_tagged_history(),
            MapEnvironment::new(),
            &args,
            &mut out,
        )
        .unwrap();
        assert_eq!(out, b"v6.0.0-main.build");
    }

    #[test]
    fn test_exit_code() {
        let io = std::io::Error::from_raw_os_error(13);
        assert_eq!(exit_code(&GitSemverError::Io(io)), 13);
        assert_eq!(exit_code(&GitSemverError::config("x")), 125);
    }
}
