// tests/git_backends_test.rs
//
// Runs both real backends against throwaway repositories built with git2.
use std::fs;
use std::path::Path;

use git2::{Oid, Repository, RepositoryInitOptions, Signature, Time};
use git_semver::env::MapEnvironment;
use git_semver::git::{Git2Client, GitCommand, VersionControl};
use git_semver::resolver::Resolver;
use tempfile::TempDir;

struct TestRepo {
    dir: TempDir,
    repo: Repository,
    commits: Vec<Oid>,
}

impl TestRepo {
    /// Three commits on `main`: `v1.0.0` and `notsemver` on the first,
    /// `v1.1.0` on the second, nothing on the third (HEAD).
    fn new() -> Self {
        let dir = TempDir::new().expect("Could not create temp dir");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).expect("Could not init git repo");

        let mut test_repo = TestRepo {
            dir,
            repo,
            commits: Vec::new(),
        };
        let first = test_repo.commit("first\n");
        let second = test_repo.commit("second\n");
        test_repo.commit("third\n");
        test_repo.tag("v1.0.0", first);
        test_repo.tag("notsemver", first);
        test_repo.tag("v1.1.0", second);
        test_repo
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Commits `content` as README.md, one minute after the previous commit.
    fn commit(&mut self, content: &str) -> Oid {
        fs::write(self.path().join("README.md"), content).expect("Could not write file");

        let mut index = self.repo.index().expect("Could not get index");
        index
            .add_path(Path::new("README.md"))
            .expect("Could not add file to index");
        index.write().expect("Could not write index");
        let tree_id = index.write_tree().expect("Could not write tree");
        let tree = self.repo.find_tree(tree_id).expect("Could not find tree");

        let when = Time::new(1_700_000_000 + 60 * self.commits.len() as i64, 0);
        let sig = Signature::new("Test User", "test@example.com", &when).expect("Could not get sig");
        let parent = self
            .commits
            .last()
            .map(|id| self.repo.find_commit(*id).expect("Could not find parent"));
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let id = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, content.trim(), &tree, &parents)
            .expect("Could not create commit");
        self.commits.push(id);
        id
    }

    fn tag(&self, name: &str, id: Oid) {
        let object = self.repo.find_object(id, None).expect("Could not find object");
        self.repo
            .tag_lightweight(name, &object, false)
            .expect("Could not create tag");
    }

    fn tree_of(&self, id: Oid) -> String {
        self.repo.find_commit(id).unwrap().tree_id().to_string()
    }

    fn detach_head(&self) {
        let head = *self.commits.last().unwrap();
        self.repo.set_head_detached(head).expect("Could not detach HEAD");
    }

    /// A parentless commit on `refs/heads/docs`, newer than everything on
    /// `main`, tagged `name`.
    fn tag_orphan(&self, name: &str) -> Oid {
        let first = self.repo.find_commit(self.commits[0]).unwrap();
        let tree = first.tree().unwrap();
        let when = Time::new(1_700_000_000 + 3600, 0);
        let sig = Signature::new("Test User", "test@example.com", &when).expect("Could not get sig");
        let id = self
            .repo
            .commit(Some("refs/heads/docs"), &sig, &sig, "docs", &tree, &[])
            .expect("Could not create commit");
        self.tag(name, id);
        id
    }

    /// Adds a bare repository as `origin`.
    fn add_origin(&self) -> TempDir {
        let remote_dir = TempDir::new().expect("Could not create temp dir");
        Repository::init_bare(remote_dir.path()).expect("Could not init bare repo");
        let url = remote_dir.path().to_str().expect("temp path is UTF-8");
        self.repo.remote("origin", url).expect("Could not add remote");
        remote_dir
    }
}

fn git_command() -> Option<GitCommand> {
    match GitCommand::new("git") {
        Ok(git) if git.exec(&["--version"]).is_ok() => Some(git),
        _ => {
            eprintln!("git executable not available, skipping");
            None
        }
    }
}

fn check_read_operations(git: &dyn VersionControl) {
    let test_repo = TestRepo::new();
    let nested = test_repo.path().join("sub").join("dir");
    fs::create_dir_all(&nested).unwrap();

    let root = git.check_repository(&nested).unwrap();
    assert_eq!(root, test_repo.path());

    assert_eq!(git.list_tags(&root).unwrap(), vec!["v1.1.0", "v1.0.0"]);

    let first = test_repo.commits[0];
    assert_eq!(
        git.hashes_for_tag(&root, "v1.0.0").unwrap(),
        (first.to_string(), test_repo.tree_of(first))
    );

    let head = *test_repo.commits.last().unwrap();
    assert_eq!(git.current_tree_hash(&root).unwrap(), test_repo.tree_of(head));

    assert_eq!(git.closest_tag(&root, "HEAD").unwrap(), "v1.1.0");
    assert_eq!(git.closest_tag(&root, &first.to_string()).unwrap(), "v1.0.0");

    assert_eq!(git.current_branch(&root).unwrap(), "main");
    assert_eq!(git.build_count(&root).unwrap(), "3");
    assert!(git.is_clean(&root).unwrap());

    fs::write(test_repo.path().join("untracked.txt"), "x").unwrap();
    assert!(git.is_clean(&root).unwrap());
    fs::write(test_repo.path().join("README.md"), "changed\n").unwrap();
    assert!(!git.is_clean(&root).unwrap());
}

fn check_branches_containing_tag(git: &dyn VersionControl) {
    let test_repo = TestRepo::new();
    let first = test_repo.repo.find_commit(test_repo.commits[0]).unwrap();
    test_repo.repo.branch("old", &first, false).unwrap();
    let root = git.check_repository(test_repo.path()).unwrap();

    // The checked out branch is the only answer when it has the tag.
    assert_eq!(git.branches_containing_tag(&root, "v1.0.0").unwrap(), vec!["main"]);
    assert_eq!(git.branches_containing_tag(&root, "tags/v1.1.0").unwrap(), vec!["main"]);

    test_repo.detach_head();
    assert_eq!(git.current_branch(&root).unwrap(), "");
    let mut branches = git.branches_containing_tag(&root, "v1.0.0").unwrap();
    branches.sort();
    assert_eq!(branches, vec!["main", "old"]);
}

fn check_tag_round_trip(git: &dyn VersionControl) {
    let test_repo = TestRepo::new();
    let _origin = test_repo.add_origin();
    let root = git.check_repository(test_repo.path()).unwrap();

    git.create_tag(&root, "v1.1.1").unwrap();
    assert_eq!(git.list_tags(&root).unwrap()[0], "v1.1.1");
    git.push_tag(&root, "v1.1.1").unwrap();

    git.delete_tag(&root, "v1.1.1").unwrap();
    assert_eq!(git.list_tags(&root).unwrap()[0], "v1.1.0");

    git.fetch_tags(&root).unwrap();
    assert_eq!(git.list_tags(&root).unwrap()[0], "v1.1.1");
}

fn check_resolution<G: VersionControl>(git: G) {
    let test_repo = TestRepo::new();
    let root = test_repo.path().to_path_buf();

    let info = Resolver::new(&git, MapEnvironment::new()).resolve(&root).unwrap();
    assert_eq!(info.version(), "v1.1.0-main.3");

    test_repo.tag("v1.2.0", *test_repo.commits.last().unwrap());
    let info = Resolver::new(&git, MapEnvironment::new()).resolve(&root).unwrap();
    assert_eq!(info.version(), "v1.2.0");

    fs::write(test_repo.path().join("README.md"), "dirty tree\n").unwrap();
    let info = Resolver::new(&git, MapEnvironment::new()).resolve(&root).unwrap();
    assert_eq!(info.version(), "v1.2.0-main.3");
}

fn check_newest_tag_off_history<G: VersionControl>(git: G) {
    let test_repo = TestRepo::new();
    test_repo.tag_orphan("docs-1");
    let root = test_repo.path().to_path_buf();

    assert_eq!(git.closest_tag(&root, "HEAD").unwrap(), "v1.1.0");
    let info = Resolver::new(&git, MapEnvironment::new()).resolve(&root).unwrap();
    assert_eq!(info.version(), "v1.1.0-main.3");
}

fn check_unborn_head<G: VersionControl>(git: G) {
    let dir = TempDir::new().expect("Could not create temp dir");
    let mut opts = RepositoryInitOptions::new();
    opts.initial_head("main");
    Repository::init_opts(dir.path(), &opts).expect("Could not init git repo");
    let root = git.check_repository(dir.path()).unwrap();

    assert_eq!(git.current_branch(&root).unwrap().trim(), "main");
    assert_eq!(git.build_count(&root).unwrap(), "");

    let info = Resolver::new(&git, MapEnvironment::new()).resolve(&root).unwrap();
    assert_eq!(info.version(), "v0.0.0-main");
}

#[test]
fn test_git2_read_operations() {
    check_read_operations(&Git2Client::new());
}

#[test]
fn test_git2_branches_containing_tag() {
    check_branches_containing_tag(&Git2Client::new());
}

#[test]
fn test_git2_tag_round_trip() {
    check_tag_round_trip(&Git2Client::new());
}

#[test]
fn test_git2_resolution() {
    check_resolution(Git2Client::new());
}

#[test]
fn test_git2_newest_tag_off_history() {
    check_newest_tag_off_history(Git2Client::new());
}

#[test]
fn test_git2_unborn_head() {
    check_unborn_head(Git2Client::new());
}

#[test]
fn test_git2_unknown_tag_fails() {
    let test_repo = TestRepo::new();
    assert!(Git2Client::new()
        .hashes_for_tag(test_repo.path(), "v9.9.9")
        .is_err());
}

#[test]
fn test_command_read_operations() {
    if let Some(git) = git_command() {
        check_read_operations(&git);
    }
}

#[test]
fn test_command_branches_containing_tag() {
    if let Some(git) = git_command() {
        check_branches_containing_tag(&git);
    }
}

#[test]
fn test_command_tag_round_trip() {
    if let Some(git) = git_command() {
        check_tag_round_trip(&git);
    }
}

#[test]
fn test_command_resolution() {
    if let Some(git) = git_command() {
        check_resolution(git);
    }
}

#[test]
fn test_command_newest_tag_off_history() {
    if let Some(git) = git_command() {
        check_newest_tag_off_history(git);
    }
}

#[test]
fn test_command_unborn_head() {
    if let Some(git) = git_command() {
        check_unborn_head(git);
    }
}

#[test]
fn test_command_failure_carries_stderr() {
    let Some(git) = git_command() else {
        return;
    };
    let test_repo = TestRepo::new();
    match git.delete_tag(test_repo.path(), "v9.9.9") {
        Err(git_semver::GitSemverError::GitExec(e)) => {
            assert!(e.command_line().ends_with("tag -d v9.9.9"));
            assert!(!e.stderr.is_empty());
        }
        other => panic!("expected GitExec, got {:?}", other),
    }
}
