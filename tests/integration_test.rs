// tests/integration_test.rs
use std::process::Command;

fn git_semver() -> Command {
    Command::new(env!("CARGO_BIN_EXE_git-semver"))
}

#[test]
fn test_git_semver_help() {
    let output = git_semver()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("git-semver"));
    assert!(stdout.contains("--gopackage"));
    assert!(stdout.contains("--incpatch"));
}

#[test]
fn test_git_semver_version() {
    let output = git_semver()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_git_semver_outside_repository_fails() {
    let temp = tempfile::TempDir::new().unwrap();
    if temp.path().ancestors().any(|p| p.join(".git").is_dir()) {
        return;
    }
    let output = git_semver()
        .args(["--backend", "libgit2", "--nofetch"])
        .arg(temp.path())
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(125));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("is not inside a git repository"));
}

#[test]
fn test_git_semver_rejects_unknown_backend() {
    let output = git_semver()
        .args(["--backend", "svn"])
        .output()
        .expect("Failed to execute command");

    assert_eq!(output.status.code(), Some(2));
}
