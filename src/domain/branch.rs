use std::sync::OnceLock;

use regex::Regex;

/// Branch names that may use release mode when the CI gives no better hint.
pub const DEFAULT_RELEASE_BRANCHES: &[&str] = &["default", "master", "main"];

fn non_word_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^0-9A-Za-z_]+").expect("non-word regex is valid"))
}

/// Turns a branch name into something usable inside a semver suffix.
///
/// Every run of characters other than ASCII letters, digits and `_`
/// becomes a single `-`, leading and trailing dashes are dropped and the
/// result is lowercased.
///
/// ```
/// # use git_semver::domain::sanitize_branch;
/// assert_eq!(sanitize_branch("*Branch--.--ONE*-*"), "branch-one");
/// ```
pub fn sanitize_branch(branch: &str) -> String {
    non_word_run()
        .replace_all(branch, "-")
        .trim_matches('-')
        .to_ascii_lowercase()
}

/// Last `/`-separated segment of `s`, e.g. `origin` of `remotes/origin`.
pub fn last_name(s: &str) -> &str {
    match s.rfind('/') {
        Some(idx) => &s[idx + 1..],
        None => s,
    }
}
