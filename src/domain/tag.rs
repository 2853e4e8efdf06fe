use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;

/// Pseudo tag name standing for the current working tree.
pub const HEAD: &str = "HEAD";

/// Tag used when the repository has no version tags at all.
pub const DEFAULT_TAG: &str = "v0.0.0";

/// Commit and tree identity of one tag (or of `HEAD`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub tag: String,
    pub commit: String,
    pub tree: String,
}

impl TagRecord {
    pub fn new(tag: impl Into<String>, commit: impl Into<String>, tree: impl Into<String>) -> Self {
        TagRecord {
            tag: tag.into(),
            commit: commit.into(),
            tree: tree.into(),
        }
    }

    pub fn is_head(&self) -> bool {
        self.tag == HEAD
    }
}

fn semver_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^v?[0-9]+(?:\.[0-9]+)?(?:\.[0-9]+)?$").expect("semver tag regex is valid")
    })
}

/// True for tags like `v1`, `1.2`, `v1.2.3`.
pub fn is_semver_tag(tag: &str) -> bool {
    semver_tag_regex().is_match(tag)
}

/// Version of a semver-like tag with missing components read as zero.
fn version_key(tag: &str) -> Option<semver::Version> {
    let mut parts = tag.trim_start_matches('v').split('.');
    let mut next = || -> Option<u64> {
        match parts.next() {
            Some(p) => p.parse().ok(),
            None => Some(0),
        }
    };
    let major = next()?;
    let minor = next()?;
    let patch = next()?;
    Some(semver::Version::new(major, minor, patch))
}

/// Orders tags by version, highest first. Ties fall back to the name.
pub fn compare_version_desc(a: &str, b: &str) -> Ordering {
    match (version_key(a), version_key(b)) {
        (Some(va), Some(vb)) => vb.cmp(&va).then_with(|| b.cmp(a)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.cmp(a),
    }
}

/// Keeps only semver-like tags and sorts them highest version first.
pub fn filter_and_sort<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| is_semver_tag(t))
        .collect();
    tags.sort_by(|a, b| compare_version_desc(a, b));
    tags
}
