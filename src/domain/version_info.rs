use super::branch::sanitize_branch;
use super::tag::TagRecord;
use crate::error::{GitSemverError, Result};

/// Everything the resolver learned about the working tree.
///
/// Produced once per run by [`crate::resolver::Resolver::resolve`] and
/// consumed when composing the output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionInfo {
    /// Matching or closest semver tag, e.g. `v1.2.3`.
    pub tag: String,
    /// Branch name as found, e.g. `Special--Branch`. Empty when detached.
    pub branch: String,
    /// CI or commit-count build counter, e.g. `456`. May be empty.
    pub build: String,
    /// The working tree is clean and identical to the tag's tree.
    pub same_tree: bool,
    /// The branch may produce suffix-free release versions.
    pub is_release: bool,
    /// Every tag whose hashes were looked up, in discovery order.
    pub tags: Vec<TagRecord>,
}

impl VersionInfo {
    /// The composite version, e.g. `v1.2.3-mybranch.456`.
    ///
    /// Release branches with an unchanged tree get the bare tag. Everything
    /// else gets `-<branch>.<build>`, with either part left out when empty.
    pub fn version(&self) -> String {
        if self.tag.is_empty() {
            return String::new();
        }
        let mut version = self.tag.clone();
        if !self.is_release || !self.same_tree {
            let mut suffix = sanitize_branch(&self.branch);
            if !self.build.is_empty() {
                if !suffix.is_empty() {
                    suffix.push('.');
                }
                suffix.push_str(&self.build);
            }
            if !suffix.is_empty() {
                version.push('-');
                version.push_str(&suffix);
            }
        }
        version
    }

    /// True if `tag` is among the tags seen while resolving.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.tag == tag)
    }

    /// Bumps the patch level of `tag` to the first free slot and returns it.
    ///
    /// The tag is padded to three components first, so `v1.2` becomes
    /// `v1.2.1`. A pre-release or build suffix is dropped, so `v1.2.3-rc1`
    /// becomes `v1.2.4`. Tags already present in [`VersionInfo::tags`] are
    /// skipped. Afterwards the info describes the new tag, which by
    /// construction matches the current tree.
    ///
    /// Fails with [`GitSemverError::InvalidTag`] when the patch level is
    /// not a number or cannot grow any further.
    pub fn increment_patch(&mut self) -> Result<String> {
        let original = self.tag.clone();
        let invalid = || GitSemverError::InvalidTag(original.clone());

        let core_end = self.tag.find(['-', '+']).unwrap_or(self.tag.len());
        let mut core = self.tag[..core_end].to_string();
        while core.matches('.').count() < 2 {
            core.push_str(".0");
        }
        let split = core.rfind('.').map_or(0, |idx| idx + 1);
        let (prefix, patch) = core.split_at(split);
        if patch.is_empty() || !patch.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let mut patch: u64 = patch.parse().map_err(|_| invalid())?;

        let tag = loop {
            patch = patch.checked_add(1).ok_or_else(invalid)?;
            let candidate = format!("{}{}", prefix, patch);
            if !self.has_tag(&candidate) {
                break candidate;
            }
        };
        self.tag = tag;
        self.same_tree = true;
        Ok(self.tag.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(tag: &str, branch: &str, build: &str, same_tree: bool, is_release: bool) -> VersionInfo {
        VersionInfo {
            tag: tag.to_string(),
            branch: branch.to_string(),
            build: build.to_string(),
            same_tree,
            is_release,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_version_release_same_tree() {
        assert_eq!(info("v1.2.3", "main", "7", true, true).version(), "v1.2.3");
    }

    #[test]
    fn test_version_with_suffix() {
        assert_eq!(
            info("v1.2.3", "*Branch--.--ONE*-*", "789", true, false).version(),
            "v1.2.3-branch-one.789"
        );
        assert_eq!(
            info("v1.2.3", "main", "build", false, true).version(),
            "v1.2.3-main.build"
        );
    }

    #[test]
    fn test_version_empty_branch_or_build() {
        assert_eq!(info("v6.0.0", "", "build", false, true).version(), "v6.0.0-build");
        assert_eq!(info("v6.0.0", "feat", "", false, false).version(), "v6.0.0-feat");
        assert_eq!(info("v6.0.0", "", "", false, false).version(), "v6.0.0");
        assert_eq!(info("v6.0.0", "---", "", false, false).version(), "v6.0.0");
    }

    #[test]
    fn test_version_without_tag() {
        assert_eq!(VersionInfo::default().version(), "");
    }

    #[test]
    fn test_increment_patch_pads_and_increments() {
        let mut vi = info("v1.2", "main", "", false, true);
        assert_eq!(vi.increment_patch().unwrap(), "v1.2.1");
        assert!(vi.same_tree);
        assert_eq!(vi.increment_patch().unwrap(), "v1.2.2");
        assert_eq!(vi.version(), "v1.2.2");

        let mut vi = info("v3", "main", "", false, true);
        assert_eq!(vi.increment_patch().unwrap(), "v3.0.1");
    }

    #[test]
    fn test_increment_patch_skips_known_tags() {
        let mut vi = info("v1.0.0", "main", "", false, true);
        vi.tags = vec![
            TagRecord::new("v1.0.1", "c1", "t1"),
            TagRecord::new("v1.0.2", "c2", "t2"),
        ];
        assert_eq!(vi.increment_patch().unwrap(), "v1.0.3");
        assert!(!vi.tags.iter().any(|t| t.tag == "v1.0.3"));
    }

    #[test]
    fn test_increment_patch_drops_prerelease_suffix() {
        let mut vi = info("v1.2.3-rc1", "main", "", false, true);
        assert_eq!(vi.increment_patch().unwrap(), "v1.2.4");

        let mut vi = info("v1.2.3-rc.1+build.5", "main", "", false, true);
        assert_eq!(vi.increment_patch().unwrap(), "v1.2.4");

        let mut vi = info("2.0-beta", "main", "", false, true);
        assert_eq!(vi.increment_patch().unwrap(), "2.0.1");
    }

    #[test]
    fn test_increment_patch_rejects_unusable_tags() {
        for tag in ["v1.2.x", "v1.2.", &format!("v1.2.{}", u64::MAX)] {
            let mut vi = info(tag, "main", "", false, true);
            match vi.increment_patch() {
                Err(GitSemverError::InvalidTag(t)) => assert_eq!(t, tag),
                other => panic!("expected InvalidTag for {}, got {:?}", tag, other),
            }
            assert_eq!(vi.tag, tag);
            assert!(!vi.same_tree);
        }
    }
}
