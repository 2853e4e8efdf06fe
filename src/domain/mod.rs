//! Domain logic - pure rules independent of git operations

pub mod branch;
pub mod tag;
pub mod version_info;

pub use branch::{last_name, sanitize_branch, DEFAULT_RELEASE_BRANCHES};
pub use tag::{is_semver_tag, TagRecord, DEFAULT_TAG, HEAD};
pub use version_info::VersionInfo;
