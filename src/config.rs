use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::DEFAULT_RELEASE_BRANCHES;
use crate::error::{GitSemverError, Result};
use crate::git::find_repository_root;

/// File name looked up in the repository root and the user config directory.
pub const CONFIG_FILE_NAME: &str = "gitsemver.toml";

/// Represents the complete configuration for git-semver.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub release: ReleaseConfig,
}

/// Which git implementation to use.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Run the `git` executable
    #[default]
    Command,
    /// Use the bundled libgit2
    Libgit2,
}

fn default_git_binary() -> String {
    "git".to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

/// How to talk to git.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GitConfig {
    #[serde(default = "default_git_binary")]
    pub binary: String,

    #[serde(default = "default_remote")]
    pub remote: String,

    #[serde(default)]
    pub backend: Backend,
}

impl Default for GitConfig {
    fn default() -> Self {
        GitConfig {
            binary: default_git_binary(),
            remote: default_remote(),
            backend: Backend::default(),
        }
    }
}

fn default_release_branches() -> Vec<String> {
    DEFAULT_RELEASE_BRANCHES.iter().map(|s| s.to_string()).collect()
}

/// Which branches count as release branches when the CI does not say.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReleaseConfig {
    #[serde(default = "default_release_branches")]
    pub branches: Vec<String>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            branches: default_release_branches(),
        }
    }
}

/// Parses a configuration from TOML text.
pub fn parse_config(text: &str) -> Result<Config> {
    Ok(toml::from_str(text)?)
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `gitsemver.toml` in the root of the repository containing `repo`
///    (or in `repo` itself when it is not inside a repository)
/// 3. `gitsemver.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read or parsed, or the custom
///   path does not exist
pub fn load_config(config_path: Option<&Path>, repo: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_path {
        if !path.exists() {
            return Err(GitSemverError::config(format!(
                "config file {} not found",
                path.display()
            )));
        }
        return read_config(path);
    }

    let candidates: Vec<PathBuf> = repo
        .map(|r| find_repository_root(r).unwrap_or_else(|_| r.to_path_buf()))
        .map(|root| root.join(CONFIG_FILE_NAME))
        .into_iter()
        .chain(dirs::config_dir().map(|d| d.join(CONFIG_FILE_NAME)))
        .collect();

    match candidates.iter().find(|p| p.is_file()) {
        Some(path) => read_config(path),
        None => Ok(Config::default()),
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)?;
    parse_config(&text)
        .map_err(|e| GitSemverError::config(format!("{}: {}", path.display(), e)))
}
