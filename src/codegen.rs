//! Go source generation.
//!
//! Produces a small Go file declaring `PkgName` and `PkgVersion`, so Go
//! programs can embed the resolved version at build time.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;

use crate::domain::{last_name, VersionInfo};
use crate::error::{GitSemverError, Result};

const GO_KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// Go's identifier grammar: a letter or `_`, then letters, decimal digits
/// or `_`, where letters are Unicode category L and digits category Nd.
fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[\p{L}_][\p{L}\p{Nd}_]*$").expect("identifier regex is valid")
    })
}

/// True if `name` is a valid, non-keyword Go identifier.
pub fn is_go_identifier(name: &str) -> bool {
    identifier_pattern().is_match(name) && !GO_KEYWORDS.contains(&name)
}

/// Package name to use: `name` if given, else the last segment of the
/// module path in `<repo>/go.mod`.
pub fn find_package_name(repo: &Path, name: Option<&str>) -> Result<String> {
    let name = match name.filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => {
            let go_mod = fs::read_to_string(repo.join("go.mod"))?;
            go_mod
                .lines()
                .map(str::trim)
                .filter_map(|line| line.strip_prefix("module"))
                .filter(|rest| rest.starts_with(char::is_whitespace))
                .last()
                .map(|module| last_name(module.trim().trim_matches('"')).to_string())
                .unwrap_or_default()
        }
    };
    if !is_go_identifier(&name) {
        return Err(GitSemverError::InvalidIdentifier(name));
    }
    Ok(name)
}

fn generator_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_name().map(|n| n.to_string_lossy().into_owned()))
        .map(|name| format!(" by {}", name))
        .unwrap_or_default()
}

/// Go source declaring `PkgName` and `PkgVersion` for `info`.
///
/// The package clause uses the lowercased name.
pub fn go_package(info: &VersionInfo, repo: &Path, name: Option<&str>) -> Result<String> {
    let name = find_package_name(repo, name)?;
    let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
    Ok(format!(
        "// Code generated{} at {} UTC DO NOT EDIT.\n\
         // branch {:?}, build {}\n\
         package {}\n\
         \n\
         const PkgName = {:?}\n\
         const PkgVersion = {:?}\n",
        generator_name(),
        timestamp,
        info.branch,
        info.build,
        name.to_lowercase(),
        name,
        info.version(),
    ))
}
