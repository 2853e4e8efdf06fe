//! Read-only access to the process environment.
//!
//! The resolver never touches `std::env` directly so that CI conventions
//! can be exercised in tests with a [`MapEnvironment`].

use std::collections::HashMap;

/// Source of environment variables.
pub trait Environment {
    /// Value of `name`, or an empty string when it is unset.
    fn get(&self, name: &str) -> String {
        self.lookup(name).unwrap_or_default()
    }

    /// Value of `name`, distinguishing "unset" (`None`) from "set to empty".
    fn lookup(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEnvironment;

impl Environment for OsEnvironment {
    fn lookup(&self, name: &str) -> Option<String> {
        std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
    }
}

/// Fixed set of variables, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    vars: HashMap<String, String>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`MapEnvironment::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) {
        self.vars.remove(name);
    }
}

impl Environment for MapEnvironment {
    fn lookup(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

impl<E: Environment + ?Sized> Environment for &E {
    fn lookup(&self, name: &str) -> Option<String> {
        (**self).lookup(name)
    }
}

/// Parses a boolean the way CI systems spell them: `1`, `t`, `true` (any case).
///
/// Anything else, including an unset variable, is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "t" | "T" | "TRUE" | "true" | "True")
}

/// True if `name` is set to something that parses as true.
pub fn is_true(env: &dyn Environment, name: &str) -> bool {
    parse_bool(&env.get(name))
}

/// Replaces `$NAME` and `${NAME}` with values from `env`.
///
/// Unset variables expand to nothing. A `$` not followed by a name is kept.
pub fn expand(s: &str, env: &dyn Environment) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(idx) = rest.find('$') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        let (name, consumed) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], end)
            }
        };
        if name.is_empty() {
            out.push('$');
            rest = after;
        } else {
            out.push_str(&env.get(name));
            rest = &after[consumed..];
        }
    }
    out.push_str(rest);
    out
}
