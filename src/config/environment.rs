// ABOUTME: Environment snapshot with overlay merge and fallback-chain lookups.
// ABOUTME: Built once at startup; downstream code reads it instead of the process env.

use super::overlay::Overlay;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};

/// A snapshot of environment variables.
///
/// Captured from the process once, then merged with the overlay file.
/// The same snapshot becomes the primary application's environment at handoff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<String, String>,
    /// Captured variables whose name or value is not valid UTF-8. They are
    /// never read as settings, only passed through at handoff.
    opaque: BTreeMap<OsString, OsString>,
}

impl Environment {
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            opaque: BTreeMap::new(),
        }
    }

    /// Capture the current process environment. Variables that are not
    /// valid UTF-8 are kept aside for [`iter_opaque`](Self::iter_opaque).
    pub fn capture() -> Self {
        let mut env = Self::default();
        for (key, value) in std::env::vars_os() {
            match (key.to_str(), value.to_str()) {
                (Some(k), Some(v)) => {
                    env.vars.insert(k.to_string(), v.to_string());
                }
                _ => {
                    env.opaque.insert(key, value);
                }
            }
        }
        env
    }

    /// Value of a variable, treating an empty value as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.opaque.remove(OsStr::new(&key));
        self.vars.insert(key, value.into());
    }

    /// Set a variable only if it is unset or empty. Returns whether it was set.
    pub fn set_default(&mut self, key: &str, value: &str) -> bool {
        if self.get(key).is_some() {
            return false;
        }
        self.set(key, value);
        true
    }

    /// Export every overlay assignment, replacing existing values with the
    /// same key. Returns the number of assignments applied.
    pub fn apply(&mut self, overlay: &Overlay) -> usize {
        for (key, value) in overlay.entries() {
            self.set(key.clone(), value.clone());
        }
        overlay.entries().len()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Captured variables that are not valid UTF-8.
    pub fn iter_opaque(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.opaque.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}

/// Lookup order for one setting: service-specific variable, then the
/// generic variable, then a literal default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvChain {
    pub specific: &'static str,
    pub generic: &'static str,
    pub default: &'static str,
}

/// A value resolved through an [`EnvChain`], with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    /// Variable name the value came from, or `None` for the literal default.
    pub source: Option<&'static str>,
}

impl EnvChain {
    pub const fn new(specific: &'static str, generic: &'static str, default: &'static str) -> Self {
        Self {
            specific,
            generic,
            default,
        }
    }

    pub fn resolve(&self, env: &Environment) -> Resolved {
        for var in [self.specific, self.generic] {
            if let Some(value) = env.get(var) {
                return Resolved {
                    value: value.to_string(),
                    source: Some(var),
                };
            }
        }
        Resolved {
            value: self.default.to_string(),
            source: None,
        }
    }
}
