//! Textual device parameters used to bind native controls to an engine.
//!
//! The text form is a comma-separated list of `key:value` pairs, for
//! example `engine:remote,button:a`. Keys and values may not contain
//! `:` or `,`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::MirrorError;

/// Engine name under which remote devices are registered.
pub const REMOTE_ENGINE: &str = "remote";

/// Ordered key/value parameters for a device factory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamPackage {
    entries: BTreeMap<String, String>,
}

impl ParamPackage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters pre-bound to the remote engine.
    pub fn remote() -> Self {
        Self::new().with("engine", REMOTE_ENGINE)
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// The `engine` entry, if any.
    pub fn engine(&self) -> Option<&str> {
        self.get("engine")
    }
}

impl fmt::Display for ParamPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}:{v}")?;
        }
        Ok(())
    }
}

impl FromStr for ParamPackage {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut package = Self::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once(':')
                .ok_or_else(|| MirrorError::InvalidParam(format!("missing ':' in {pair:?}")))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(MirrorError::InvalidParam(format!("empty key in {pair:?}")));
            }
            package.set(key, value.trim());
        }
        Ok(package)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_package_has_engine() {
        let p = ParamPackage::remote().with("button", "a");
        assert_eq!(p.engine(), Some(REMOTE_ENGINE));
        assert_eq!(p.get("button"), Some("a"));
        assert!(!p.has("analog"));
    }

    #[test]
    fn display_is_sorted_and_parses_back() {
        let p = ParamPackage::remote().with("button", "zl");
        let text = p.to_string();
        assert_eq!(text, "button:zl,engine:remote");
        let parsed: ParamPackage = text.parse().unwrap();
        assert_eq!(parsed, p);
    }

    #[test]
    fn parse_tolerates_whitespace_and_empty_pairs() {
        let p: ParamPackage = " engine : remote ,, analog:c_stick ".parse().unwrap();
        assert_eq!(p.engine(), Some("remote"));
        assert_eq!(p.get("analog"), Some("c_stick"));
    }

    #[test]
    fn parse_rejects_malformed_pairs() {
        assert!("engine".parse::<ParamPackage>().is_err());
        assert!(":remote".parse::<ParamPackage>().is_err());
    }
}
