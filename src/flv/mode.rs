//! Per-scope filter mode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the seek filter treats responses in a routing scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Pass everything through untouched.
    #[default]
    Off,
    /// Only rewrite responses served from the cache.
    Cached,
    /// Always attempt to rewrite.
    On,
}

impl FilterMode {
    /// Resolve a scope's setting against its parent: the nearest explicit
    /// value wins, and an unset chain resolves to `Off`.
    pub fn inherit(own: Option<FilterMode>, parent: Option<FilterMode>) -> Option<FilterMode> {
        own.or(parent)
    }

    /// Final value for a fully-merged scope.
    pub fn resolve(merged: Option<FilterMode>) -> FilterMode {
        merged.unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Off => "off",
            FilterMode::Cached => "cached",
            FilterMode::On => "on",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(FilterMode::Off),
            "cached" => Ok(FilterMode::Cached),
            "on" => Ok(FilterMode::On),
            other => Err(format!("invalid flv_filter mode '{}', expected off|cached|on", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_explicit_wins() {
        let global = Some(FilterMode::On);
        let server = FilterMode::inherit(None, global);
        let location = FilterMode::inherit(Some(FilterMode::Cached), server);
        let sub = FilterMode::inherit(None, location);

        assert_eq!(FilterMode::resolve(server), FilterMode::On);
        assert_eq!(FilterMode::resolve(location), FilterMode::Cached);
        assert_eq!(FilterMode::resolve(sub), FilterMode::Cached);
    }

    #[test]
    fn test_unset_defaults_to_off() {
        let merged = FilterMode::inherit(None, FilterMode::inherit(None, None));
        assert_eq!(FilterMode::resolve(merged), FilterMode::Off);
    }

    #[test]
    fn test_parse() {
        assert_eq!("ON".parse::<FilterMode>().unwrap(), FilterMode::On);
        assert_eq!("cached".parse::<FilterMode>().unwrap(), FilterMode::Cached);
        assert!("sometimes".parse::<FilterMode>().is_err());
    }
}
