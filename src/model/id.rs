//! Prefixed resource identifiers (`<prefix>-<suffix>`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Separator between the kind prefix and the unique part of an id.
pub const PREFIX_SEPARATOR: char = '-';

/// An opaque, globally unique identifier whose prefix denotes the resource kind.
///
/// The empty id is the zero value used for events that do not concern a
/// load balancer; it must never be looked up or deployed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrefixedId(String);

impl PrefixedId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The kind prefix, or `""` when the id has no separator.
    pub fn prefix(&self) -> &str {
        match self.0.split_once(PREFIX_SEPARATOR) {
            Some((prefix, _)) => prefix,
            None => "",
        }
    }

    /// True when this id carries the given kind prefix.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.prefix() == prefix
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrefixedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrefixedId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PrefixedId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_extraction() {
        assert_eq!(PrefixedId::from("loadbal-7c3e2a").prefix(), "loadbal");
        assert_eq!(PrefixedId::from("loc-east-1").prefix(), "loc");
        assert_eq!(PrefixedId::from("noseparator").prefix(), "");
        assert_eq!(PrefixedId::default().prefix(), "");
    }

    #[test]
    fn test_has_prefix_rejects_empty_prefix() {
        let id = PrefixedId::from("-abc");
        assert!(!id.has_prefix(""));
        assert!(PrefixedId::from("lb-abc").has_prefix("lb"));
        assert!(!PrefixedId::from("lbx-abc").has_prefix("lb"));
    }

    #[test]
    fn test_serde_is_transparent() {
        let id: PrefixedId = serde_json::from_str("\"lb-abc\"").unwrap();
        assert_eq!(id.as_str(), "lb-abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"lb-abc\"");
    }
}
