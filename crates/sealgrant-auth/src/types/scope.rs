//! OAuth 2.0 scope sets.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The `openid` scope value.
pub const OPENID: &str = "openid";

/// The `offline_access` scope value.
pub const OFFLINE_ACCESS: &str = "offline_access";

/// A set of scope values.
///
/// Ordered so that the joined form, and therefore the sealed encoding, is
/// deterministic. Serializes as a single space-delimited string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Scope(BTreeSet<String>);

impl Scope {
    /// Creates an empty scope set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a space-delimited scope string (RFC 6749 section 3.3).
    ///
    /// Repeated whitespace and duplicate values are ignored.
    #[must_use]
    pub fn from_delimited(value: &str) -> Self {
        Self(value.split_whitespace().map(str::to_string).collect())
    }

    /// Returns the space-delimited form.
    #[must_use]
    pub fn as_joined(&self) -> String {
        self.0.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
    }

    /// Adds the values of a space-delimited string, returning `true` if any
    /// was not already present.
    ///
    /// Empty input adds nothing, and `"read write"` adds two values, so the
    /// set always equals what its joined form parses back to.
    pub fn insert(&mut self, value: impl AsRef<str>) -> bool {
        let mut added = false;
        for item in value.as_ref().split_whitespace() {
            added |= self.0.insert(item.to_string());
        }
        added
    }

    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.0.contains(value)
    }

    /// Returns `true` if every value of `other` is in this set.
    #[must_use]
    pub fn contains_all(&self, other: &Scope) -> bool {
        other.0.is_subset(&self.0)
    }

    /// Values present in both sets.
    #[must_use]
    pub fn intersection(&self, other: &Scope) -> Scope {
        Self(self.0.intersection(&other.0).cloned().collect())
    }

    /// Returns `true` if this is an OpenID Connect request.
    #[must_use]
    pub fn has_openid(&self) -> bool {
        self.contains(OPENID)
    }

    /// Returns `true` if offline access (refresh tokens) was granted.
    #[must_use]
    pub fn has_offline_access(&self) -> bool {
        self.contains(OFFLINE_ACCESS)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_joined())
    }
}

impl<S: AsRef<str>> FromIterator<S> for Scope {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut scope = Self::new();
        for value in iter {
            scope.insert(value);
        }
        scope
    }
}

impl Serialize for Scope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_joined())
    }
}

impl<'de> Deserialize<'de> for Scope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_delimited(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_delimited_dedupes_and_sorts() {
        let scope = Scope::from_delimited("profile  openid profile email");
        assert_eq!(scope.len(), 3);
        assert_eq!(scope.as_joined(), "email openid profile");
    }

    #[test]
    fn test_empty_scope() {
        let scope = Scope::from_delimited("   ");
        assert!(scope.is_empty());
        assert_eq!(scope.as_joined(), "");
    }

    #[test]
    fn test_intersection() {
        let original = Scope::from_delimited("1 2 3");
        let requested = Scope::from_delimited("2 4");
        assert_eq!(original.intersection(&requested), Scope::from_delimited("2"));
    }

    #[test]
    fn test_contains_all() {
        let scope = Scope::from_delimited("openid profile offline_access");
        assert!(scope.contains_all(&Scope::from_delimited("openid profile")));
        assert!(!scope.contains_all(&Scope::from_delimited("openid email")));
        assert!(scope.has_openid());
        assert!(scope.has_offline_access());
    }

    #[test]
    fn test_serde_as_string() {
        let scope: Scope = ["openid", "profile"].into_iter().collect();
        let json = serde_json::to_string(&scope).unwrap();
        assert_eq!(json, "\"openid profile\"");

        let back: Scope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scope);
    }

    #[test]
    fn test_insert_splits_delimited_values() {
        let mut scope = Scope::new();
        assert!(!scope.insert(""));
        assert!(!scope.insert("   "));
        assert!(scope.is_empty());

        assert!(scope.insert("read write"));
        assert_eq!(scope.len(), 2);
        assert!(scope.contains("read"));
        assert!(!scope.contains("read write"));
        assert!(!scope.insert("write read"));
        assert!(scope.insert("write openid"));
    }

    #[test]
    fn test_collected_scope_matches_its_joined_form() {
        let scope: Scope = ["", "openid", "read write"].into_iter().collect();
        assert_eq!(scope, Scope::from_delimited("openid read write"));
        assert_eq!(scope.len(), 3);
        assert_eq!(Scope::from_delimited(&scope.as_joined()), scope);

        let json = serde_json::to_string(&scope).unwrap();
        let back: Scope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scope);
    }
}
