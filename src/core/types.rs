//! core::types
//!
//! Strong types for simulated repository concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated branch name (git refname rules)
//! - [`RemoteName`] - Validated remote name
//! - [`Oid`] - Content hash of a simulated object
//! - [`UtcTimestamp`] - RFC 3339 commit timestamp
//!
//! # Validation
//!
//! Names and hashes are validated on construction, so handlers never have
//! to re-check what a learner typed once it has been parsed into one of
//! these types.
//!
//! # Examples
//!
//! ```
//! use gitdojo::core::types::{BranchName, Oid};
//!
//! let branch = BranchName::new("feature/login").unwrap();
//! assert_eq!(branch.as_str(), "feature/login");
//!
//! assert!(BranchName::new("bad..name").is_err());
//! assert!(Oid::new("not-a-hash").is_err());
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("'{name}' is not a valid branch name: {reason}")]
    InvalidBranchName { name: String, reason: String },

    #[error("'{name}' is not a valid remote name: {reason}")]
    InvalidRemoteName { name: String, reason: String },

    #[error("invalid object id: {0}")]
    InvalidOid(String),
}

/// Characters git refuses anywhere in a ref component.
const FORBIDDEN_REF_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];

/// Check a name against git's `check-ref-format` rules.
///
/// Returns the reason for the first violated rule.
fn refname_violation(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("name cannot be empty".into());
    }
    if name == "@" || name == "HEAD" {
        return Some(format!("'{name}' is reserved"));
    }
    if name.starts_with('-') {
        return Some("name cannot start with '-'".into());
    }
    if name.ends_with('/') {
        return Some("name cannot end with '/'".into());
    }
    for bad in ["..", "@{", "//"] {
        if name.contains(bad) {
            return Some(format!("name cannot contain '{bad}'"));
        }
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_REF_CHARS.contains(c)) {
        return Some(format!("name cannot contain '{c}'"));
    }
    if name.chars().any(|c| c.is_ascii_control()) {
        return Some("name cannot contain control characters".into());
    }
    name.split('/')
        .filter(|component| !component.is_empty())
        .find_map(|component| {
            if component.starts_with('.') {
                Some("a path component cannot start with '.'".to_string())
            } else if component.ends_with(".lock") {
                Some("a path component cannot end with '.lock'".to_string())
            } else {
                None
            }
        })
}

/// A validated branch name.
///
/// # Example
///
/// ```
/// use gitdojo::core::types::BranchName;
///
/// assert!(BranchName::new("main").is_ok());
/// assert!(BranchName::new("feature-alternate-story").is_ok());
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("HEAD").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        match refname_violation(&name) {
            Some(reason) => Err(TypeError::InvalidBranchName { name, reason }),
            None => Ok(Self(name)),
        }
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BranchName {
    /// `main`, the branch `init` creates unless configured otherwise.
    fn default() -> Self {
        Self("main".to_string())
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated remote name such as `origin`.
///
/// Remote names follow the same refname rules as branches but cannot
/// contain `/`, since `origin/main` is how remote-tracking refs are spelled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteName(String);

impl RemoteName {
    /// Create a new validated remote name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let reason = if name.contains('/') {
            Some("name cannot contain '/'".to_string())
        } else {
            refname_violation(&name)
        };
        match reason {
            Some(reason) => Err(TypeError::InvalidRemoteName { name, reason }),
            None => Ok(Self(name)),
        }
    }

    /// Get the remote name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RemoteName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteName> for String {
    fn from(name: RemoteName) -> Self {
        name.0
    }
}

impl std::fmt::Display for RemoteName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An object identifier: the lowercase hex SHA-256 of an object's header
/// and body.
///
/// Hashes are 64 hex characters. 40-character ids are accepted as well so
/// quest data written against SHA-1 style fixtures still loads.
///
/// # Example
///
/// ```
/// use gitdojo::core::types::Oid;
///
/// let oid = Oid::hash_object("blob", b"hello");
/// assert_eq!(oid.as_str().len(), 64);
/// assert_eq!(oid.short(7).len(), 7);
/// assert_eq!(oid, Oid::hash_object("blob", b"hello"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id, normalized to lowercase.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not 40 or 64 hex digits.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(
                "object id must be hexadecimal".into(),
            ));
        }
        Ok(Self(oid))
    }

    /// Hash `"<kind> "` followed by `body`.
    pub fn hash_object(kind: &str, body: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(b" ");
        hasher.update(body);
        Self(hex::encode(hasher.finalize()))
    }

    /// Abbreviated form: the first `len` characters (or the whole id).
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Whether `prefix` abbreviates this id.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(&prefix.to_ascii_lowercase())
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl AsRef<str> for Oid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A UTC timestamp, serialized as RFC 3339.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Create a timestamp from a chrono DateTime.
    pub fn from_datetime(dt: chrono::DateTime<chrono::Utc>) -> Self {
        Self(dt)
    }

    /// Parse an RFC 3339 string.
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        let dt = chrono::DateTime::parse_from_rfc3339(s)?;
        Ok(Self(dt.with_timezone(&chrono::Utc)))
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }

    /// The `Date:` line format used by `git log`.
    pub fn git_display(&self) -> String {
        self.0.format("%a %b %-d %H:%M:%S %Y +0000").to_string()
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod branch_name {
        use super::*;

        #[test]
        fn accepts_common_names() {
            for name in ["main", "feature/foo", "fix-123", "user@feature", "with.dot"] {
                assert!(BranchName::new(name).is_ok(), "{name} should be valid");
            }
        }

        #[test]
        fn rejects_reserved_and_malformed() {
            for name in [
                "", "@", "HEAD", "-flag", ".hidden", "foo/.hidden", "x.lock", "a/", "a..b",
                "a@{b", "a//b", "has space", "tab\there",
            ] {
                assert!(BranchName::new(name).is_err(), "{name:?} should be invalid");
            }
        }

        #[test]
        fn error_names_the_rule() {
            let err = BranchName::new("a..b").unwrap_err();
            assert!(err.to_string().contains("'..'"));
        }

        #[test]
        fn serde_rejects_invalid() {
            let parsed: Result<BranchName, _> = serde_json::from_str("\"bad name\"");
            assert!(parsed.is_err());
        }
    }

    mod remote_name {
        use super::*;

        #[test]
        fn slash_rejected() {
            assert!(RemoteName::new("origin").is_ok());
            assert!(RemoteName::new("up/stream").is_err());
        }
    }

    mod oid {
        use super::*;

        #[test]
        fn hash_is_64_lowercase_hex() {
            let oid = Oid::hash_object("blob", b"content");
            assert_eq!(oid.as_str().len(), 64);
            assert!(oid.as_str().chars().all(|c| c.is_ascii_hexdigit()));
            assert_eq!(oid.as_str(), oid.as_str().to_lowercase());
        }

        #[test]
        fn kind_is_part_of_the_hash() {
            assert_ne!(
                Oid::hash_object("blob", b"x"),
                Oid::hash_object("tree", b"x")
            );
        }

        #[test]
        fn normalizes_to_lowercase() {
            let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
            assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
        }

        #[test]
        fn invalid_rejected() {
            assert!(Oid::new("").is_err());
            assert!(Oid::new("abc123").is_err());
            assert!(Oid::new("xyz123def4567890abc123def4567890abc12345").is_err());
        }

        #[test]
        fn prefix_matching_ignores_case() {
            let oid = Oid::hash_object("blob", b"content");
            let prefix = oid.short(6).to_uppercase();
            assert!(oid.starts_with(&prefix));
        }
    }

    mod utc_timestamp {
        use super::*;

        #[test]
        fn serializes_as_rfc3339() {
            let ts = UtcTimestamp::parse("2024-03-01T12:30:00Z").unwrap();
            let json = serde_json::to_string(&ts).unwrap();
            assert_eq!(json, "\"2024-03-01T12:30:00Z\"");
        }

        #[test]
        fn git_display_format() {
            let ts = UtcTimestamp::parse("2024-03-01T12:30:00Z").unwrap();
            assert_eq!(ts.git_display(), "Fri Mar 1 12:30:00 2024 +0000");
        }
    }
}
