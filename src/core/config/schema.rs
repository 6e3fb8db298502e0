//! core::config::schema
//!
//! Engine configuration schema.
//!
//! # Example
//!
//! ```toml
//! default_branch = "main"
//! abbrev = 7
//!
//! [author]
//! name = "Ada Learner"
//! email = "ada@example.com"
//!
//! [clock]
//! fixed = "2024-01-01T09:00:00Z"
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing: the default branch must be a valid
//! branch name, `abbrev` must lie in `4..=64`, and a fixed clock must be an
//! RFC 3339 timestamp.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{BranchName, UtcTimestamp};

/// Author identity used for commits.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthorConfig {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Clock settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ClockConfig {
    /// Stamp every commit with this instant instead of the system time.
    pub fixed: Option<String>,
}

/// Engine configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Branch created by `init` (default: "main")
    pub default_branch: Option<String>,

    /// Abbreviated hash length in output (default: 7)
    pub abbrev: Option<usize>,

    /// Commit author
    pub author: Option<AuthorConfig>,

    /// Clock behavior
    pub clock: Option<ClockConfig>,
}

impl EngineConfig {
    pub const DEFAULT_AUTHOR_NAME: &'static str = "Learner";
    pub const DEFAULT_AUTHOR_EMAIL: &'static str = "learner@gitdojo.dev";
    pub const DEFAULT_ABBREV: usize = 7;

    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(branch) = &self.default_branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid default_branch: {}", e))
            })?;
        }

        if let Some(abbrev) = self.abbrev {
            if !(4..=64).contains(&abbrev) {
                return Err(ConfigError::InvalidValue(format!(
                    "abbrev must be between 4 and 64, got {abbrev}"
                )));
            }
        }

        if let Some(fixed) = self.clock.as_ref().and_then(|c| c.fixed.as_ref()) {
            UtcTimestamp::parse(fixed).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid clock.fixed '{fixed}': {e}"))
            })?;
        }

        if let Some(author) = &self.author {
            if author.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
                return Err(ConfigError::InvalidValue(
                    "author.name cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Author signature, `Name <email>`.
    pub fn author(&self) -> String {
        let author = self.author.clone().unwrap_or_default();
        format!(
            "{} <{}>",
            author.name.as_deref().unwrap_or(Self::DEFAULT_AUTHOR_NAME),
            author.email.as_deref().unwrap_or(Self::DEFAULT_AUTHOR_EMAIL)
        )
    }

    /// Branch created by `init`.
    pub fn default_branch(&self) -> BranchName {
        self.default_branch
            .as_deref()
            .and_then(|b| BranchName::new(b).ok())
            .unwrap_or_default()
    }

    /// Abbreviated hash length.
    pub fn abbrev(&self) -> usize {
        self.abbrev.unwrap_or(Self::DEFAULT_ABBREV)
    }

    /// Fixed clock instant, if configured.
    pub fn fixed_time(&self) -> Option<UtcTimestamp> {
        self.clock
            .as_ref()
            .and_then(|c| c.fixed.as_deref())
            .and_then(|s| UtcTimestamp::parse(s).ok())
    }
}
