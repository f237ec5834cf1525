//! Unique identifiers for agent records.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique identifier for an Experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExperienceId(Ulid);

impl ExperienceId {
    /// Generate a new ExperienceId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ExperienceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExperienceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for ExperienceId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
