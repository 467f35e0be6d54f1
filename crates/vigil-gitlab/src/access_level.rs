use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
/// GitLab membership tiers, ordered by their REST ordinal.
pub enum AccessLevel {
    NoAccess,
    MinimalAccess,
    Guest,
    Planner,
    Reporter,
    #[default]
    Developer,
    Maintainer,
    Owner,
}

impl AccessLevel {
    pub const ALL: [AccessLevel; 8] = [
        AccessLevel::NoAccess,
        AccessLevel::MinimalAccess,
        AccessLevel::Guest,
        AccessLevel::Planner,
        AccessLevel::Reporter,
        AccessLevel::Developer,
        AccessLevel::Maintainer,
        AccessLevel::Owner,
    ];

    pub fn ordinal(self) -> u32 {
        match self {
            AccessLevel::NoAccess => 0,
            AccessLevel::MinimalAccess => 5,
            AccessLevel::Guest => 10,
            AccessLevel::Planner => 15,
            AccessLevel::Reporter => 20,
            AccessLevel::Developer => 30,
            AccessLevel::Maintainer => 40,
            AccessLevel::Owner => 50,
        }
    }

    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.ordinal() == ordinal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::NoAccess => "no_access",
            AccessLevel::MinimalAccess => "minimal_access",
            AccessLevel::Guest => "guest",
            AccessLevel::Planner => "planner",
            AccessLevel::Reporter => "reporter",
            AccessLevel::Developer => "developer",
            AccessLevel::Maintainer => "maintainer",
            AccessLevel::Owner => "owner",
        }
    }

    /// True when a raw member ordinal meets this threshold.
    pub fn admits(self, member_ordinal: u32) -> bool {
        member_ordinal >= self.ordinal()
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessLevelParseError {
    #[error("missing access level")]
    Missing,
    #[error("unsupported access level '{0}'. Supported levels: no_access (0), minimal_access (5), guest (10), planner (15), reporter (20), developer (30), maintainer (40), owner (50)")]
    Unsupported(String),
}

impl FromStr for AccessLevel {
    type Err = AccessLevelParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        if normalized.is_empty() {
            return Err(AccessLevelParseError::Missing);
        }
        if let Ok(ordinal) = normalized.parse::<u32>() {
            return Self::from_ordinal(ordinal)
                .ok_or_else(|| AccessLevelParseError::Unsupported(value.to_string()));
        }
        match normalized.as_str() {
            "no_access" | "none" => Ok(AccessLevel::NoAccess),
            "minimal_access" | "minimal" => Ok(AccessLevel::MinimalAccess),
            "guest" => Ok(AccessLevel::Guest),
            "planner" => Ok(AccessLevel::Planner),
            "reporter" => Ok(AccessLevel::Reporter),
            "developer" => Ok(AccessLevel::Developer),
            "maintainer" => Ok(AccessLevel::Maintainer),
            "owner" => Ok(AccessLevel::Owner),
            _ => Err(AccessLevelParseError::Unsupported(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessLevel, AccessLevelParseError};

    #[test]
    fn unit_access_level_parses_names_and_ordinals() {
        assert_eq!("Developer".parse(), Ok(AccessLevel::Developer));
        assert_eq!(" maintainer ".parse(), Ok(AccessLevel::Maintainer));
        assert_eq!("minimal-access".parse(), Ok(AccessLevel::MinimalAccess));
        assert_eq!("50".parse(), Ok(AccessLevel::Owner));
        assert_eq!(
            "31".parse::<AccessLevel>(),
            Err(AccessLevelParseError::Unsupported("31".to_string()))
        );
        assert_eq!("".parse::<AccessLevel>(), Err(AccessLevelParseError::Missing));
    }

    #[test]
    fn unit_access_level_ordering_follows_ordinals() {
        let mut levels = AccessLevel::ALL.to_vec();
        levels.reverse();
        levels.sort();
        assert_eq!(levels, AccessLevel::ALL.to_vec());
        assert!(AccessLevel::Reporter < AccessLevel::Developer);
        assert_eq!(AccessLevel::default(), AccessLevel::Developer);
    }

    #[test]
    fn unit_access_level_admits_members_at_or_above_threshold() {
        assert!(AccessLevel::Developer.admits(30));
        assert!(AccessLevel::Developer.admits(50));
        assert!(!AccessLevel::Developer.admits(20));
        assert!(AccessLevel::NoAccess.admits(0));
    }
}
