//! Core domain types shared across the harvester crates.

use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

// ---------------------------------------------------------------------------
// DedupPolicy
// ---------------------------------------------------------------------------

/// Rule governing whether repeated extraction of the same citation string
/// is suppressed or retained.
///
/// Both policies exist in the original tooling: the standalone extraction
/// path suppresses duplicates, while the browser-driven run keeps every
/// occurrence. Neither is a library-level default; callers must choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// Append a record only if no trimmed-equal entry already exists.
    Deduplicate,
    /// Append every extracted record, including repeats.
    AppendAll,
}

impl std::fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deduplicate => write!(f, "dedupe"),
            Self::AppendAll => write!(f, "append-all"),
        }
    }
}

impl std::str::FromStr for DedupPolicy {
    type Err = HarvestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "dedupe" | "deduplicate" => Ok(Self::Deduplicate),
            "append-all" | "append_all" => Ok(Self::AppendAll),
            other => Err(HarvestError::validation(format!(
                "unknown dedup policy '{other}': expected 'dedupe' or 'append-all'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Login credentials resolved from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// Manual Debug so a stray debug log never leaks the password.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_both_spellings() {
        assert_eq!("dedupe".parse::<DedupPolicy>().unwrap(), DedupPolicy::Deduplicate);
        assert_eq!(
            "append-all".parse::<DedupPolicy>().unwrap(),
            DedupPolicy::AppendAll
        );
        assert!("keep-some".parse::<DedupPolicy>().is_err());
    }

    #[test]
    fn policy_display_roundtrip() {
        for policy in [DedupPolicy::Deduplicate, DedupPolicy::AppendAll] {
            let parsed: DedupPolicy = policy.to_string().parse().unwrap();
            assert_eq!(parsed, policy);
        }
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "alice@example.com".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("alice@example.com"));
        assert!(!debug.contains("hunter2"));
    }
}
