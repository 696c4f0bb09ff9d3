//! User identity, team membership and privilege level

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One user, as asserted by a verified token.
///
/// A user destined for token issuance must have a non-empty `id`, `pseudo`
/// and `email`; the codec rejects issuance otherwise. A user decoded from a
/// verified token is presumed valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique identifier
    pub id: String,
    /// Display name
    pub pseudo: String,
    pub email: String,
    pub level: Level,
    /// Distinguishes automated accounts
    pub bot: bool,
    pub teams: Teams,
}

/// The user's or bot's accreditation level, in ascending trust order.
///
/// The derived `Ord` follows declaration order, so a route configured with a
/// minimum level admits any user whose level compares `>=` to it.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    No,
    Candidate,
    Visitor,
    Standard,
    Administrator,
}

/// The user's teams.
///
/// Unordered membership with no duplicates. Backed by an ordered set so the
/// JSON form is always a sorted array: equivalent membership sets serialize
/// identically, which keeps token signatures reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Teams(BTreeSet<String>);

impl Teams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a team. Returns whether the membership was new.
    pub fn insert(&mut self, team: impl Into<String>) -> bool {
        self.0.insert(team.into())
    }

    pub fn contains(&self, team: &str) -> bool {
        self.0.contains(team)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate team names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Teams {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::No < Level::Candidate);
        assert!(Level::Candidate < Level::Visitor);
        assert!(Level::Visitor < Level::Standard);
        assert!(Level::Standard < Level::Administrator);
    }

    #[test]
    fn test_level_wire_strings() {
        let levels = [
            (Level::No, "\"no\""),
            (Level::Candidate, "\"candidate\""),
            (Level::Visitor, "\"visitor\""),
            (Level::Standard, "\"standard\""),
            (Level::Administrator, "\"administrator\""),
        ];
        for (level, wire) in levels {
            assert_eq!(serde_json::to_string(&level).unwrap(), wire);
            assert_eq!(serde_json::from_str::<Level>(wire).unwrap(), level);
        }
    }

    #[test]
    fn test_level_unknown_string_rejected() {
        assert!(serde_json::from_str::<Level>("\"root\"").is_err());
        assert!(serde_json::from_str::<Level>("\"Admin\"").is_err());
    }

    #[test]
    fn test_teams_serialize_sorted() {
        let teams: Teams = ["kitchen", "dev"].into_iter().collect();
        assert_eq!(serde_json::to_string(&teams).unwrap(), r#"["dev","kitchen"]"#);
    }

    #[test]
    fn test_teams_insertion_order_irrelevant() {
        let a: Teams = ["ops", "dev", "kitchen"].into_iter().collect();
        let b: Teams = ["kitchen", "ops", "dev"].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_teams_deserialize_dedups() {
        let teams: Teams = serde_json::from_str(r#"["dev","dev","kitchen"]"#).unwrap();
        assert_eq!(teams.len(), 2);
        assert!(teams.contains("dev"));
        assert!(teams.contains("kitchen"));
    }
}
