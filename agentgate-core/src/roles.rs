//! Role sets attached to agent records.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Capability token that permits calling the chat dispatch endpoint.
pub const CHAT_INVOKE_ROLE: &str = "agent.chat.invoke";

/// Normalized set of capability tokens.
///
/// Tokens are trimmed, empty tokens are dropped and duplicates collapse.
/// Serializes as a sorted JSON array. Deserializes from either an array of
/// strings or a single comma-separated string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<String>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated role list such as `"a, b,,c"`.
    pub fn parse_csv(raw: &str) -> Self {
        raw.split(',').collect()
    }

    pub fn contains(&self, role: &str) -> bool {
        self.0.contains(role)
    }

    /// Insert a token; returns false when it was blank or already present.
    pub fn insert(&mut self, role: impl AsRef<str>) -> bool {
        let role = role.as_ref().trim();
        if role.is_empty() {
            return false;
        }
        self.0.insert(role.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for RoleSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = RoleSet::new();
        for role in iter {
            set.insert(role);
        }
        set
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join(","))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RolesInput {
    List(Vec<String>),
    Csv(String),
}

impl<'de> Deserialize<'de> for RoleSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<RolesInput>::deserialize(deserializer)? {
            Some(RolesInput::List(items)) => Ok(items.into_iter().collect()),
            Some(RolesInput::Csv(raw)) => Ok(RoleSet::parse_csv(&raw)),
            None => Ok(RoleSet::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_csv_trims_and_drops_empty() {
        let roles = RoleSet::parse_csv(" a , b,,c ,");
        assert_eq!(roles.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_deserialize_from_list_and_string() -> Result<(), serde_json::Error> {
        let from_list: RoleSet = serde_json::from_str(r#"["x", " y ", "x", ""]"#)?;
        let from_csv: RoleSet = serde_json::from_str(r#""y,x""#)?;
        assert_eq!(from_list, from_csv);
        assert_eq!(from_list.len(), 2);

        let from_null: RoleSet = serde_json::from_str("null")?;
        assert!(from_null.is_empty());
        Ok(())
    }

    #[test]
    fn test_rejects_non_string_entries() {
        assert!(serde_json::from_str::<RoleSet>("[1, 2]").is_err());
        assert!(serde_json::from_str::<RoleSet>("42").is_err());
    }

    #[test]
    fn test_serializes_sorted() -> Result<(), serde_json::Error> {
        let roles: RoleSet = ["zeta", "alpha", "alpha"].into_iter().collect();
        assert_eq!(serde_json::to_string(&roles)?, r#"["alpha","zeta"]"#);
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_insertion_order_irrelevant(mut tokens in prop::collection::vec("[a-z.]{1,12}", 0..8)) {
            let forward: RoleSet = tokens.iter().collect();
            tokens.reverse();
            let backward: RoleSet = tokens.iter().collect();
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn prop_csv_and_list_agree(tokens in prop::collection::vec("[a-z.]{1,12}", 0..8)) {
            let csv = RoleSet::parse_csv(&tokens.join(","));
            let list: RoleSet = tokens.iter().collect();
            prop_assert_eq!(csv, list);
        }
    }
}
