use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A SQL name: table, column, alias or CTE.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Identifier(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier(name)
    }
}

impl From<&Identifier> for Identifier {
    fn from(identifier: &Identifier) -> Self {
        identifier.clone()
    }
}

/// A qualified name such as `n0.properties`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompoundIdentifier(pub Vec<Identifier>);

impl CompoundIdentifier {
    pub fn new<I, T>(parts: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Identifier>,
    {
        CompoundIdentifier(parts.into_iter().map(Into::into).collect())
    }

    pub fn root(&self) -> Option<&Identifier> {
        self.0.first()
    }

    pub fn parts(&self) -> &[Identifier] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Insertion-ordered set of identifiers.
#[derive(Debug, Clone, Default)]
pub struct IdentifierSet {
    ordered: Vec<Identifier>,
    members: HashSet<Identifier>,
}

impl IdentifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, identifier: impl Into<Identifier>) -> &mut Self {
        let identifier = identifier.into();
        if self.members.insert(identifier.clone()) {
            self.ordered.push(identifier);
        }
        self
    }

    pub fn add_set(&mut self, other: &IdentifierSet) -> &mut Self {
        for identifier in &other.ordered {
            self.add(identifier.clone());
        }
        self
    }

    pub fn remove(&mut self, identifier: &Identifier) -> &mut Self {
        if self.members.remove(identifier) {
            self.ordered.retain(|member| member != identifier);
        }
        self
    }

    pub fn remove_set(&mut self, other: &IdentifierSet) -> &mut Self {
        for identifier in &other.ordered {
            self.remove(identifier);
        }
        self
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.members.contains(identifier)
    }

    /// True when every member of this set is also a member of `scope`.
    pub fn satisfied_by(&self, scope: &IdentifierSet) -> bool {
        self.ordered.iter().all(|identifier| scope.contains(identifier))
    }

    /// Set equality, ignoring insertion order.
    pub fn matches(&self, other: &IdentifierSet) -> bool {
        self.len() == other.len() && self.satisfied_by(other)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.ordered.iter()
    }

    pub fn to_vec(&self) -> Vec<Identifier> {
        self.ordered.clone()
    }

    /// Canonical, order-independent form used as a map key.
    pub fn key(&self) -> String {
        let mut names: Vec<&str> = self.ordered.iter().map(Identifier::as_str).collect();
        names.sort_unstable();
        names.join(",")
    }
}

impl PartialEq for IdentifierSet {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl<T: Into<Identifier>> FromIterator<T> for IdentifierSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = IdentifierSet::new();
        for identifier in iter {
            set.add(identifier);
        }
        set
    }
}

impl fmt::Display for IdentifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_set_keeps_insertion_order() {
        let set: IdentifierSet = ["b", "a", "b", "c"].into_iter().collect();
        let names: Vec<&str> = set.iter().map(Identifier::as_str).collect();

        assert_eq!(names, vec!["b", "a", "c"]);
        assert_eq!(set.key(), "a,b,c");
    }

    #[test]
    fn test_identifier_set_subset_and_equality() {
        let scope: IdentifierSet = ["a", "b"].into_iter().collect();
        let a: IdentifierSet = ["a"].into_iter().collect();
        let reversed: IdentifierSet = ["b", "a"].into_iter().collect();

        assert!(a.satisfied_by(&scope));
        assert!(!scope.satisfied_by(&a));
        assert!(scope.matches(&reversed));
        assert!(IdentifierSet::new().satisfied_by(&a));
    }

    #[test]
    fn test_identifier_set_removal() {
        let mut set: IdentifierSet = ["a", "b", "c"].into_iter().collect();
        let removed: IdentifierSet = ["a", "c"].into_iter().collect();
        set.remove_set(&removed);

        assert_eq!(set.to_vec(), vec![Identifier::from("b")]);
        assert!(!set.contains(&Identifier::from("a")));
    }
}
