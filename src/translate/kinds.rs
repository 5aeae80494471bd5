//! Kind name to kind id mapping.

use std::collections::{BTreeMap, HashMap};

/// Kind name to id table as loaded from configuration.
pub type KindMap = BTreeMap<String, i16>;

/// Maps node and edge kind names to the small integers stored in `kind_ids` and `kind_id`.
///
/// Returns the ids of the kinds it knows and the names it does not, each missing name once.
pub trait KindMapper {
    fn map_kinds(&self, kinds: &[String]) -> (Vec<i16>, Vec<String>);
}

fn map_with<F>(kinds: &[String], lookup: F) -> (Vec<i16>, Vec<String>)
where
    F: Fn(&str) -> Option<i16>,
{
    let mut ids = Vec::with_capacity(kinds.len());
    let mut missing: Vec<String> = Vec::new();

    for kind in kinds {
        match lookup(kind) {
            Some(id) => ids.push(id),
            None if !missing.contains(kind) => missing.push(kind.clone()),
            None => {}
        }
    }

    (ids, missing)
}

impl KindMapper for HashMap<String, i16> {
    fn map_kinds(&self, kinds: &[String]) -> (Vec<i16>, Vec<String>) {
        map_with(kinds, |kind| self.get(kind).copied())
    }
}

impl KindMapper for BTreeMap<String, i16> {
    fn map_kinds(&self, kinds: &[String]) -> (Vec<i16>, Vec<String>) {
        map_with(kinds, |kind| self.get(kind).copied())
    }
}
