//! Structured claims attached to a Wikidata item.
//!
//! A claim set maps a property id (e.g. `P31` instance-of) to the ordered
//! list of values stated under that property. Claim sets live for one
//! request: fetched, encoded, and discarded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::qid::Qid;

/// One value under a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ClaimValue {
    /// Reference to another entity, kept as its raw id (`Q5`, `P279`) so
    /// encoding never needs a second lookup to resolve a label.
    Entity(String),
    /// A literal value (string, external id, time, quantity) in its
    /// normalized string form.
    Literal(String),
    /// somevalue/novalue snaks and datatypes we do not tokenize.
    Unknown,
}

/// All claims for one item, keyed by property id.
///
/// The map is a `BTreeMap` so property iteration order is sorted by
/// property id, which is the documented deterministic encoding order.
/// Value order within a property is the order they were stated in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(BTreeMap<String, Vec<ClaimValue>>);

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under a property, creating the property on first use.
    pub fn push(&mut self, property: impl Into<String>, value: ClaimValue) {
        self.0.entry(property.into()).or_default().push(value);
    }

    pub fn get(&self, property: &str) -> Option<&[ClaimValue]> {
        self.0.get(property).map(Vec::as_slice)
    }

    /// Properties and their values, sorted by property id.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ClaimValue])> {
        self.0.iter().map(|(p, vs)| (p.as_str(), vs.as_slice()))
    }

    /// Number of distinct properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Vec<ClaimValue>)> for ClaimSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<ClaimValue>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A fetched Wikidata item: its id, best-effort English label, and claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub qid: Qid,
    /// English label with language fallback, when the item has one.
    pub label: Option<String>,
    pub claims: ClaimSet,
}
