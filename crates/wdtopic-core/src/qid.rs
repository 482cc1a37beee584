//! Wikidata item identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A validated Wikidata item identifier (`Q` followed by digits).
///
/// Parsing uppercases the input, so `q42` and `Q42` are the same item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Qid(String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("poorly formatted QID: {0:?} does not match 'Q#...'")]
pub struct QidParseError(pub String);

impl Qid {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Qid {
    type Err = QidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        let mut chars = normalized.chars();
        let valid = chars.next() == Some('Q')
            && normalized.len() > 1
            && chars.all(|c| c.is_ascii_digit());
        if valid {
            Ok(Qid(normalized))
        } else {
            Err(QidParseError(s.to_string()))
        }
    }
}

impl TryFrom<String> for Qid {
    type Error = QidParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Qid> for String {
    fn from(qid: Qid) -> Self {
        qid.0
    }
}

impl fmt::Display for Qid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
