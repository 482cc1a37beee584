//! Claim-to-feature encoding.
//!
//! Turns a claim set into the flat bag-of-words token sequence the topic
//! classifier was trained on: for each property, the property id token
//! followed by one value token per value (`P31 Q5`). Properties whose
//! values are all [`ClaimValue::Unknown`] contribute the bare property
//! token once, so the classifier still sees that the property is present.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::trace;

use crate::claims::{ClaimSet, ClaimValue};

/// Ordered feature tokens for one item.
pub type TokenSequence = Vec<String>;

/// Encoder configuration.
#[derive(Debug, Clone, Default)]
pub struct EncoderConfig {
    /// When set, properties outside this set are skipped entirely.
    /// `None` includes every property (the trained model's default).
    pub property_allowlist: Option<BTreeSet<String>>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("malformed entity reference {value:?} under property {property}")]
    MalformedValue { property: String, value: String },
}

/// Encode a claim set into its feature token sequence.
///
/// Deterministic: properties are visited in sorted id order (the
/// `BTreeMap` order of [`ClaimSet`]), values in stated order. An empty
/// claim set encodes to an empty sequence and is never an error.
pub fn encode(claims: &ClaimSet, config: &EncoderConfig) -> Result<TokenSequence, EncodeError> {
    let mut tokens = TokenSequence::new();

    for (property, values) in claims.iter() {
        if let Some(allowlist) = &config.property_allowlist
            && !allowlist.contains(property)
        {
            continue;
        }

        let mut emitted = false;
        for value in values {
            match value {
                ClaimValue::Entity(id) => {
                    if !is_entity_id(id) {
                        return Err(EncodeError::MalformedValue {
                            property: property.to_string(),
                            value: id.clone(),
                        });
                    }
                    tokens.push(property.to_string());
                    tokens.push(id.clone());
                    emitted = true;
                }
                ClaimValue::Literal(s) => {
                    let normalized = normalize_literal(s);
                    if !normalized.is_empty() {
                        tokens.push(property.to_string());
                        tokens.push(normalized);
                        emitted = true;
                    }
                }
                ClaimValue::Unknown => {}
            }
        }

        // Property present but nothing tokenizable under it.
        if !emitted {
            tokens.push(property.to_string());
        }
    }

    trace!(
        properties = claims.len(),
        tokens = tokens.len(),
        "encoded claim set"
    );
    Ok(tokens)
}

/// Collapse internal whitespace so one literal value stays one token.
fn normalize_literal(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join("_")
}

fn is_entity_id(id: &str) -> bool {
    let mut chars = id.chars();
    matches!(chars.next(), Some('Q') | Some('P')) && id.len() > 1 && chars.all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toni_morrison_claims() -> ClaimSet {
        let mut claims = ClaimSet::new();
        claims.push("P31", ClaimValue::Entity("Q5".into()));
        claims.push("P106", ClaimValue::Entity("Q36180".into()));
        claims.push("P106", ClaimValue::Entity("Q4853732".into()));
        claims.push("P569", ClaimValue::Literal("+1931-02-18T00:00:00Z".into()));
        claims
    }

    #[test]
    fn encodes_property_value_pairs_in_sorted_order() {
        let tokens = encode(&toni_morrison_claims(), &EncoderConfig::default()).unwrap();
        assert_eq!(
            tokens,
            vec![
                "P106",
                "Q36180",
                "P106",
                "Q4853732",
                "P31",
                "Q5",
                "P569",
                "+1931-02-18T00:00:00Z",
            ]
        );
    }

    #[test]
    fn encoding_is_deterministic() {
        let claims = toni_morrison_claims();
        let config = EncoderConfig::default();
        let first = encode(&claims, &config).unwrap();
        let second = encode(&claims, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_claims_encode_to_empty_sequence() {
        let tokens = encode(&ClaimSet::new(), &EncoderConfig::default()).unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn unknown_only_property_emits_bare_token() {
        let mut claims = ClaimSet::new();
        claims.push("P570", ClaimValue::Unknown);
        claims.push("P570", ClaimValue::Unknown);
        let tokens = encode(&claims, &EncoderConfig::default()).unwrap();
        assert_eq!(tokens, vec!["P570"]);
    }

    #[test]
    fn unknown_alongside_entity_is_silent() {
        let mut claims = ClaimSet::new();
        claims.push("P31", ClaimValue::Unknown);
        claims.push("P31", ClaimValue::Entity("Q5".into()));
        let tokens = encode(&claims, &EncoderConfig::default()).unwrap();
        assert_eq!(tokens, vec!["P31", "Q5"]);
    }

    #[test]
    fn literal_whitespace_collapses_to_one_token() {
        let mut claims = ClaimSet::new();
        claims.push("P1476", ClaimValue::Literal("  The   Bluest Eye ".into()));
        let tokens = encode(&claims, &EncoderConfig::default()).unwrap();
        assert_eq!(tokens, vec!["P1476", "The_Bluest_Eye"]);
    }

    #[test]
    fn blank_literal_counts_as_untokenizable() {
        let mut claims = ClaimSet::new();
        claims.push("P373", ClaimValue::Literal("   ".into()));
        let tokens = encode(&claims, &EncoderConfig::default()).unwrap();
        assert_eq!(tokens, vec!["P373"]);
    }

    #[test]
    fn allowlist_skips_other_properties() {
        let config = EncoderConfig {
            property_allowlist: Some(["P31".to_string()].into_iter().collect()),
        };
        let tokens = encode(&toni_morrison_claims(), &config).unwrap();
        assert_eq!(tokens, vec!["P31", "Q5"]);
    }

    #[test]
    fn malformed_entity_reference_fails() {
        let mut claims = ClaimSet::new();
        claims.push("P31", ClaimValue::Entity("not-an-id".into()));
        let err = encode(&claims, &EncoderConfig::default()).unwrap_err();
        assert_eq!(
            err,
            EncodeError::MalformedValue {
                property: "P31".into(),
                value: "not-an-id".into()
            }
        );
    }

    #[test]
    fn property_reference_values_are_valid() {
        let mut claims = ClaimSet::new();
        claims.push("P1659", ClaimValue::Entity("P570".into()));
        let tokens = encode(&claims, &EncoderConfig::default()).unwrap();
        assert_eq!(tokens, vec!["P1659", "P570"]);
    }
}
