//! Deserialization of `wbgetentities` responses into [`Entity`] values.
//!
//! The API nests each statement as `mainsnak.datavalue.value`, whose
//! shape depends on `datatype`. Entity references keep their raw id;
//! string-like datatypes become literals; everything else (somevalue,
//! novalue, coordinates, ...) maps to [`ClaimValue::Unknown`].
//! Statements that do not match any recognized shape are skipped.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use wdtopic_core::{ClaimSet, ClaimValue, Entity, Qid};

#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse {
    #[serde(default)]
    pub entities: BTreeMap<String, RawEntity>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    pub code: String,
    pub info: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEntity {
    /// The entity's resolved id; differs from the requested id when the
    /// request went through a redirect.
    pub id: Option<String>,
    pub missing: Option<Value>,
    #[serde(default)]
    pub labels: BTreeMap<String, RawLabel>,
    #[serde(default)]
    pub claims: BTreeMap<String, Vec<RawStatement>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawLabel {
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawStatement {
    #[serde(rename = "type")]
    pub statement_type: Option<String>,
    pub mainsnak: Option<RawSnak>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSnak {
    pub snaktype: String,
    pub datatype: Option<String>,
    pub datavalue: Option<RawDataValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDataValue {
    pub value: Value,
}

impl RawEntity {
    pub(crate) fn is_missing(&self) -> bool {
        self.missing.is_some()
    }

    /// Convert into an [`Entity`], skipping unparseable statements.
    pub(crate) fn into_entity(self, qid: Qid) -> Entity {
        let label = self
            .labels
            .get("en")
            .or_else(|| self.labels.values().next())
            .map(|l| l.value.clone());

        let mut claims = ClaimSet::new();
        for (property, statements) in self.claims {
            for statement in statements {
                if let Some(value) = claim_value(&statement) {
                    claims.push(property.clone(), value);
                }
            }
        }

        Entity { qid, label, claims }
    }
}

/// Map one statement to its claim value, or `None` to skip it.
fn claim_value(statement: &RawStatement) -> Option<ClaimValue> {
    if statement.statement_type.as_deref() != Some("statement") {
        return None;
    }
    let snak = statement.mainsnak.as_ref()?;

    // somevalue/novalue snaks carry no datavalue at all.
    if snak.snaktype != "value" {
        return Some(ClaimValue::Unknown);
    }

    let value = &snak.datavalue.as_ref()?.value;
    match snak.datatype.as_deref()? {
        "wikibase-item" | "wikibase-property" => {
            let id = value.get("id")?.as_str()?;
            Some(ClaimValue::Entity(id.to_string()))
        }
        "string" | "external-id" | "url" | "commonsMedia" | "math" => {
            Some(ClaimValue::Literal(value.as_str()?.to_string()))
        }
        "monolingualtext" => {
            let text = value.get("text")?.as_str()?;
            Some(ClaimValue::Literal(text.to_string()))
        }
        "time" => {
            let time = value.get("time")?.as_str()?;
            Some(ClaimValue::Literal(time.to_string()))
        }
        "quantity" => {
            let amount = value.get("amount")?.as_str()?;
            Some(ClaimValue::Literal(amount.to_string()))
        }
        _ => Some(ClaimValue::Unknown),
    }
}
