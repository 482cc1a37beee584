//! Claim fetching against the Wikidata `wbgetentities` action API.

pub mod client;
mod parse;

pub use client::{ClaimSource, FetchError, WikidataClient, WikidataConfig, MAX_IDS_PER_REQUEST};
