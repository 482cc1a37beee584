//! HTTP client for the Wikidata action API.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use wdtopic_core::{Entity, Qid};

use crate::parse::{ApiResponse, RawEntity};

const DEFAULT_ENDPOINT: &str = "https://www.wikidata.org/w/api.php";
const DEFAULT_USER_AGENT: &str =
    concat!("wdtopic/", env!("CARGO_PKG_VERSION"), " (wikidata topic inference)");
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The `wbgetentities` ids-per-call limit for anonymous clients.
pub const MAX_IDS_PER_REQUEST: usize = 50;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no Wikidata item found for {0}")]
    NotFound(Qid),
    #[error("wikidata request failed: {0}")]
    Upstream(#[from] reqwest::Error),
    #[error("wikidata returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected wikidata response: {0}")]
    Decode(String),
}

/// Client configuration. Defaults target the public Wikidata API.
#[derive(Debug, Clone)]
pub struct WikidataConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for WikidataConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl WikidataConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Anything that can resolve QIDs to entities with claims.
///
/// The service and the bulk runner depend on this trait so tests can
/// substitute a fixture-backed source.
#[async_trait]
pub trait ClaimSource: Send + Sync {
    async fn fetch_entity(&self, qid: &Qid) -> Result<Entity, FetchError>;

    /// Batched lookup: one inner result per requested id, in request
    /// order. A missing id is a per-slot `NotFound`; the outer error is
    /// reserved for whole-call failures.
    async fn fetch_entities(&self, qids: &[Qid]) -> Result<Vec<Result<Entity, FetchError>>, FetchError>;
}

/// Claim fetcher backed by `wbgetentities`.
///
/// No retries here: timeouts and transport failures surface as
/// [`FetchError::Upstream`] and retry policy stays with the caller.
pub struct WikidataClient {
    client: reqwest::Client,
    endpoint: String,
}

impl WikidataClient {
    pub fn new(config: WikidataConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn get_entities(&self, ids: &str) -> Result<ApiResponse, FetchError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("action", "wbgetentities"),
                ("props", "claims|labels"),
                ("languages", "en"),
                ("languagefallback", ""),
                ("format", "json"),
                ("ids", ids),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: ApiResponse = resp.json().await?;
        if let Some(err) = &response.error {
            return Err(FetchError::Decode(format!("{}: {}", err.code, err.info)));
        }
        Ok(response)
    }

    /// Fetch one chunk (at most [`MAX_IDS_PER_REQUEST`] ids) and map each
    /// requested id to its per-slot outcome.
    async fn fetch_chunk(&self, qids: &[Qid]) -> Result<Vec<Result<Entity, FetchError>>, FetchError> {
        let ids = qids
            .iter()
            .map(Qid::as_str)
            .collect::<Vec<_>>()
            .join("|");
        info!(count = qids.len(), "fetching entities from wikidata");

        let response = self.get_entities(&ids).await?;

        let out = match_entities(qids, response.entities);
        for (qid, outcome) in qids.iter().zip(&out) {
            if outcome.is_err() {
                warn!(qid = %qid, "no wikidata item for id");
            }
        }
        Ok(out)
    }
}

/// Pair fetched entities back up with the requested ids.
///
/// The API keys each entity by its resolved id, so an item reached
/// through a redirect comes back under the redirect target instead of
/// the requested id. One unmatched request with one leftover entity
/// pairs unambiguously; several redirects in the same call cannot be
/// told apart and surface as `NotFound`.
fn match_entities(
    qids: &[Qid],
    mut entities: BTreeMap<String, RawEntity>,
) -> Vec<Result<Entity, FetchError>> {
    let mut out: Vec<Option<Result<Entity, FetchError>>> = qids
        .iter()
        .map(|qid| match entities.remove(qid.as_str()) {
            Some(raw) if raw.is_missing() => Some(Err(FetchError::NotFound(qid.clone()))),
            Some(raw) => Some(Ok(raw.into_entity(qid.clone()))),
            None => None,
        })
        .collect();

    entities.retain(|_, raw| !raw.is_missing());
    let unmatched: Vec<usize> = out
        .iter()
        .enumerate()
        .filter_map(|(i, slot)| slot.is_none().then_some(i))
        .collect();
    if let [slot] = unmatched[..]
        && entities.len() == 1
        && let Some((key, raw)) = entities.pop_first()
    {
        let resolved = raw.id.clone().unwrap_or(key);
        let qid = resolved.parse().unwrap_or_else(|_| qids[slot].clone());
        out[slot] = Some(Ok(raw.into_entity(qid)));
    }

    out.into_iter()
        .zip(qids)
        .map(|(slot, qid)| slot.unwrap_or_else(|| Err(FetchError::NotFound(qid.clone()))))
        .collect()
}

#[async_trait]
impl ClaimSource for WikidataClient {
    async fn fetch_entity(&self, qid: &Qid) -> Result<Entity, FetchError> {
        let results = self.fetch_chunk(std::slice::from_ref(qid)).await?;
        results
            .into_iter()
            .next()
            .unwrap_or_else(|| Err(FetchError::NotFound(qid.clone())))
    }

    async fn fetch_entities(&self, qids: &[Qid]) -> Result<Vec<Result<Entity, FetchError>>, FetchError> {
        let mut out = Vec::with_capacity(qids.len());
        for chunk in qids.chunks(MAX_IDS_PER_REQUEST) {
            out.extend(self.fetch_chunk(chunk).await?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client =
            WikidataClient::new(WikidataConfig::default().with_endpoint("http://localhost:8181/"))
                .unwrap();
        assert_eq!(client.endpoint, "http://localhost:8181");
    }

    #[test]
    fn config_builder_overrides() {
        let config = WikidataConfig::default()
            .with_user_agent("test-agent/1.0")
            .with_timeout(Duration::from_secs(3));
        assert_eq!(config.user_agent, "test-agent/1.0");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn default_user_agent_names_the_tool() {
        assert!(WikidataConfig::default().user_agent.starts_with("wdtopic/"));
    }

    fn raw(json: &str) -> RawEntity {
        serde_json::from_str(json).unwrap()
    }

    fn qids(ids: &[&str]) -> Vec<Qid> {
        ids.iter().map(|id| id.parse().unwrap()).collect()
    }

    #[test]
    fn match_entities_pairs_requested_ids() {
        let mut entities = BTreeMap::new();
        entities.insert("Q1".to_string(), raw(r#"{"id": "Q1", "claims": {}}"#));
        entities.insert("Q2".to_string(), raw(r#"{"id": "Q2", "missing": ""}"#));
        let results = match_entities(&qids(&["Q1", "Q2"]), entities);
        assert_eq!(results[0].as_ref().unwrap().qid.as_str(), "Q1");
        assert!(matches!(
            &results[1],
            Err(FetchError::NotFound(q)) if q.as_str() == "Q2"
        ));
    }

    #[test]
    fn single_redirect_resolves_to_target_entity() {
        // Redirected items come back keyed by the target id.
        let mut entities = BTreeMap::new();
        entities.insert("Q1643".to_string(), raw(r#"{"id": "Q1643", "claims": {}}"#));
        let results = match_entities(&qids(&["Q100000"]), entities);
        assert_eq!(results[0].as_ref().unwrap().qid.as_str(), "Q1643");
    }

    #[test]
    fn redirect_resolves_within_a_batch() {
        let mut entities = BTreeMap::new();
        entities.insert("Q1".to_string(), raw(r#"{"id": "Q1", "claims": {}}"#));
        entities.insert("Q1643".to_string(), raw(r#"{"id": "Q1643", "claims": {}}"#));
        let results = match_entities(&qids(&["Q1", "Q100000"]), entities);
        assert_eq!(results[0].as_ref().unwrap().qid.as_str(), "Q1");
        assert_eq!(results[1].as_ref().unwrap().qid.as_str(), "Q1643");
    }

    #[test]
    fn ambiguous_redirects_surface_as_not_found() {
        let mut entities = BTreeMap::new();
        entities.insert("Q10".to_string(), raw(r#"{"id": "Q10", "claims": {}}"#));
        entities.insert("Q20".to_string(), raw(r#"{"id": "Q20", "claims": {}}"#));
        let results = match_entities(&qids(&["Q100000", "Q200000"]), entities);
        assert!(results.iter().all(|r| matches!(r, Err(FetchError::NotFound(_)))));
    }

    #[test]
    fn missing_leftovers_do_not_count_as_redirects() {
        // A leftover `missing` stub must not be mistaken for a redirect
        // target of the one unmatched request.
        let mut entities = BTreeMap::new();
        entities.insert("Q9".to_string(), raw(r#"{"id": "Q9", "missing": ""}"#));
        let results = match_entities(&qids(&["Q100000"]), entities);
        assert!(matches!(&results[0], Err(FetchError::NotFound(_))));
    }
}
