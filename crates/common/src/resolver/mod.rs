//! Work resolver abstraction
//!
//! Fetches the `referenced_works` list of a single work:
//! - OpenAlex over HTTP (DOI-keyed and id-keyed lookups)
//! - Static in-memory map (tests and offline fixtures)

use crate::config::OpenAlexConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::works::{ReferenceSet, WorkIdentifier};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failure to resolve a single work
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { status: u16, url: String },

    #[error("malformed response from {url}: {message}")]
    Malformed { url: String, message: String },

    #[error("invalid lookup url: {url}")]
    InvalidUrl { url: String },

    #[error("work not found: {id}")]
    NotFound { id: String },
}

impl ResolveError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ResolveError::Transport(e) if e.is_timeout())
    }
}

/// Trait for reference lookup
#[async_trait]
pub trait WorkResolver: Send + Sync {
    /// Fetch the references of one work
    async fn resolve(&self, id: &WorkIdentifier) -> std::result::Result<ReferenceSet, ResolveError>;

    /// Resolver name for logs and metrics
    fn name(&self) -> &str;
}

#[derive(Deserialize)]
struct WorkRecord {
    #[serde(default)]
    referenced_works: Vec<String>,
}

/// OpenAlex works client
pub struct OpenAlexResolver {
    client: reqwest::Client,
    base_url: reqwest::Url,
    mailto: Option<String>,
}

impl OpenAlexResolver {
    /// Create a new OpenAlex resolver
    pub fn new(config: &OpenAlexConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let base_url = reqwest::Url::parse(&config.base_url).map_err(|e| AppError::Configuration {
            message: format!("Invalid OpenAlex base url {}: {}", config.base_url, e),
        })?;

        Ok(Self {
            client,
            base_url,
            mailto: config.mailto.clone(),
        })
    }

    /// Build the `/works/{key}` URL for an identifier
    ///
    /// Each `/`-separated part of the key becomes one percent-encoded path
    /// segment, so `#`, `?` and `%` inside a DOI stay part of the path.
    pub fn work_url(&self, id: &WorkIdentifier) -> std::result::Result<reqwest::Url, ResolveError> {
        let key = id.lookup_key();
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ResolveError::InvalidUrl {
                url: format!("{}works/{}", self.base_url, key),
            })?
            .pop_if_empty()
            .push("works")
            .extend(key.split('/'));

        if let Some(mailto) = &self.mailto {
            url.query_pairs_mut().append_pair("mailto", mailto);
        }
        Ok(url)
    }

    async fn fetch(&self, url: reqwest::Url) -> std::result::Result<ReferenceSet, ResolveError> {
        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(ResolveError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        let record: WorkRecord = serde_json::from_slice(&body).map_err(|e| ResolveError::Malformed {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        Ok(ReferenceSet::new(record.referenced_works))
    }
}

#[async_trait]
impl WorkResolver for OpenAlexResolver {
    async fn resolve(&self, id: &WorkIdentifier) -> std::result::Result<ReferenceSet, ResolveError> {
        let start = Instant::now();
        let result = match self.work_url(id) {
            Ok(url) => self.fetch(url).await,
            Err(e) => Err(e),
        };

        metrics::record_resolution(start.elapsed().as_secs_f64(), id.path_label(), result.is_ok());

        match &result {
            Ok(refs) => tracing::debug!(work = %id, references = refs.len(), "Resolved work"),
            Err(e) => tracing::warn!(work = %id, error = %e, timeout = e.is_timeout(), "Work resolution failed"),
        }

        result
    }

    fn name(&self) -> &str {
        "openalex"
    }
}

/// In-memory resolver keyed by lookup key
///
/// Unknown keys fail with `NotFound`. Keys listed as failing fail with a
/// synthetic 503 so transport failures can be simulated.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    works: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a work by DOI
    pub fn with_doi(mut self, doi: &str, references: &[&str]) -> Self {
        let key = WorkIdentifier::doi(doi).lookup_key();
        self.works.insert(key, references.iter().map(|r| r.to_string()).collect());
        self
    }

    /// Register a work by OpenAlex id or entity URL
    pub fn with_work(mut self, id: &str, references: &[&str]) -> Self {
        let key = WorkIdentifier::OpenAlex(id.to_string()).lookup_key();
        self.works.insert(key, references.iter().map(|r| r.to_string()).collect());
        self
    }

    /// Make lookups of this identifier fail
    pub fn failing(mut self, id: &WorkIdentifier) -> Self {
        self.failing.insert(id.lookup_key());
        self
    }

    /// Build from a `{ "<lookup key or identifier>": [refs...] }` map
    pub fn from_map(map: HashMap<String, Vec<String>>) -> Self {
        let works = map
            .into_iter()
            .map(|(key, refs)| (WorkIdentifier::parse(&key).lookup_key(), refs))
            .collect();
        Self { works, failing: HashSet::new() }
    }

    /// Load a JSON fixture file
    pub fn from_json(json: &str) -> Result<Self> {
        let map: HashMap<String, Vec<String>> = serde_json::from_str(json)?;
        Ok(Self::from_map(map))
    }
}

#[async_trait]
impl WorkResolver for StaticResolver {
    async fn resolve(&self, id: &WorkIdentifier) -> std::result::Result<ReferenceSet, ResolveError> {
        let key = id.lookup_key();
        if self.failing.contains(&key) {
            return Err(ResolveError::Status {
                status: 503,
                url: format!("static://works/{}", key),
            });
        }
        self.works
            .get(&key)
            .map(|refs| ReferenceSet::new(refs.clone()))
            .ok_or_else(|| ResolveError::NotFound { id: id.to_string() })
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Create a resolver based on configuration
pub fn create_resolver(config: &OpenAlexConfig) -> Result<OpenAlexResolver> {
    tracing::info!(base_url = %config.base_url, timeout_secs = config.timeout_secs, "OpenAlex resolver configured");
    OpenAlexResolver::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> OpenAlexResolver {
        OpenAlexResolver::new(&OpenAlexConfig::default()).unwrap()
    }

    #[test]
    fn test_doi_url() {
        let url = resolver().work_url(&WorkIdentifier::doi("10.7717/peerj.4375")).unwrap();
        assert_eq!(url.as_str(), "https://api.openalex.org/works/https://doi.org/10.7717/peerj.4375");
    }

    #[test]
    fn test_id_url_uses_trailing_segment() {
        let url = resolver()
            .work_url(&WorkIdentifier::parse("https://openalex.org/W2741809807"))
            .unwrap();
        assert_eq!(url.as_str(), "https://api.openalex.org/works/W2741809807");
    }

    #[test]
    fn test_mailto_appended() {
        let config = OpenAlexConfig {
            mailto: Some("lab@example.org".into()),
            ..OpenAlexConfig::default()
        };
        let url = OpenAlexResolver::new(&config)
            .unwrap()
            .work_url(&WorkIdentifier::parse("W1"))
            .unwrap();
        assert_eq!(url.query(), Some("mailto=lab%40example.org"));
    }

    #[test]
    fn test_reserved_characters_stay_in_path() {
        let config = OpenAlexConfig {
            mailto: Some("a@b.org".into()),
            ..OpenAlexConfig::default()
        };
        let resolver = OpenAlexResolver::new(&config).unwrap();

        let sici = resolver
            .work_url(&WorkIdentifier::doi(
                "10.1002/(SICI)1097-4571(199806)49:8<693::AID-ASI4>3.0.CO;2-#",
            ))
            .unwrap();
        assert_eq!(
            sici.path(),
            "/works/https://doi.org/10.1002/(SICI)1097-4571(199806)49:8%3C693::AID-ASI4%3E3.0.CO;2-%23"
        );
        assert_eq!(sici.query(), Some("mailto=a%40b.org"));
        assert_eq!(sici.fragment(), None);

        let question = resolver.work_url(&WorkIdentifier::doi("10.1000/what?x=1")).unwrap();
        assert_eq!(question.path(), "/works/https://doi.org/10.1000/what%3Fx=1");
        assert_eq!(question.query(), Some("mailto=a%40b.org"));

        let percent = resolver.work_url(&WorkIdentifier::doi("10.1000/50%off")).unwrap();
        assert_eq!(percent.path(), "/works/https://doi.org/10.1000/50%25off");
    }

    #[test]
    fn test_base_url_with_path_prefix() {
        let config = OpenAlexConfig {
            base_url: "http://localhost:9000/openalex/".into(),
            ..OpenAlexConfig::default()
        };
        let url = OpenAlexResolver::new(&config)
            .unwrap()
            .work_url(&WorkIdentifier::parse("W7"))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/openalex/works/W7");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = OpenAlexConfig {
            base_url: "not a url".into(),
            ..OpenAlexConfig::default()
        };
        assert!(OpenAlexResolver::new(&config).is_err());
    }

    fn mock_resolver(server: &wiremock::MockServer) -> OpenAlexResolver {
        let config = OpenAlexConfig {
            base_url: server.uri(),
            ..OpenAlexConfig::default()
        };
        OpenAlexResolver::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_by_id_path() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/works/W2741809807"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "https://openalex.org/W2741809807",
                "referenced_works": ["https://openalex.org/W1", "https://openalex.org/W2"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let refs = mock_resolver(&server)
            .resolve(&WorkIdentifier::parse("https://openalex.org/W2741809807"))
            .await
            .unwrap();
        assert_eq!(
            refs.as_slice(),
            ["https://openalex.org/W1".to_string(), "https://openalex.org/W2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_fetch_by_doi_path() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/works/https://doi.org/10.7717/peerj.4375"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "referenced_works": ["https://openalex.org/W3"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let refs = mock_resolver(&server)
            .resolve(&WorkIdentifier::doi("10.7717/peerj.4375"))
            .await
            .unwrap();
        assert_eq!(refs.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_missing_references_is_empty() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/works/W5"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "id": "https://openalex.org/W5" })),
            )
            .mount(&server)
            .await;

        let refs = mock_resolver(&server).resolve(&WorkIdentifier::parse("W5")).await.unwrap();
        assert!(refs.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_status() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = mock_resolver(&server).resolve(&WorkIdentifier::parse("W404")).await;
        assert!(matches!(result, Err(ResolveError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_fetch_undecodable_body() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
            .mount(&server)
            .await;

        let result = mock_resolver(&server).resolve(&WorkIdentifier::parse("W6")).await;
        assert!(matches!(result, Err(ResolveError::Malformed { .. })));
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "referenced_works": [] }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = OpenAlexConfig {
            base_url: server.uri(),
            timeout_secs: 1,
            ..OpenAlexConfig::default()
        };
        let result = OpenAlexResolver::new(&config)
            .unwrap()
            .resolve(&WorkIdentifier::parse("W8"))
            .await;
        assert!(result.unwrap_err().is_timeout());
    }

    #[test]
    fn test_work_record_missing_references_is_empty() {
        let record: WorkRecord = serde_json::from_str(r#"{"id": "https://openalex.org/W1"}"#).unwrap();
        assert!(record.referenced_works.is_empty());
    }

    #[tokio::test]
    async fn test_static_resolver_lookups() {
        let resolver = StaticResolver::new()
            .with_doi("10.1/focal", &["https://openalex.org/W1"])
            .with_work("https://openalex.org/W1", &["https://openalex.org/W2"]);

        let focal = resolver.resolve(&WorkIdentifier::doi("10.1/focal")).await.unwrap();
        assert_eq!(focal.as_slice(), ["https://openalex.org/W1".to_string()]);

        let by_bare_id = resolver.resolve(&WorkIdentifier::parse("W1")).await.unwrap();
        assert_eq!(by_bare_id.len(), 1);

        let missing = resolver.resolve(&WorkIdentifier::parse("W9")).await;
        assert!(matches!(missing, Err(ResolveError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_static_resolver_failing() {
        let id = WorkIdentifier::parse("W1");
        let resolver = StaticResolver::new().with_work("W1", &[]).failing(&id);
        let result = resolver.resolve(&id).await;
        assert!(matches!(result, Err(ResolveError::Status { status: 503, .. })));
    }

    #[test]
    fn test_fixture_keys_normalised() {
        let resolver = StaticResolver::from_json(
            r#"{ "10.1/focal": ["https://openalex.org/W1"], "https://openalex.org/W1": [] }"#,
        )
        .unwrap();
        let result = tokio_test::block_on(resolver.resolve(&WorkIdentifier::doi("https://doi.org/10.1/focal")));
        assert_eq!(result.unwrap().len(), 1);
    }
}
