//! Work identifiers and reference sets
//!
//! A work is addressed either by DOI or by its OpenAlex id. References
//! returned by OpenAlex are always OpenAlex ids, so a dispersion run mixes
//! both kinds.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Host prefix of OpenAlex entity URLs
pub const OPENALEX_HOST: &str = "https://openalex.org/";

/// Resolver URL prefix used for DOI-keyed lookups
pub const DOI_URL_PREFIX: &str = "https://doi.org/";

const DOI_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
];

fn doi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("static DOI pattern"))
}

fn openalex_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[Ww]\d+$").expect("static OpenAlex id pattern"))
}

/// Identifier of a scholarly work
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WorkIdentifier {
    /// Digital Object Identifier, stored without resolver prefix
    Doi(String),
    /// OpenAlex work id, either bare (`W123`) or as entity URL
    OpenAlex(String),
}

impl WorkIdentifier {
    /// Classify a raw identifier string
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with(OPENALEX_HOST) || openalex_id_pattern().is_match(trimmed) {
            WorkIdentifier::OpenAlex(trimmed.to_string())
        } else {
            Self::doi(trimmed)
        }
    }

    /// Treat the input as a DOI regardless of its shape
    pub fn doi(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lowered = trimmed.to_ascii_lowercase();
        let stripped = DOI_PREFIXES
            .iter()
            .find(|prefix| lowered.starts_with(*prefix))
            .map(|prefix| &trimmed[prefix.len()..])
            .unwrap_or(trimmed);
        WorkIdentifier::Doi(stripped.to_string())
    }

    /// Whether the identifier has the `10.<registrant>/<suffix>` DOI shape
    pub fn looks_like_doi(&self) -> bool {
        match self {
            WorkIdentifier::Doi(doi) => doi_pattern().is_match(doi),
            WorkIdentifier::OpenAlex(_) => false,
        }
    }

    /// Key used in the `/works/{key}` lookup
    pub fn lookup_key(&self) -> String {
        match self {
            WorkIdentifier::Doi(doi) => format!("{}{}", DOI_URL_PREFIX, doi),
            WorkIdentifier::OpenAlex(id) => id
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or(id)
                .to_string(),
        }
    }

    /// The identifier as given, without the DOI resolver prefix
    pub fn as_str(&self) -> &str {
        match self {
            WorkIdentifier::Doi(value) | WorkIdentifier::OpenAlex(value) => value,
        }
    }

    /// Short label for metrics and logs
    pub fn path_label(&self) -> &'static str {
        match self {
            WorkIdentifier::Doi(_) => "doi",
            WorkIdentifier::OpenAlex(_) => "id",
        }
    }
}

impl fmt::Display for WorkIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered list of works cited by a work
///
/// Positions matter: the same id may appear twice and both occurrences are
/// kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceSet(Vec<String>);

impl ReferenceSet {
    pub fn new(references: Vec<String>) -> Self {
        Self(references)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for ReferenceSet {
    fn from(references: Vec<String>) -> Self {
        Self(references)
    }
}

impl<'a> IntoIterator for &'a ReferenceSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
