//! Reference dispersion calculator
//!
//! For a focal DOI with references `R = [r_1 .. r_N]`, every reference is
//! resolved in turn and its own references compared against the rest of
//! `R`. The summed overlap gives `links`, from which density and RED follow.

use refdisp_common::config::MetricConfig;
use refdisp_common::metrics;
use refdisp_common::{
    LinkCounting, LogSink, ReferenceSet, RequestThrottle, WorkIdentifier, WorkResolver,
    UNAVAILABLE_MARKER,
};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Computed metrics of one focal work
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DispersionMetrics {
    /// Number of references of the focal work
    pub refs: usize,
    /// Co-citation links among those references
    pub links: usize,
    /// Links relative to `N(N-1)/2`, 6 decimals
    pub density: f64,
    /// `1 - density^(1/3)`, 4 decimals
    pub red: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispersionOutcome {
    Computed(DispersionMetrics),
    /// The focal work could not be resolved
    Unavailable { reason: String },
}

/// One output record per input DOI
#[derive(Debug, Clone, PartialEq)]
pub struct DispersionResult {
    pub doi: String,
    pub outcome: DispersionOutcome,
}

impl DispersionResult {
    pub fn computed(doi: &str, metrics: DispersionMetrics) -> Self {
        Self {
            doi: doi.to_string(),
            outcome: DispersionOutcome::Computed(metrics),
        }
    }

    pub fn unavailable(doi: &str, reason: impl Into<String>) -> Self {
        Self {
            doi: doi.to_string(),
            outcome: DispersionOutcome::Unavailable { reason: reason.into() },
        }
    }

    pub fn metrics(&self) -> Option<&DispersionMetrics> {
        match &self.outcome {
            DispersionOutcome::Computed(metrics) => Some(metrics),
            DispersionOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.metrics().is_some()
    }
}

/// A record cell: a number, or the unavailable marker
enum Field {
    Count(usize),
    Ratio(f64),
    Unavailable,
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Count(value) => serializer.serialize_u64(*value as u64),
            Field::Ratio(value) => serializer.serialize_f64(*value),
            Field::Unavailable => serializer.serialize_str(UNAVAILABLE_MARKER),
        }
    }
}

// Flat `{doi, refs, links, density, red}` record; all four metrics collapse
// to the marker together.
impl Serialize for DispersionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (refs, links, density, red) = match &self.outcome {
            DispersionOutcome::Computed(m) => (
                Field::Count(m.refs),
                Field::Count(m.links),
                Field::Ratio(m.density),
                Field::Ratio(m.red),
            ),
            DispersionOutcome::Unavailable { .. } => {
                (Field::Unavailable, Field::Unavailable, Field::Unavailable, Field::Unavailable)
            }
        };

        let mut record = serializer.serialize_struct("DispersionResult", 5)?;
        record.serialize_field("doi", &self.doi)?;
        record.serialize_field("refs", &refs)?;
        record.serialize_field("links", &links)?;
        record.serialize_field("density", &density)?;
        record.serialize_field("red", &red)?;
        record.end()
    }
}

/// Per-position overlap `|set(R without position i) ∩ set(refs_i)|`
///
/// Only the occurrence at position `i` is excluded; a duplicate of `r_i`
/// elsewhere in `R` still counts.
pub fn link_contributions(references: &[String], cited: &[ReferenceSet]) -> Vec<usize> {
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for reference in references {
        *occurrences.entry(reference.as_str()).or_default() += 1;
    }

    references
        .iter()
        .zip(cited)
        .map(|(own, refs_i)| {
            let distinct: HashSet<&str> = refs_i.iter().map(String::as_str).collect();
            distinct
                .into_iter()
                .filter(|candidate| {
                    let count = occurrences.get(candidate).copied().unwrap_or(0);
                    let excluded = usize::from(*candidate == own.as_str());
                    count > excluded
                })
                .count()
        })
        .collect()
}

/// Total links, summed over positions (each mutual citation counts twice)
pub fn count_links(references: &[String], cited: &[ReferenceSet]) -> usize {
    link_contributions(references, cited).into_iter().sum()
}

/// Unordered position pairs `{i, j}` where either side cites the other
pub fn count_undirected_links(references: &[String], cited: &[ReferenceSet]) -> usize {
    let sets: Vec<HashSet<&str>> = cited
        .iter()
        .map(|refs| refs.iter().map(String::as_str).collect())
        .collect();

    let n = references.len().min(sets.len());
    let mut links = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            if sets[i].contains(references[j].as_str()) || sets[j].contains(references[i].as_str()) {
                links += 1;
            }
        }
    }
    links
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Density and RED from a reference count and link count
pub fn derive_metrics(refs: usize, links: usize, mode: LinkCounting) -> DispersionMetrics {
    if refs < 2 {
        return DispersionMetrics {
            refs,
            links,
            density: 0.0,
            red: 1.0,
        };
    }

    let pairs = refs as f64 * (refs - 1) as f64;
    let density = match mode {
        // Not clamped: may exceed 1, making RED negative
        LinkCounting::Replicated => 2.0 * links as f64 / pairs,
        LinkCounting::Deduplicated => (2.0 * links as f64 / pairs).clamp(0.0, 1.0),
    };

    DispersionMetrics {
        refs,
        links,
        density: round_to(density, 6),
        red: round_to(1.0 - density.powf(1.0 / 3.0), 4),
    }
}

/// Calculator options
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculatorOptions {
    pub link_counting: LinkCounting,
    pub report_reference_failures: bool,
}

impl From<&MetricConfig> for CalculatorOptions {
    fn from(config: &MetricConfig) -> Self {
        Self {
            link_counting: config.link_counting,
            report_reference_failures: config.report_reference_failures,
        }
    }
}

/// Dispersion calculator
pub struct DispersionCalculator {
    resolver: Arc<dyn WorkResolver>,
    throttle: Arc<dyn RequestThrottle>,
    options: CalculatorOptions,
}

impl DispersionCalculator {
    pub fn new(
        resolver: Arc<dyn WorkResolver>,
        throttle: Arc<dyn RequestThrottle>,
        options: CalculatorOptions,
    ) -> Self {
        Self {
            resolver,
            throttle,
            options,
        }
    }

    pub fn options(&self) -> CalculatorOptions {
        self.options
    }

    /// Compute the dispersion record of one DOI
    ///
    /// Never fails: a focal lookup failure yields an unavailable record,
    /// reference lookup failures count as empty reference lists.
    #[instrument(skip(self, log), fields(resolver = self.resolver.name()))]
    pub async fn compute(&self, doi: &str, log: &dyn LogSink) -> DispersionResult {
        let start = Instant::now();
        let focal = WorkIdentifier::doi(doi);
        if !focal.looks_like_doi() {
            warn!(input = doi, "Input does not look like a DOI");
        }

        self.throttle.acquire().await;
        let references = match self.resolver.resolve(&focal).await {
            Ok(references) => references,
            Err(e) => {
                log.failure(format!("DOI {} failed: {}", doi, e));
                metrics::record_dispersion(start.elapsed().as_secs_f64(), "unavailable", None);
                return DispersionResult::unavailable(doi, e.to_string());
            }
        };

        let total = references.len();
        log.progress(format!("Reference count: {}", total));
        info!(references = total, "Focal work resolved");

        let mut cited = Vec::with_capacity(total);
        for (position, reference) in references.iter().enumerate() {
            log.progress(format!("Processing reference {} of {}: {}", position + 1, total, reference));
            cited.push(self.resolve_reference(reference, log).await);
        }

        let links = match self.options.link_counting {
            LinkCounting::Replicated => count_links(references.as_slice(), &cited),
            LinkCounting::Deduplicated => count_undirected_links(references.as_slice(), &cited),
        };
        let result = derive_metrics(total, links, self.options.link_counting);

        debug!(links = result.links, density = result.density, red = result.red, "Dispersion computed");
        metrics::record_dispersion(start.elapsed().as_secs_f64(), "computed", Some(total));

        DispersionResult::computed(doi, result)
    }

    async fn resolve_reference(&self, reference: &str, log: &dyn LogSink) -> ReferenceSet {
        let id = WorkIdentifier::OpenAlex(reference.to_string());
        self.throttle.acquire().await;
        match self.resolver.resolve(&id).await {
            Ok(refs) => refs,
            Err(e) => {
                if self.options.report_reference_failures {
                    log.failure(format!("Reference {} failed: {}", reference, e));
                }
                ReferenceSet::default()
            }
        }
    }
}
