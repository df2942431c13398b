//! Sequential batch processing
//!
//! DOIs are processed one at a time in input order. A pacing gate is
//! acquired before each DOI so consecutive works are spaced out.

use crate::calculator::{DispersionCalculator, DispersionResult};
use chrono::{DateTime, Utc};
use refdisp_common::{LogSink, RequestThrottle};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Results of one batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub results: Vec<DispersionResult>,
}

impl BatchReport {
    pub fn computed(&self) -> usize {
        self.results.iter().filter(|r| r.is_available()).count()
    }

    pub fn unavailable(&self) -> usize {
        self.results.len() - self.computed()
    }
}

pub struct BatchRunner {
    calculator: Arc<DispersionCalculator>,
    pacing: Arc<dyn RequestThrottle>,
}

impl BatchRunner {
    pub fn new(calculator: Arc<DispersionCalculator>, pacing: Arc<dyn RequestThrottle>) -> Self {
        Self { calculator, pacing }
    }

    /// Compute one record per DOI, in input order
    #[instrument(skip_all, fields(total = dois.len()))]
    pub async fn run(&self, dois: &[String], log: &dyn LogSink) -> BatchReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let total = dois.len();
        info!(%run_id, "Batch started");

        let mut results = Vec::with_capacity(total);
        for (index, doi) in dois.iter().enumerate() {
            log.progress(format!("[{}/{}] processing: {}", index + 1, total, doi));
            self.pacing.acquire().await;
            results.push(self.calculator.compute(doi, log).await);
        }

        let report = BatchReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            results,
        };

        info!(
            %run_id,
            computed = report.computed(),
            unavailable = report.unavailable(),
            "Batch finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::CalculatorOptions;
    use refdisp_common::throttle::{FixedIntervalThrottle, Unthrottled};
    use refdisp_common::{MemoryLog, StaticResolver};
    use std::time::Duration;

    fn runner(pacing: Arc<dyn RequestThrottle>) -> BatchRunner {
        let resolver = StaticResolver::new()
            .with_doi("10.1000/a", &["https://openalex.org/W1", "https://openalex.org/W2"])
            .with_doi("10.1000/b", &[])
            .with_work("https://openalex.org/W1", &["https://openalex.org/W2"])
            .with_work("https://openalex.org/W2", &[]);
        let calculator = DispersionCalculator::new(
            Arc::new(resolver),
            Arc::new(Unthrottled),
            CalculatorOptions::default(),
        );
        BatchRunner::new(Arc::new(calculator), pacing)
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let dois = vec![
            "10.1000/b".to_string(),
            "10.1000/missing".to_string(),
            "10.1000/a".to_string(),
            "10.1000/b".to_string(),
        ];
        let report = runner(Arc::new(Unthrottled)).run(&dois, &MemoryLog::new()).await;

        let order: Vec<&str> = report.results.iter().map(|r| r.doi.as_str()).collect();
        assert_eq!(order, vec!["10.1000/b", "10.1000/missing", "10.1000/a", "10.1000/b"]);
        assert_eq!(report.computed(), 3);
        assert_eq!(report.unavailable(), 1);
        assert_eq!(report.results[2].metrics().unwrap().links, 1);
    }

    #[tokio::test]
    async fn test_progress_lines() {
        let dois = vec!["10.1000/b".to_string(), "10.1000/a".to_string()];
        let log = MemoryLog::new();
        runner(Arc::new(Unthrottled)).run(&dois, &log).await;

        let messages = log.messages();
        assert_eq!(messages[0], "[1/2] processing: 10.1000/b");
        assert!(messages.contains(&"[2/2] processing: 10.1000/a".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_works() {
        let dois = vec!["10.1000/b".to_string(); 3];
        let start = tokio::time::Instant::now();
        let pacing = Arc::new(FixedIntervalThrottle::new(Duration::from_secs(1)));
        runner(pacing).run(&dois, &MemoryLog::new()).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let report = runner(Arc::new(Unthrottled)).run(&[], &MemoryLog::new()).await;
        assert!(report.results.is_empty());
        assert_eq!(report.computed(), 0);
    }
}
