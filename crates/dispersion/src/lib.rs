//! RefDisp Calculator
//!
//! Computes the reference dispersion (RED) of scholarly works:
//! 1. Resolves the focal DOI's references
//! 2. Resolves each reference's own references
//! 3. Counts co-citation links among the focal references
//! 4. Derives density and RED

pub mod batch;
pub mod calculator;
pub mod errors;
pub mod input;
pub mod output;

pub use batch::{BatchReport, BatchRunner};
pub use calculator::{
    CalculatorOptions, DispersionCalculator, DispersionMetrics, DispersionOutcome, DispersionResult,
};
pub use errors::DispersionError;

use refdisp_common::throttle::{create_throttle, FixedIntervalThrottle};
use refdisp_common::{AppConfig, WorkResolver};
use std::sync::Arc;

/// Wire a calculator and batch runner from configuration
pub fn build_runner(
    config: &AppConfig,
    resolver: Arc<dyn WorkResolver>,
) -> Result<(Arc<DispersionCalculator>, BatchRunner), DispersionError> {
    let throttle = create_throttle(&config.throttle)?;
    let calculator = Arc::new(DispersionCalculator::new(
        resolver,
        throttle,
        CalculatorOptions::from(&config.metric),
    ));
    let pacing = Arc::new(FixedIntervalThrottle::new(config.pause_between_works()));
    let runner = BatchRunner::new(calculator.clone(), pacing);
    Ok((calculator, runner))
}
