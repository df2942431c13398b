//! RefDisp Common Library
//!
//! Shared code for the RefDisp calculator and gateway including:
//! - Work identifiers and reference sets
//! - Work resolver abstraction (OpenAlex client)
//! - Request throttling policies
//! - Diagnostic log sink
//! - Error types and handling
//! - Configuration management
//! - Metrics and tracing setup

pub mod config;
pub mod errors;
pub mod logsink;
pub mod metrics;
pub mod observability;
pub mod resolver;
pub mod throttle;
pub mod works;

// Re-export commonly used types
pub use self::config::{AppConfig, LinkCounting};
pub use errors::{AppError, Result};
pub use logsink::{LogEntry, LogKind, LogSink, MemoryLog, NullLog, TracingLog};
pub use resolver::{OpenAlexResolver, ResolveError, StaticResolver, WorkResolver};
pub use throttle::RequestThrottle;
pub use works::{ReferenceSet, WorkIdentifier};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Marker written in place of every metric of a work that could not be resolved
pub const UNAVAILABLE_MARKER: &str = "unavailable";
