//! Asynchronous scan job pipeline: store, analyzer, processor, poller and the
//! service facade on top of them.

mod analyzer;
mod dashboard;
mod models;
mod poller;
mod processor;
mod schema;
mod service;
mod store;

pub use analyzer::{AnalysisError, ScanAnalyzer, Scenario, ScenarioAnalyzer};
pub use dashboard::assemble_dashboard;
pub use models::*;
pub use poller::ScanPoller;
pub use processor::{
    ClaimMode, FailedJobPolicy, PassError, PassSummary, ProcessorSettings, ScanJobProcessor,
};
pub use service::{InsightsError, InsightsService};
pub use store::{InsightsStore, ResultStore, ScanJobStore, SqliteInsightsStore};
