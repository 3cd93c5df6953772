//! Insights Scan Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod config;
pub mod insights;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use insights::{InsightsService, ScanJobProcessor, ScanPoller, SqliteInsightsStore};
pub use server::{run_server, RequestsLoggingLevel};
