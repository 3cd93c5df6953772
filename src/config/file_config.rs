use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,

    // Feature configs
    pub insights: Option<InsightsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct InsightsConfig {
    pub poll_interval_secs: Option<u64>,
    /// 0 disables the analysis timeout
    pub analysis_timeout_secs: Option<u64>,
    /// "compare_and_swap" or "unguarded"
    pub claim_mode: Option<String>,
    /// "terminal" or "requeue"
    pub failed_job_policy: Option<String>,
    pub max_attempts: Option<i32>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
