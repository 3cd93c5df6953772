mod file_config;

pub use file_config::{FileConfig, InsightsConfig};

use crate::insights::{ClaimMode, FailedJobPolicy, ProcessorSettings};
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,

    pub insights: InsightsSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let insights = InsightsSettings::from_file(file.insights.unwrap_or_default())?;

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            insights,
        })
    }

    pub fn insights_db_path(&self) -> PathBuf {
        self.db_dir.join("insights.db")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsightsSettings {
    pub poll_interval_secs: u64,
    /// 0 means no timeout
    pub analysis_timeout_secs: u64,
    pub claim_mode: ClaimMode,
    pub failed_job_policy: FailedJobPolicy,
}

impl Default for InsightsSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            analysis_timeout_secs: 300,
            claim_mode: ClaimMode::CompareAndSwap,
            failed_job_policy: FailedJobPolicy::Terminal,
        }
    }
}

impl InsightsSettings {
    fn from_file(file: InsightsConfig) -> Result<Self> {
        let defaults = Self::default();

        let poll_interval_secs = file
            .poll_interval_secs
            .unwrap_or(defaults.poll_interval_secs);
        if poll_interval_secs == 0 {
            bail!("insights.poll_interval_secs must be greater than 0");
        }

        let claim_mode = match file.claim_mode {
            Some(s) => s.parse()?,
            None => defaults.claim_mode,
        };

        let failed_job_policy = FailedJobPolicy::from_config(
            file.failed_job_policy.as_deref().unwrap_or("terminal"),
            file.max_attempts.unwrap_or(3),
        )?;

        Ok(Self {
            poll_interval_secs,
            analysis_timeout_secs: file
                .analysis_timeout_secs
                .unwrap_or(defaults.analysis_timeout_secs),
            claim_mode,
            failed_job_policy,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn processor_settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            claim_mode: self.claim_mode,
            failed_job_policy: self.failed_job_policy,
            analysis_timeout: match self.analysis_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
