//! Data models for insight scans.
//!
//! Defines scan jobs, their lifecycle status, the four result record kinds
//! and the dashboard view that joins them.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle status of a scan job.
///
/// The integer codes are part of the public contract: negative is reserved for
/// failure and is not a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum ScanStatus {
    Pending = 0,
    Running = 1,
    Completed = 2, // terminal
    Failed = -1,   // terminal
}

impl ScanStatus {
    /// Returns true if this is a terminal state (Completed or Failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(ScanStatus::Pending),
            1 => Some(ScanStatus::Running),
            2 => Some(ScanStatus::Completed),
            -1 => Some(ScanStatus::Failed),
            _ => None,
        }
    }
}

impl From<ScanStatus> for i32 {
    fn from(status: ScanStatus) -> Self {
        status.as_i32()
    }
}

impl TryFrom<i32> for ScanStatus {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        ScanStatus::from_i32(value).ok_or_else(|| format!("invalid scan status code {}", value))
    }
}

/// A scan job: one unit of requested analysis work for a target URL.
///
/// Transitions never mutate a job in place; each returns a new snapshot that
/// the processor persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanJob {
    /// Store-assigned identifier
    pub id: i64,
    /// Owner of the job
    pub user_id: i64,
    /// What is being scanned
    pub target_url: String,
    pub status: ScanStatus,
    /// Set when the job completes
    pub overall_score: Option<i32>,
    /// Number of passes that claimed this job
    pub attempts: i32,
    /// Reason of the most recent failure
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScanJob {
    /// Running snapshot produced when a pass claims this job.
    pub fn claimed(&self, now: DateTime<Utc>) -> Self {
        Self {
            status: ScanStatus::Running,
            attempts: self.attempts + 1,
            error_message: None,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Completed snapshot carrying the overall score.
    pub fn completed(&self, overall_score: i32, now: DateTime<Utc>) -> Self {
        Self {
            status: ScanStatus::Completed,
            overall_score: Some(overall_score),
            error_message: None,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Failed snapshot recording why the pass gave up.
    pub fn failed(&self, reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: ScanStatus::Failed,
            error_message: Some(reason.into()),
            updated_at: now,
            ..self.clone()
        }
    }
}

/// Tone of a single brand mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionSentiment {
    Positive,
    Neutral,
    Negative,
}

impl MentionSentiment {
    pub const ALL: [MentionSentiment; 3] = [
        MentionSentiment::Positive,
        MentionSentiment::Neutral,
        MentionSentiment::Negative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MentionSentiment::Positive => "positive",
            MentionSentiment::Neutral => "neutral",
            MentionSentiment::Negative => "negative",
        }
    }
}

impl FromStr for MentionSentiment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "positive" => Ok(MentionSentiment::Positive),
            "neutral" => Ok(MentionSentiment::Neutral),
            "negative" => Ok(MentionSentiment::Negative),
            other => bail!("Invalid mention sentiment '{}'", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandMention {
    pub source_name: String,
    pub url: String,
    pub snippet: String,
    pub sentiment: MentionSentiment,
    pub mention_date: DateTime<Utc>,
}

/// Sentiment split for one platform, ratios in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSnapshot {
    pub platform: String,
    pub positive_ratio: i32,
    pub neutral_ratio: i32,
    pub negative_ratio: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordGap {
    pub keyword: String,
    pub competitor_volume: i32,
    pub our_volume: i32,
    pub difficulty: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitivePosition {
    pub competitor_name: String,
    /// Percent of the market
    pub market_share: f64,
    /// Percent growth
    pub growth_rate: f64,
}

/// A persisted result record owned by one scan job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord<T> {
    pub id: i64,
    pub job_id: i64,
    #[serde(flatten)]
    pub record: T,
}

/// Everything one analysis pass produced for a job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisReport {
    pub overall_score: i32,
    pub mentions: Vec<BrandMention>,
    pub sentiments: Vec<SentimentSnapshot>,
    pub keywords: Vec<KeywordGap>,
    pub positions: Vec<CompetitivePosition>,
}

/// Read-only join of a job with its four result collections.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsDashboard {
    pub job: ScanJob,
    pub mentions: Vec<JobRecord<BrandMention>>,
    pub sentiments: Vec<JobRecord<SentimentSnapshot>>,
    pub keywords: Vec<JobRecord<KeywordGap>>,
    pub positions: Vec<JobRecord<CompetitivePosition>>,
}

impl InsightsDashboard {
    /// Returns true if none of the four result collections has any record.
    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
            && self.sentiments.is_empty()
            && self.keywords.is_empty()
            && self.positions.is_empty()
    }
}
