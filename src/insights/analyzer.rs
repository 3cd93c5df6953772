//! Scan analysis strategies.
//!
//! The processor only depends on the [`ScanAnalyzer`] trait. The shipped
//! [`ScenarioAnalyzer`] produces synthetic results from two fixed scenarios.

use super::models::*;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use thiserror::Error;

/// Errors an analyzer can report for a single job.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Analysis failed: {0}")]
    Failed(String),
}

/// Produces the result records and overall score for a scan job.
#[async_trait]
pub trait ScanAnalyzer: Send + Sync {
    async fn analyze(&self, job: &ScanJob) -> Result<AnalysisReport, AnalysisError>;
}

const MENTION_SOURCES: [&str; 4] = ["Twitter", "TechCrunch", "Reddit", "LinkedIn News"];
const MENTIONS_PER_SCAN: usize = 5;
const MENTION_MAX_AGE_HOURS: i64 = 48;

/// Which of the two canned result sets a target maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Competitor,
    OwnBrand,
}

impl Scenario {
    pub fn for_target(target_url: &str) -> Self {
        if target_url.contains("competitor") {
            Scenario::Competitor
        } else {
            Scenario::OwnBrand
        }
    }

    pub fn overall_score(&self) -> i32 {
        match self {
            Scenario::Competitor => 85,
            Scenario::OwnBrand => 92,
        }
    }

    fn mention_snippet(&self) -> &'static str {
        match self {
            Scenario::Competitor => "Competitor X just launched a new feature...",
            Scenario::OwnBrand => "Our travel kit is saving lives!",
        }
    }

    /// Twitter (positive, neutral, negative) split.
    fn twitter_split(&self) -> (i32, i32, i32) {
        match self {
            Scenario::Competitor => (40, 30, 30),
            Scenario::OwnBrand => (65, 30, 5),
        }
    }
}

/// Synthetic analyzer with a competitor scenario and an own-brand scenario.
///
/// Record counts and all values except the mentions are fixed, so repeated
/// passes over the same target always yield the same shape.
#[derive(Debug, Default, Clone)]
pub struct ScenarioAnalyzer;

impl ScenarioAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn build_report(&self, scenario: Scenario) -> AnalysisReport {
        let mut rng = rand::rng();
        let now = Utc::now();

        let mentions = (0..MENTIONS_PER_SCAN)
            .map(|_| {
                let source = MENTION_SOURCES[rng.random_range(0..MENTION_SOURCES.len())];
                let sentiment =
                    MentionSentiment::ALL[rng.random_range(0..MentionSentiment::ALL.len())];
                BrandMention {
                    source_name: source.to_string(),
                    url: format!("https://example.com/mention/{}", rng.random_range(0..1000)),
                    snippet: scenario.mention_snippet().to_string(),
                    sentiment,
                    mention_date: now
                        - Duration::hours(rng.random_range(0..MENTION_MAX_AGE_HOURS)),
                }
            })
            .collect();

        let (positive, neutral, negative) = scenario.twitter_split();
        let sentiments = vec![
            SentimentSnapshot {
                platform: "Twitter".to_string(),
                positive_ratio: positive,
                neutral_ratio: neutral,
                negative_ratio: negative,
            },
            SentimentSnapshot {
                platform: "Reddit".to_string(),
                positive_ratio: 50,
                neutral_ratio: 25,
                negative_ratio: 25,
            },
        ];

        let keywords = vec![
            KeywordGap {
                keyword: "travel essential list".to_string(),
                competitor_volume: 5000,
                our_volume: 1200,
                difficulty: 75,
            },
            KeywordGap {
                keyword: "best packing app".to_string(),
                competitor_volume: 2100,
                our_volume: 3400,
                difficulty: 45,
            },
        ];

        let positions = vec![
            CompetitivePosition {
                competitor_name: "Our Brand".to_string(),
                market_share: 15.5,
                growth_rate: 12.4,
            },
            CompetitivePosition {
                competitor_name: "Major Competitor X".to_string(),
                market_share: 35.0,
                growth_rate: 5.2,
            },
        ];

        AnalysisReport {
            overall_score: scenario.overall_score(),
            mentions,
            sentiments,
            keywords,
            positions,
        }
    }
}

#[async_trait]
impl ScanAnalyzer for ScenarioAnalyzer {
    async fn analyze(&self, job: &ScanJob) -> Result<AnalysisReport, AnalysisError> {
        if job.target_url.trim().is_empty() {
            return Err(AnalysisError::InvalidTarget(format!(
                "job {} has an empty target",
                job.id
            )));
        }
        Ok(self.build_report(Scenario::for_target(&job.target_url)))
    }
}
