//! Database schema for insights.db.
//!
//! Scan jobs plus the four result tables, each owned by a job through a
//! cascading foreign key.

use crate::sqlite_column;
use crate::sqlite_persistence::{ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema};

const JOB_FOREIGN_KEY: ForeignKey = ForeignKey {
    foreign_table: "insight_scan_job",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

// =============================================================================
// Version 0
// =============================================================================

const SCAN_JOB_TABLE_V0: Table = Table {
    name: "insight_scan_job",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("target_url", &SqlType::Text, non_null = true),
        sqlite_column!("status", &SqlType::Integer, non_null = true),
        sqlite_column!("overall_score", &SqlType::Integer),
        sqlite_column!(
            "attempts",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!("error_message", &SqlType::Text),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_scan_job_status", "status, created_at"),
        ("idx_scan_job_user", "user_id, created_at"),
    ],
};

const BRAND_MENTION_TABLE_V0: Table = Table {
    name: "brand_mention",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "job_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&JOB_FOREIGN_KEY)
        ),
        sqlite_column!("source_name", &SqlType::Text, non_null = true),
        sqlite_column!("url", &SqlType::Text, non_null = true),
        sqlite_column!("snippet", &SqlType::Text, non_null = true),
        sqlite_column!("sentiment", &SqlType::Text, non_null = true),
        sqlite_column!("mention_date", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_brand_mention_job", "job_id")],
};

const SENTIMENT_SNAPSHOT_TABLE_V0: Table = Table {
    name: "sentiment_snapshot",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "job_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&JOB_FOREIGN_KEY)
        ),
        sqlite_column!("platform", &SqlType::Text, non_null = true),
        sqlite_column!("positive_ratio", &SqlType::Integer, non_null = true),
        sqlite_column!("neutral_ratio", &SqlType::Integer, non_null = true),
        sqlite_column!("negative_ratio", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_sentiment_snapshot_job", "job_id")],
};

const KEYWORD_GAP_TABLE_V0: Table = Table {
    name: "keyword_gap",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "job_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&JOB_FOREIGN_KEY)
        ),
        sqlite_column!("keyword", &SqlType::Text, non_null = true),
        sqlite_column!("competitor_volume", &SqlType::Integer, non_null = true),
        sqlite_column!("our_volume", &SqlType::Integer, non_null = true),
        sqlite_column!("difficulty", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_keyword_gap_job", "job_id")],
};

const COMPETITIVE_POSITION_TABLE_V0: Table = Table {
    name: "competitive_position",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "job_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&JOB_FOREIGN_KEY)
        ),
        sqlite_column!("competitor_name", &SqlType::Text, non_null = true),
        sqlite_column!("market_share", &SqlType::Real, non_null = true),
        sqlite_column!("growth_rate", &SqlType::Real, non_null = true),
    ],
    indices: &[("idx_competitive_position_job", "job_id")],
};

pub const INSIGHTS_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        SCAN_JOB_TABLE_V0,
        BRAND_MENTION_TABLE_V0,
        SENTIMENT_SNAPSHOT_TABLE_V0,
        KEYWORD_GAP_TABLE_V0,
        COMPETITIVE_POSITION_TABLE_V0,
    ],
    migration: None,
}];
