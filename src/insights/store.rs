//! Insights storage and persistence.
//!
//! Provides the job store and result writer contracts, and a SQLite-backed
//! implementation of both.

use super::models::*;
use super::schema::INSIGHTS_VERSIONED_SCHEMAS;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Persistence of scan job records.
pub trait ScanJobStore: Send + Sync {
    /// Insert a new Pending job. The store assigns the id.
    fn insert_job(&self, user_id: i64, target_url: &str, now: DateTime<Utc>) -> Result<ScanJob>;

    fn get_job(&self, id: i64) -> Result<Option<ScanJob>>;

    /// Jobs owned by a user, most recent first.
    fn list_jobs_by_user(&self, user_id: i64) -> Result<Vec<ScanJob>>;

    /// Persist the full mutable projection of a job (status, score, attempts,
    /// error message, updated_at).
    fn update_job(&self, job: &ScanJob) -> Result<()>;

    /// All jobs currently Pending, oldest first.
    fn list_pending_jobs(&self) -> Result<Vec<ScanJob>>;

    /// Atomically persist a claimed snapshot, only if the stored job is still
    /// Pending. Returns false if another pass got there first.
    fn claim_job(&self, claimed: &ScanJob) -> Result<bool>;

    /// Persist a Failed snapshot, only if the stored job is still Running.
    /// Returns false if the job was already resolved.
    fn fail_job(&self, failed: &ScanJob) -> Result<bool>;

    /// Move Failed jobs with fewer than `max_attempts` attempts back to
    /// Pending. Returns the number of requeued jobs.
    fn requeue_failed_jobs(&self, max_attempts: i32, now: DateTime<Utc>) -> Result<usize>;
}

/// The four result writers, each keyed by owning job id.
pub trait ResultStore: Send + Sync {
    // === Mentions ===
    fn insert_mention(&self, job_id: i64, mention: &BrandMention) -> Result<i64>;
    fn list_mentions_for_job(&self, job_id: i64) -> Result<Vec<JobRecord<BrandMention>>>;
    fn delete_mentions_for_job(&self, job_id: i64) -> Result<usize>;

    // === Sentiment snapshots ===
    fn insert_sentiment(&self, job_id: i64, snapshot: &SentimentSnapshot) -> Result<i64>;
    fn list_sentiments_for_job(&self, job_id: i64) -> Result<Vec<JobRecord<SentimentSnapshot>>>;
    fn delete_sentiments_for_job(&self, job_id: i64) -> Result<usize>;

    // === Keyword gaps ===
    fn insert_keyword_gap(&self, job_id: i64, gap: &KeywordGap) -> Result<i64>;
    fn list_keyword_gaps_for_job(&self, job_id: i64) -> Result<Vec<JobRecord<KeywordGap>>>;
    fn delete_keyword_gaps_for_job(&self, job_id: i64) -> Result<usize>;

    // === Competitive positions ===
    fn insert_position(&self, job_id: i64, position: &CompetitivePosition) -> Result<i64>;
    fn list_positions_for_job(&self, job_id: i64) -> Result<Vec<JobRecord<CompetitivePosition>>>;
    fn delete_positions_for_job(&self, job_id: i64) -> Result<usize>;

    /// Delete every result record of a job. Returns the number of rows removed.
    fn delete_results_for_job(&self, job_id: i64) -> Result<usize>;
}

/// Combined store used by the processor and the dashboard.
pub trait InsightsStore: ScanJobStore + ResultStore {
    /// Write all records of a successful pass and persist the Completed
    /// snapshot in a single transaction.
    ///
    /// Any records left by an earlier pass of the same job are replaced. The
    /// commit is refused if the stored job is no longer Running, and then
    /// nothing is written.
    fn commit_completed_pass(&self, completed: &ScanJob, report: &AnalysisReport) -> Result<()>;
}

/// SQLite-backed insights store.
pub struct SqliteInsightsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteInsightsStore {
    /// Open an existing insights database, or create a new one with the
    /// current schema.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let mut conn = Connection::open(path).context("Failed to open insights database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        let latest = INSIGHTS_VERSIONED_SCHEMAS
            .last()
            .context("No schemas defined")?;

        if is_new_db {
            info!("Creating new insights database at {:?}", path);
            latest.create(&conn)?;
        } else {
            let raw_version: i64 = conn
                .query_row("PRAGMA user_version;", [], |row| row.get(0))
                .context("Failed to read database version")?;
            let db_version = raw_version - BASE_DB_VERSION as i64;
            if db_version < 0 {
                bail!(
                    "Insights database version {} is too old, does not contain base db version {}",
                    raw_version,
                    BASE_DB_VERSION
                );
            }

            let schema = INSIGHTS_VERSIONED_SCHEMAS
                .iter()
                .find(|s| s.version == db_version as usize)
                .with_context(|| format!("Unknown insights database version {}", db_version))?;
            schema.validate(&conn).with_context(|| {
                format!(
                    "Insights database schema validation failed for version {}",
                    db_version
                )
            })?;

            if (db_version as usize) < latest.version {
                Self::migrate_if_needed(&mut conn, db_version as usize)?;
            }
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store for testing.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        INSIGHTS_VERSIONED_SCHEMAS
            .last()
            .context("No schemas defined")?
            .create(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate_if_needed(conn: &mut Connection, from_version: usize) -> Result<()> {
        let tx = conn.transaction()?;
        let mut current = from_version;
        for schema in INSIGHTS_VERSIONED_SCHEMAS
            .iter()
            .filter(|s| s.version > from_version)
        {
            info!(
                "Migrating insights database from version {} to {}",
                current, schema.version
            );
            if let Some(migration_fn) = schema.migration {
                migration_fn(&tx).with_context(|| {
                    format!("Failed to run migration to version {}", schema.version)
                })?;
            }
            current = schema.version;
        }
        tx.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + current),
            [],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("insights database mutex poisoned"))
    }

    /// Fixed-width millisecond RFC 3339, so text ordering matches time ordering.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn parse_datetime(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
        let raw: String = row.get(column)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
    }

    fn row_to_scan_job(row: &Row) -> rusqlite::Result<ScanJob> {
        let status_code: i32 = row.get("status")?;
        let status = ScanStatus::from_i32(status_code).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Integer,
                format!("invalid scan status code {}", status_code).into(),
            )
        })?;

        Ok(ScanJob {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            target_url: row.get("target_url")?,
            status,
            overall_score: row.get("overall_score")?,
            attempts: row.get("attempts")?,
            error_message: row.get("error_message")?,
            created_at: Self::parse_datetime(row, "created_at")?,
            updated_at: Self::parse_datetime(row, "updated_at")?,
        })
    }

    fn row_to_mention(row: &Row) -> rusqlite::Result<JobRecord<BrandMention>> {
        let sentiment_text: String = row.get("sentiment")?;
        let sentiment = sentiment_text.parse::<MentionSentiment>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into())
        })?;
        Ok(JobRecord {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            record: BrandMention {
                source_name: row.get("source_name")?,
                url: row.get("url")?,
                snippet: row.get("snippet")?,
                sentiment,
                mention_date: Self::parse_datetime(row, "mention_date")?,
            },
        })
    }

    fn row_to_sentiment(row: &Row) -> rusqlite::Result<JobRecord<SentimentSnapshot>> {
        Ok(JobRecord {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            record: SentimentSnapshot {
                platform: row.get("platform")?,
                positive_ratio: row.get("positive_ratio")?,
                neutral_ratio: row.get("neutral_ratio")?,
                negative_ratio: row.get("negative_ratio")?,
            },
        })
    }

    fn row_to_keyword_gap(row: &Row) -> rusqlite::Result<JobRecord<KeywordGap>> {
        Ok(JobRecord {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            record: KeywordGap {
                keyword: row.get("keyword")?,
                competitor_volume: row.get("competitor_volume")?,
                our_volume: row.get("our_volume")?,
                difficulty: row.get("difficulty")?,
            },
        })
    }

    fn row_to_position(row: &Row) -> rusqlite::Result<JobRecord<CompetitivePosition>> {
        Ok(JobRecord {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            record: CompetitivePosition {
                competitor_name: row.get("competitor_name")?,
                market_share: row.get("market_share")?,
                growth_rate: row.get("growth_rate")?,
            },
        })
    }

    fn query_jobs(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<ScanJob>> {
        let mut stmt = conn.prepare(sql)?;
        let jobs = stmt
            .query_map(params, Self::row_to_scan_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(jobs)
    }

    fn query_records<T>(
        conn: &Connection,
        table: &str,
        job_id: i64,
        map_row: fn(&Row) -> rusqlite::Result<JobRecord<T>>,
    ) -> Result<Vec<JobRecord<T>>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT * FROM {} WHERE job_id = ?1 ORDER BY id ASC",
            table
        ))?;
        let records = stmt
            .query_map([job_id], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    // Statement helpers below take a plain connection so they can run either
    // directly or inside the pass-commit transaction.

    fn insert_mention_on(conn: &Connection, job_id: i64, m: &BrandMention) -> Result<i64> {
        conn.execute(
            r#"INSERT INTO brand_mention (job_id, source_name, url, snippet, sentiment, mention_date)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
            params![
                job_id,
                m.source_name,
                m.url,
                m.snippet,
                m.sentiment.as_str(),
                Self::format_datetime(&m.mention_date),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn insert_sentiment_on(conn: &Connection, job_id: i64, s: &SentimentSnapshot) -> Result<i64> {
        conn.execute(
            r#"INSERT INTO sentiment_snapshot (job_id, platform, positive_ratio, neutral_ratio, negative_ratio)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                job_id,
                s.platform,
                s.positive_ratio,
                s.neutral_ratio,
                s.negative_ratio
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn insert_keyword_gap_on(conn: &Connection, job_id: i64, k: &KeywordGap) -> Result<i64> {
        conn.execute(
            r#"INSERT INTO keyword_gap (job_id, keyword, competitor_volume, our_volume, difficulty)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                job_id,
                k.keyword,
                k.competitor_volume,
                k.our_volume,
                k.difficulty
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn insert_position_on(conn: &Connection, job_id: i64, p: &CompetitivePosition) -> Result<i64> {
        conn.execute(
            r#"INSERT INTO competitive_position (job_id, competitor_name, market_share, growth_rate)
               VALUES (?1, ?2, ?3, ?4)"#,
            params![job_id, p.competitor_name, p.market_share, p.growth_rate],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn delete_from_on(conn: &Connection, table: &str, job_id: i64) -> Result<usize> {
        let deleted = conn.execute(&format!("DELETE FROM {} WHERE job_id = ?1", table), [job_id])?;
        Ok(deleted)
    }

    fn delete_all_results_on(conn: &Connection, job_id: i64) -> Result<usize> {
        let mut deleted = 0;
        for table in RESULT_TABLES {
            deleted += Self::delete_from_on(conn, table, job_id)?;
        }
        Ok(deleted)
    }
}

const RESULT_TABLES: [&str; 4] = [
    "brand_mention",
    "sentiment_snapshot",
    "keyword_gap",
    "competitive_position",
];

impl ScanJobStore for SqliteInsightsStore {
    fn insert_job(&self, user_id: i64, target_url: &str, now: DateTime<Utc>) -> Result<ScanJob> {
        let now = now.trunc_subsecs(3);
        let conn = self.lock()?;
        conn.execute(
            r#"INSERT INTO insight_scan_job (
                user_id, target_url, status, overall_score, attempts, error_message,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, NULL, 0, NULL, ?4, ?4)"#,
            params![
                user_id,
                target_url,
                ScanStatus::Pending.as_i32(),
                Self::format_datetime(&now),
            ],
        )?;

        Ok(ScanJob {
            id: conn.last_insert_rowid(),
            user_id,
            target_url: target_url.to_string(),
            status: ScanStatus::Pending,
            overall_score: None,
            attempts: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_job(&self, id: i64) -> Result<Option<ScanJob>> {
        let conn = self.lock()?;
        let job = conn
            .query_row(
                "SELECT * FROM insight_scan_job WHERE id = ?1",
                [id],
                Self::row_to_scan_job,
            )
            .optional()?;
        Ok(job)
    }

    fn list_jobs_by_user(&self, user_id: i64) -> Result<Vec<ScanJob>> {
        let conn = self.lock()?;
        Self::query_jobs(
            &conn,
            r#"SELECT * FROM insight_scan_job
               WHERE user_id = ?1
               ORDER BY created_at DESC, id DESC"#,
            [user_id],
        )
    }

    fn update_job(&self, job: &ScanJob) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            r#"UPDATE insight_scan_job
               SET status = ?2, overall_score = ?3, attempts = ?4, error_message = ?5,
                   updated_at = ?6
               WHERE id = ?1"#,
            params![
                job.id,
                job.status.as_i32(),
                job.overall_score,
                job.attempts,
                job.error_message,
                Self::format_datetime(&job.updated_at),
            ],
        )?;
        if updated == 0 {
            bail!("Scan job {} not found", job.id);
        }
        Ok(())
    }

    fn list_pending_jobs(&self) -> Result<Vec<ScanJob>> {
        let conn = self.lock()?;
        Self::query_jobs(
            &conn,
            r#"SELECT * FROM insight_scan_job
               WHERE status = ?1
               ORDER BY created_at ASC, id ASC"#,
            [ScanStatus::Pending.as_i32()],
        )
    }

    fn claim_job(&self, claimed: &ScanJob) -> Result<bool> {
        let conn = self.lock()?;
        let updated = conn.execute(
            r#"UPDATE insight_scan_job
               SET status = ?2, attempts = ?3, error_message = ?4, updated_at = ?5
               WHERE id = ?1 AND status = ?6"#,
            params![
                claimed.id,
                claimed.status.as_i32(),
                claimed.attempts,
                claimed.error_message,
                Self::format_datetime(&claimed.updated_at),
                ScanStatus::Pending.as_i32(),
            ],
        )?;
        Ok(updated == 1)
    }

    fn fail_job(&self, failed: &ScanJob) -> Result<bool> {
        let conn = self.lock()?;
        let updated = conn.execute(
            r#"UPDATE insight_scan_job
               SET status = ?2, overall_score = ?3, attempts = ?4, error_message = ?5,
                   updated_at = ?6
               WHERE id = ?1 AND status = ?7"#,
            params![
                failed.id,
                failed.status.as_i32(),
                failed.overall_score,
                failed.attempts,
                failed.error_message,
                Self::format_datetime(&failed.updated_at),
                ScanStatus::Running.as_i32(),
            ],
        )?;
        Ok(updated == 1)
    }

    fn requeue_failed_jobs(&self, max_attempts: i32, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.lock()?;
        let requeued = conn.execute(
            r#"UPDATE insight_scan_job
               SET status = ?1, updated_at = ?2
               WHERE status = ?3 AND attempts < ?4"#,
            params![
                ScanStatus::Pending.as_i32(),
                Self::format_datetime(&now),
                ScanStatus::Failed.as_i32(),
                max_attempts,
            ],
        )?;
        Ok(requeued)
    }
}

impl ResultStore for SqliteInsightsStore {
    fn insert_mention(&self, job_id: i64, mention: &BrandMention) -> Result<i64> {
        Self::insert_mention_on(&*self.lock()?, job_id, mention)
    }

    fn list_mentions_for_job(&self, job_id: i64) -> Result<Vec<JobRecord<BrandMention>>> {
        Self::query_records(&*self.lock()?, "brand_mention", job_id, Self::row_to_mention)
    }

    fn delete_mentions_for_job(&self, job_id: i64) -> Result<usize> {
        Self::delete_from_on(&*self.lock()?, "brand_mention", job_id)
    }

    fn insert_sentiment(&self, job_id: i64, snapshot: &SentimentSnapshot) -> Result<i64> {
        Self::insert_sentiment_on(&*self.lock()?, job_id, snapshot)
    }

    fn list_sentiments_for_job(&self, job_id: i64) -> Result<Vec<JobRecord<SentimentSnapshot>>> {
        Self::query_records(
            &*self.lock()?,
            "sentiment_snapshot",
            job_id,
            Self::row_to_sentiment,
        )
    }

    fn delete_sentiments_for_job(&self, job_id: i64) -> Result<usize> {
        Self::delete_from_on(&*self.lock()?, "sentiment_snapshot", job_id)
    }

    fn insert_keyword_gap(&self, job_id: i64, gap: &KeywordGap) -> Result<i64> {
        Self::insert_keyword_gap_on(&*self.lock()?, job_id, gap)
    }

    fn list_keyword_gaps_for_job(&self, job_id: i64) -> Result<Vec<JobRecord<KeywordGap>>> {
        Self::query_records(&*self.lock()?, "keyword_gap", job_id, Self::row_to_keyword_gap)
    }

    fn delete_keyword_gaps_for_job(&self, job_id: i64) -> Result<usize> {
        Self::delete_from_on(&*self.lock()?, "keyword_gap", job_id)
    }

    fn insert_position(&self, job_id: i64, position: &CompetitivePosition) -> Result<i64> {
        Self::insert_position_on(&*self.lock()?, job_id, position)
    }

    fn list_positions_for_job(&self, job_id: i64) -> Result<Vec<JobRecord<CompetitivePosition>>> {
        Self::query_records(
            &*self.lock()?,
            "competitive_position",
            job_id,
            Self::row_to_position,
        )
    }

    fn delete_positions_for_job(&self, job_id: i64) -> Result<usize> {
        Self::delete_from_on(&*self.lock()?, "competitive_position", job_id)
    }

    fn delete_results_for_job(&self, job_id: i64) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let deleted = Self::delete_all_results_on(&tx, job_id)?;
        tx.commit()?;
        Ok(deleted)
    }
}

impl InsightsStore for SqliteInsightsStore {
    fn commit_completed_pass(&self, completed: &ScanJob, report: &AnalysisReport) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        Self::delete_all_results_on(&tx, completed.id)?;
        for mention in &report.mentions {
            Self::insert_mention_on(&tx, completed.id, mention)?;
        }
        for snapshot in &report.sentiments {
            Self::insert_sentiment_on(&tx, completed.id, snapshot)?;
        }
        for gap in &report.keywords {
            Self::insert_keyword_gap_on(&tx, completed.id, gap)?;
        }
        for position in &report.positions {
            Self::insert_position_on(&tx, completed.id, position)?;
        }

        let updated = tx.execute(
            r#"UPDATE insight_scan_job
               SET status = ?2, overall_score = ?3, error_message = NULL, updated_at = ?4
               WHERE id = ?1 AND status = ?5"#,
            params![
                completed.id,
                completed.status.as_i32(),
                completed.overall_score,
                Self::format_datetime(&completed.updated_at),
                ScanStatus::Running.as_i32(),
            ],
        )?;
        if updated == 0 {
            // dropping the transaction rolls back the result inserts
            bail!("Scan job {} is no longer running", completed.id);
        }

        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_report() -> AnalysisReport {
        AnalysisReport {
            overall_score: 90,
            mentions: vec![BrandMention {
                source_name: "Reddit".to_string(),
                url: "https://example.com/mention/1".to_string(),
                snippet: "hello".to_string(),
                sentiment: MentionSentiment::Positive,
                mention_date: Utc::now().trunc_subsecs(3),
            }],
            sentiments: vec![SentimentSnapshot {
                platform: "Twitter".to_string(),
                positive_ratio: 60,
                neutral_ratio: 30,
                negative_ratio: 10,
            }],
            keywords: vec![KeywordGap {
                keyword: "packing list".to_string(),
                competitor_volume: 10,
                our_volume: 20,
                difficulty: 30,
            }],
            positions: vec![CompetitivePosition {
                competitor_name: "Rival".to_string(),
                market_share: 12.5,
                growth_rate: 1.5,
            }],
        }
    }

    fn claim(store: &SqliteInsightsStore, job: &ScanJob) -> ScanJob {
        let running = job.claimed(Utc::now());
        assert!(store.claim_job(&running).unwrap());
        running
    }

    #[test]
    fn test_create_new_database_and_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("insights.db");

        let job_id = {
            let store = SqliteInsightsStore::new(&db_path).unwrap();
            store.insert_job(1, "https://example.com", Utc::now()).unwrap().id
        };
        assert!(db_path.exists());

        let store = SqliteInsightsStore::new(&db_path).unwrap();
        let job = store.get_job(job_id).unwrap().unwrap();
        assert_eq!(job.target_url, "https://example.com");
    }

    #[test]
    fn test_reopen_rejects_foreign_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("insights.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute("CREATE TABLE unrelated (id INTEGER)", []).unwrap();
        }

        assert!(SqliteInsightsStore::new(&db_path).is_err());
    }

    #[test]
    fn test_insert_assigns_ids_and_pending_status() {
        let store = SqliteInsightsStore::in_memory().unwrap();

        let first = store.insert_job(1, "https://a.com", Utc::now()).unwrap();
        let second = store.insert_job(1, "https://b.com", Utc::now()).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.status, ScanStatus::Pending);
        assert_eq!(store.get_job(first.id).unwrap().unwrap(), first);
    }

    #[test]
    fn test_get_unknown_job() {
        let store = SqliteInsightsStore::in_memory().unwrap();
        assert!(store.get_job(404).unwrap().is_none());
    }

    #[test]
    fn test_list_jobs_by_user_most_recent_first() {
        let store = SqliteInsightsStore::in_memory().unwrap();
        let base = Utc::now();

        let older = store.insert_job(1, "https://old.com", base).unwrap();
        let newer = store
            .insert_job(1, "https://new.com", base + chrono::Duration::seconds(5))
            .unwrap();
        store.insert_job(2, "https://other.com", base).unwrap();

        let jobs = store.list_jobs_by_user(1).unwrap();
        assert_eq!(
            jobs.iter().map(|j| j.id).collect::<Vec<_>>(),
            vec![newer.id, older.id]
        );
        assert!(store.list_jobs_by_user(99).unwrap().is_empty());
    }

    #[test]
    fn test_list_pending_jobs_filters_status() {
        let store = SqliteInsightsStore::in_memory().unwrap();
        let pending = store.insert_job(1, "https://a.com", Utc::now()).unwrap();
        let done = store.insert_job(1, "https://b.com", Utc::now()).unwrap();
        store.update_job(&done.completed(70, Utc::now())).unwrap();

        let jobs = store.list_pending_jobs().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, pending.id);
    }

    #[test]
    fn test_update_unknown_job_fails() {
        let store = SqliteInsightsStore::in_memory().unwrap();
        let job = store.insert_job(1, "https://a.com", Utc::now()).unwrap();
        let ghost = ScanJob { id: job.id + 100, ..job };
        assert!(store.update_job(&ghost).is_err());
    }

    #[test]
    fn test_claim_only_succeeds_once() {
        let store = SqliteInsightsStore::in_memory().unwrap();
        let job = store.insert_job(1, "https://a.com", Utc::now()).unwrap();

        let running = job.claimed(Utc::now());
        assert!(store.claim_job(&running).unwrap());
        assert!(!store.claim_job(&running).unwrap());

        let stored = store.get_job(job.id).unwrap().unwrap();
        assert_eq!(stored.status, ScanStatus::Running);
        assert_eq!(stored.attempts, 1);
    }

    #[test]
    fn test_fail_job_only_applies_to_running_jobs() {
        let store = SqliteInsightsStore::in_memory().unwrap();
        let job = store.insert_job(1, "https://a.com", Utc::now()).unwrap();

        // still pending
        assert!(!store.fail_job(&job.failed("boom", Utc::now())).unwrap());

        let running = claim(&store, &job);
        assert!(store.fail_job(&running.failed("boom", Utc::now())).unwrap());

        let stored = store.get_job(job.id).unwrap().unwrap();
        assert_eq!(stored.status, ScanStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_fail_job_leaves_completed_job_intact() {
        let store = SqliteInsightsStore::in_memory().unwrap();
        let job = store.insert_job(1, "https://a.com", Utc::now()).unwrap();
        let running = claim(&store, &job);
        store
            .commit_completed_pass(&running.completed(90, Utc::now()), &sample_report())
            .unwrap();

        assert!(!store.fail_job(&running.failed("late", Utc::now())).unwrap());

        let stored = store.get_job(job.id).unwrap().unwrap();
        assert_eq!(stored.status, ScanStatus::Completed);
        assert_eq!(stored.overall_score, Some(90));
        assert!(stored.error_message.is_none());
        assert_eq!(store.list_mentions_for_job(job.id).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_stored_sentiment_is_reported() {
        let store = SqliteInsightsStore::in_memory().unwrap();
        let job = store.insert_job(1, "https://a.com", Utc::now()).unwrap();
        store
            .insert_mention(job.id, &sample_report().mentions[0])
            .unwrap();
        store
            .lock()
            .unwrap()
            .execute("UPDATE brand_mention SET sentiment = 'angry'", [])
            .unwrap();

        assert!(store.list_mentions_for_job(job.id).is_err());
    }

    #[test]
    fn test_result_writers_insert_list_delete() {
        let store = SqliteInsightsStore::in_memory().unwrap();
        let job = store.insert_job(1, "https://a.com", Utc::now()).unwrap();
        let report = sample_report();

        store.insert_mention(job.id, &report.mentions[0]).unwrap();
        store.insert_sentiment(job.id, &report.sentiments[0]).unwrap();
        store.insert_keyword_gap(job.id, &report.keywords[0]).unwrap();
        store.insert_position(job.id, &report.positions[0]).unwrap();

        let mentions = store.list_mentions_for_job(job.id).unwrap();
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].job_id, job.id);
        assert_eq!(mentions[0].record, report.mentions[0]);
        assert_eq!(store.list_positions_for_job(job.id).unwrap()[0].record.market_share, 12.5);

        assert_eq!(store.delete_keyword_gaps_for_job(job.id).unwrap(), 1);
        assert!(store.list_keyword_gaps_for_job(job.id).unwrap().is_empty());
        assert_eq!(store.delete_results_for_job(job.id).unwrap(), 3);
        assert!(store.list_sentiments_for_job(job.id).unwrap().is_empty());
    }

    #[test]
    fn test_commit_completed_pass_writes_everything() {
        let store = SqliteInsightsStore::in_memory().unwrap();
        let job = store.insert_job(1, "https://a.com", Utc::now()).unwrap();
        let running = claim(&store, &job);

        store
            .commit_completed_pass(&running.completed(90, Utc::now()), &sample_report())
            .unwrap();

        let stored = store.get_job(job.id).unwrap().unwrap();
        assert_eq!(stored.status, ScanStatus::Completed);
        assert_eq!(stored.overall_score, Some(90));
        assert_eq!(store.list_mentions_for_job(job.id).unwrap().len(), 1);
        assert_eq!(store.list_sentiments_for_job(job.id).unwrap().len(), 1);
        assert_eq!(store.list_keyword_gaps_for_job(job.id).unwrap().len(), 1);
        assert_eq!(store.list_positions_for_job(job.id).unwrap().len(), 1);
    }

    #[test]
    fn test_commit_replaces_records_of_earlier_pass() {
        let store = SqliteInsightsStore::in_memory().unwrap();
        let job = store.insert_job(1, "https://a.com", Utc::now()).unwrap();
        store.insert_mention(job.id, &sample_report().mentions[0]).unwrap();
        let running = claim(&store, &job);

        store
            .commit_completed_pass(&running.completed(90, Utc::now()), &sample_report())
            .unwrap();

        assert_eq!(store.list_mentions_for_job(job.id).unwrap().len(), 1);
    }

    #[test]
    fn test_commit_refused_when_job_not_running() {
        let store = SqliteInsightsStore::in_memory().unwrap();
        let job = store.insert_job(1, "https://a.com", Utc::now()).unwrap();
        let running = claim(&store, &job);
        store.update_job(&running.failed("external", Utc::now())).unwrap();

        let result =
            store.commit_completed_pass(&running.completed(90, Utc::now()), &sample_report());
        assert!(result.is_err());

        // rolled back: no records, status untouched
        assert!(store.list_mentions_for_job(job.id).unwrap().is_empty());
        assert!(store.list_positions_for_job(job.id).unwrap().is_empty());
        assert_eq!(
            store.get_job(job.id).unwrap().unwrap().status,
            ScanStatus::Failed
        );
    }

    #[test]
    fn test_requeue_failed_jobs_respects_max_attempts() {
        let store = SqliteInsightsStore::in_memory().unwrap();
        let retryable = store.insert_job(1, "https://a.com", Utc::now()).unwrap();
        let exhausted = store.insert_job(1, "https://b.com", Utc::now()).unwrap();

        let running = claim(&store, &retryable);
        store.update_job(&running.failed("x", Utc::now())).unwrap();

        let mut spent = exhausted.clone();
        for _ in 0..3 {
            spent = spent.claimed(Utc::now());
        }
        store.update_job(&spent.failed("y", Utc::now())).unwrap();

        assert_eq!(store.requeue_failed_jobs(3, Utc::now()).unwrap(), 1);
        assert_eq!(
            store.get_job(retryable.id).unwrap().unwrap().status,
            ScanStatus::Pending
        );
        assert_eq!(
            store.get_job(exhausted.id).unwrap().unwrap().status,
            ScanStatus::Failed
        );
    }
}
