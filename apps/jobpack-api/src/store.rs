//! SQLite persistence
//!
//! Drafts are stored one row per `(job_id, doc_type)` as JSON, with the
//! version and lifecycle status in their own columns. The `version` column
//! is authoritative; every version check happens inside the write
//! statement itself. Exports go to their own append-only table. Jobs and
//! business profiles are owned by other services and only read here.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use document_engine::{DraftStore, JobSource, StoreError};
use jobpack_types::{AuditEvent, BusinessProfile, DocType, DocumentDraft, JobRecord};
use serde::Deserialize;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

/// Default database location under the platform data directory
pub fn default_database_url() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jobpack-api");
    std::fs::create_dir_all(&data_dir).ok();
    format!("sqlite:{}/jobpack.db?mode=rwc", data_dir.display())
}

/// Jobs, profiles and drafts in one SQLite database
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to database: {}", database_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                data_json TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS business_profiles (
                user_id TEXT PRIMARY KEY,
                data_json TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS document_drafts (
                job_id TEXT NOT NULL,
                doc_type TEXT NOT NULL,
                user_id TEXT NOT NULL,
                version INTEGER NOT NULL,
                status TEXT NOT NULL,
                approved INTEGER NOT NULL DEFAULT 0,
                issued_record_id TEXT,
                data_json TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (job_id, doc_type)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS document_exports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL,
                doc_type TEXT NOT NULL,
                event_json TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_exports_draft ON document_exports(job_id, doc_type)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_user ON jobs(user_id)")
            .execute(&self.pool)
            .await?;

        info!("Migrations complete");
        Ok(())
    }

    /// Insert or replace a job record
    pub async fn put_job(&self, job: &JobRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, user_id, data_json, updated_at)
            VALUES (?, ?, ?, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                user_id = excluded.user_id,
                data_json = excluded.data_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&job.id)
        .bind(&job.user_id)
        .bind(serde_json::to_string(job)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace a business profile
    pub async fn put_profile(&self, profile: &BusinessProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO business_profiles (user_id, data_json, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(user_id) DO UPDATE SET
                data_json = excluded.data_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&profile.user_id)
        .bind(serde_json::to_string(profile)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Development seed data: `{"jobs": [...], "profiles": [...]}`
#[derive(Debug, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub jobs: Vec<JobRecord>,
    #[serde(default)]
    pub profiles: Vec<BusinessProfile>,
}

impl SqliteStore {
    /// Load jobs and profiles from a JSON seed file
    pub async fn seed_from_file(&self, path: &Path) -> Result<usize> {
        let seed: SeedData = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        for job in &seed.jobs {
            self.put_job(job).await?;
        }
        for profile in &seed.profiles {
            self.put_profile(profile).await?;
        }
        let count = seed.jobs.len() + seed.profiles.len();
        info!("Seeded {} records from {}", count, path.display());
        Ok(count)
    }
}

#[async_trait]
impl JobSource for SqliteStore {
    async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data_json FROM jobs WHERE id = ?")
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(|(json,)| serde_json::from_str(&json).map_err(backend))
            .transpose()
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<BusinessProfile>, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data_json FROM business_profiles WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        row.map(|(json,)| serde_json::from_str(&json).map_err(backend))
            .transpose()
    }
}

impl SqliteStore {
    async fn stored_version(&self, job_id: &str, doc_type: DocType) -> Result<u64, StoreError> {
        let version: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM document_drafts WHERE job_id = ? AND doc_type = ?",
        )
        .bind(job_id)
        .bind(doc_type.code())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(version.unwrap_or(0) as u64)
    }

    /// Insert the first version; `None` when a row already exists
    async fn insert_draft(&self, draft: &DocumentDraft, json: &str) -> Result<Option<u64>, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO document_drafts
                (job_id, doc_type, user_id, version, status, approved, issued_record_id, data_json, updated_at)
            VALUES (?, ?, ?, 1, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id, doc_type) DO NOTHING
            "#,
        )
        .bind(&draft.job_id)
        .bind(draft.doc_type.code())
        .bind(&draft.user_id)
        .bind(draft.status.code())
        .bind(draft.approved)
        .bind(&draft.issued_record_id)
        .bind(json)
        .bind(draft.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok((result.rows_affected() == 1).then_some(1))
    }

    /// Overwrite the row at exactly `expected`; `None` when it has moved on
    async fn update_draft(
        &self,
        draft: &DocumentDraft,
        json: &str,
        expected: u64,
    ) -> Result<Option<u64>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE document_drafts SET
                user_id = ?,
                version = version + 1,
                status = ?,
                approved = ?,
                issued_record_id = ?,
                data_json = ?,
                updated_at = ?
            WHERE job_id = ? AND doc_type = ? AND version = ?
            "#,
        )
        .bind(&draft.user_id)
        .bind(draft.status.code())
        .bind(draft.approved)
        .bind(&draft.issued_record_id)
        .bind(json)
        .bind(draft.updated_at.to_rfc3339())
        .bind(&draft.job_id)
        .bind(draft.doc_type.code())
        .bind(expected as i64)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok((result.rows_affected() == 1).then_some(expected + 1))
    }

    /// Upsert without a version check
    async fn upsert_draft(&self, draft: &DocumentDraft, json: &str) -> Result<u64, StoreError> {
        let version: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO document_drafts
                (job_id, doc_type, user_id, version, status, approved, issued_record_id, data_json, updated_at)
            VALUES (?, ?, ?, 1, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id, doc_type) DO UPDATE SET
                user_id = excluded.user_id,
                version = document_drafts.version + 1,
                status = excluded.status,
                approved = excluded.approved,
                issued_record_id = excluded.issued_record_id,
                data_json = excluded.data_json,
                updated_at = excluded.updated_at
            RETURNING version
            "#,
        )
        .bind(&draft.job_id)
        .bind(draft.doc_type.code())
        .bind(&draft.user_id)
        .bind(draft.status.code())
        .bind(draft.approved)
        .bind(&draft.issued_record_id)
        .bind(json)
        .bind(draft.updated_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(version as u64)
    }
}

#[async_trait]
impl DraftStore for SqliteStore {
    async fn get(&self, job_id: &str, doc_type: DocType) -> Result<Option<DocumentDraft>, StoreError> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT data_json, version FROM document_drafts WHERE job_id = ? AND doc_type = ?",
        )
        .bind(job_id)
        .bind(doc_type.code())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some((json, version)) = row else {
            return Ok(None);
        };
        let mut draft: DocumentDraft = serde_json::from_str(&json).map_err(backend)?;
        draft.version = version as u64;

        let events: Vec<String> = sqlx::query_scalar(
            "SELECT event_json FROM document_exports WHERE job_id = ? AND doc_type = ? ORDER BY id",
        )
        .bind(job_id)
        .bind(doc_type.code())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        draft.exports = events
            .iter()
            .map(|json| serde_json::from_str(json).map_err(backend))
            .collect::<Result<_, _>>()?;

        Ok(Some(draft))
    }

    async fn save(
        &self,
        draft: &DocumentDraft,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        let mut stored = draft.clone();
        stored.exports.clear();
        let json = serde_json::to_string(&stored).map_err(backend)?;

        // each write is a single statement, so the check and the write
        // cannot interleave with another writer
        let written = match expected_version {
            None => Some(self.upsert_draft(&stored, &json).await?),
            Some(0) => self.insert_draft(&stored, &json).await?,
            Some(expected) => self.update_draft(&stored, &json, expected).await?,
        };

        let Some(version) = written else {
            let expected = expected_version.unwrap_or_default();
            let actual = self.stored_version(&stored.job_id, stored.doc_type).await?;
            debug!(
                job_id = %stored.job_id,
                doc_type = %stored.doc_type,
                expected,
                actual,
                "Draft write lost a version race"
            );
            return Err(StoreError::Conflict { expected, actual });
        };

        debug!(
            job_id = %stored.job_id,
            doc_type = %stored.doc_type,
            version,
            "Draft stored"
        );
        Ok(version)
    }

    async fn append_export(
        &self,
        job_id: &str,
        doc_type: DocType,
        event: &AuditEvent,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO document_exports (job_id, doc_type, event_json) VALUES (?, ?, ?)")
            .bind(job_id)
            .bind(doc_type.code())
            .bind(serde_json::to_string(event).map_err(backend)?)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobpack_types::RenderModel;

    async fn temp_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}/test.db?mode=rwc", dir.path().display());
        (SqliteStore::connect(&url).await.unwrap(), dir)
    }

    fn draft() -> DocumentDraft {
        let model = RenderModel {
            title: "Toolbox Talk".to_string(),
            record_id: "rec-1".to_string(),
            timestamp: chrono::Utc::now(),
            doc_type: DocType::ToolboxTalk,
            disclaimer: "DRAFT".to_string(),
            sections: vec![],
            ovis_warnings: vec![],
        };
        DocumentDraft::new("job-1", "user-1", model)
    }

    #[tokio::test]
    async fn test_draft_versions_and_conflicts() {
        let (store, _dir) = temp_store().await;
        let draft = draft();

        assert_eq!(store.save(&draft, None).await.unwrap(), 1);
        assert_eq!(store.save(&draft, Some(1)).await.unwrap(), 2);
        assert_eq!(
            store.save(&draft, Some(1)).await,
            Err(StoreError::Conflict {
                expected: 1,
                actual: 2
            })
        );

        let loaded = store.get("job-1", DocType::ToolboxTalk).await.unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.data.record_id, "rec-1");
        assert!(store.get("job-1", DocType::Swms).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_racing_writers_get_a_conflict() {
        let (store, _dir) = temp_store().await;
        let draft = draft();
        store.save(&draft, None).await.unwrap();

        let (a, b) = tokio::join!(store.save(&draft, Some(1)), store.save(&draft, Some(1)));
        let mut results = vec![a, b];
        results.sort_by_key(|r| r.is_err());
        assert_eq!(results[0], Ok(2));
        assert_eq!(
            results[1],
            Err(StoreError::Conflict {
                expected: 1,
                actual: 2
            })
        );

        // a first write that expects no row loses to an existing one
        assert_eq!(
            store.save(&draft, Some(0)).await,
            Err(StoreError::Conflict {
                expected: 0,
                actual: 2
            })
        );
    }

    #[tokio::test]
    async fn test_exports_keep_the_version() {
        let (store, _dir) = temp_store().await;
        store.save(&draft(), None).await.unwrap();

        let event = AuditEvent::unchained(
            jobpack_types::AuditAction::Exported {
                format: "docx".to_string(),
                audience: "CLIENT".to_string(),
            },
            "user-1",
            "rec-1",
        );
        store
            .append_export("job-1", DocType::ToolboxTalk, &event)
            .await
            .unwrap();
        assert_eq!(store.save(&draft(), Some(1)).await.unwrap(), 2);

        let loaded = store.get("job-1", DocType::ToolboxTalk).await.unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.exports, vec![event]);
    }

    #[tokio::test]
    async fn test_jobs_and_profiles() {
        let (store, _dir) = temp_store().await;
        let job: JobRecord = serde_json::from_value(serde_json::json!({
            "id": "job-1",
            "userId": "user-1",
            "title": "Repaint"
        }))
        .unwrap();
        store.put_job(&job).await.unwrap();
        store
            .put_profile(&BusinessProfile {
                user_id: "user-1".to_string(),
                business_name: Some("Brush & Roll".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(store.get_job("job-1").await.unwrap(), Some(job));
        assert!(store.get_job("job-2").await.unwrap().is_none());
        let profile = store.get_profile("user-1").await.unwrap().unwrap();
        assert_eq!(profile.business_name.as_deref(), Some("Brush & Roll"));
    }

    #[tokio::test]
    async fn test_seed_from_file() {
        let (store, dir) = temp_store().await;
        let path = dir.path().join("seed.json");
        std::fs::write(
            &path,
            r#"{"jobs": [{"id": "job-9", "userId": "user-9", "title": "Rewire"}],
                "profiles": [{"userId": "user-9"}]}"#,
        )
        .unwrap();

        assert_eq!(store.seed_from_file(&path).await.unwrap(), 2);
        assert_eq!(store.get_job("job-9").await.unwrap().unwrap().title, "Rewire");
    }
}
