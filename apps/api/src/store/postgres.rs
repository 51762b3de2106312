use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::{cleanup_candidates, PersistenceError, ResumeStore};
use crate::models::document::{Document, TemplateKind};
use crate::models::record::{display_name, RecordStatus, ResumeRecord, ResumeRow};

/// `resumes` table backed by PostgreSQL.
#[derive(Clone)]
pub struct PgResumeStore {
    pool: PgPool,
}

impl PgResumeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `resumes` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resumes (
                id          UUID PRIMARY KEY,
                created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
                full_name   TEXT NOT NULL,
                email       TEXT NOT NULL,
                template    TEXT NOT NULL,
                status      TEXT NOT NULL,
                data        JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<ResumeRow>, PersistenceError> {
        Ok(sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }
}

fn to_json(document: &Document) -> Result<serde_json::Value, PersistenceError> {
    serde_json::to_value(document).map_err(|e| PersistenceError::Decode(e.to_string()))
}

#[async_trait]
impl ResumeStore for PgResumeStore {
    async fn create(
        &self,
        document: &Document,
        template: TemplateKind,
        status: RecordStatus,
    ) -> Result<ResumeRecord, PersistenceError> {
        let row = sqlx::query_as::<_, ResumeRow>(
            r#"
            INSERT INTO resumes (id, full_name, email, template, status, data)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(display_name(document))
        .bind(&document.personal_info.email)
        .bind(template.as_str())
        .bind(status.as_str())
        .bind(to_json(document)?)
        .fetch_one(&self.pool)
        .await?;

        info!("Saved resume {} ({template}, {status})", row.id);
        ResumeRecord::try_from(row).map_err(PersistenceError::Decode)
    }

    async fn update(
        &self,
        id: Uuid,
        document: &Document,
        template: TemplateKind,
        status: RecordStatus,
    ) -> Result<(), PersistenceError> {
        let result = sqlx::query(
            r#"
            UPDATE resumes
            SET full_name = $2, email = $3, template = $4, status = $5, data = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(display_name(document))
        .bind(&document.personal_info.email)
        .bind(template.as_str())
        .bind(status.as_str())
        .bind(to_json(document)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::NotFound(id));
        }
        info!("Updated resume {id}");
        Ok(())
    }

    async fn list_all(&self) -> Vec<ResumeRecord> {
        let rows = match self.fetch_all().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Listing resumes failed, showing none: {e}");
                return vec![];
            }
        };
        rows.into_iter()
            .filter_map(|row| match ResumeRecord::try_from(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping resume row: {e}");
                    None
                }
            })
            .collect()
    }

    async fn delete_one(&self, id: Uuid) -> Result<(), PersistenceError> {
        sqlx::query("DELETE FROM resumes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), PersistenceError> {
        let result = sqlx::query("DELETE FROM resumes").execute(&self.pool).await?;
        info!("Deleted all {} resumes", result.rows_affected());
        Ok(())
    }

    async fn auto_cleanup(&self, retention_limit: usize) -> Result<usize, PersistenceError> {
        let stamps: Vec<(Uuid, DateTime<Utc>)> =
            sqlx::query_as("SELECT id, created_at FROM resumes ORDER BY created_at ASC")
                .fetch_all(&self.pool)
                .await?;

        let doomed = cleanup_candidates(&stamps, retention_limit);
        if doomed.is_empty() {
            return Ok(0);
        }

        info!(
            "Auto-cleanup triggered: deleting {} records to keep the single newest one",
            doomed.len()
        );
        let result = sqlx::query("DELETE FROM resumes WHERE id = ANY($1)")
            .bind(&doomed)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }
}
