//! Resume persistence — the single source of truth for stored records.
//!
//! `AppState` carries an `Arc<dyn ResumeStore>`: `PgResumeStore` when a database is
//! configured, `MemoryResumeStore` otherwise (and in tests).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::document::{Document, TemplateKind};
use crate::models::record::{RecordStatus, ResumeRecord};

pub mod memory;
pub mod postgres;

pub use memory::MemoryResumeStore;
pub use postgres::PgResumeStore;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("resume {0} not found")]
    NotFound(Uuid),

    #[error("stored resume is unreadable: {0}")]
    Decode(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ResumeStore: Send + Sync {
    async fn create(
        &self,
        document: &Document,
        template: TemplateKind,
        status: RecordStatus,
    ) -> Result<ResumeRecord, PersistenceError>;

    async fn update(
        &self,
        id: Uuid,
        document: &Document,
        template: TemplateKind,
        status: RecordStatus,
    ) -> Result<(), PersistenceError>;

    /// Newest first. The read path degrades: failures yield an empty list and a warning.
    async fn list_all(&self) -> Vec<ResumeRecord>;

    async fn delete_one(&self, id: Uuid) -> Result<(), PersistenceError>;

    async fn delete_all(&self) -> Result<(), PersistenceError>;

    /// Once the record count reaches `retention_limit`, deletes everything except the
    /// single newest record. Returns how many records were deleted.
    async fn auto_cleanup(&self, retention_limit: usize) -> Result<usize, PersistenceError>;
}

/// Picks the records auto-cleanup deletes.
///
/// This is a collapse, not a ring buffer: at `count >= limit` everything but the
/// newest record goes; below the limit nothing does. Ties on `created_at` keep the
/// record listed last.
pub fn cleanup_candidates(records: &[(Uuid, DateTime<Utc>)], retention_limit: usize) -> Vec<Uuid> {
    if records.is_empty() || records.len() < retention_limit {
        return vec![];
    }
    let mut oldest_first = records.to_vec();
    oldest_first.sort_by_key(|(_, created_at)| *created_at);
    oldest_first.pop();
    oldest_first.into_iter().map(|(id, _)| id).collect()
}
