use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::{cleanup_candidates, PersistenceError, ResumeStore};
use crate::models::document::{Document, TemplateKind};
use crate::models::record::{display_name, RecordStatus, ResumeRecord};

/// Process-local store used when no database is configured.
///
/// `set_failing(true)` makes every operation fail, which is how the session's
/// degraded paths are exercised.
#[derive(Debug, Default)]
pub struct MemoryResumeStore {
    records: Mutex<Vec<ResumeRecord>>,
    failing: AtomicBool,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Inserts a record as-is, keeping its id and timestamp.
    pub fn insert(&self, record: ResumeRecord) {
        self.lock().push(record);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ResumeRecord>> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Unavailable(
                "memory store set to fail".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn create(
        &self,
        document: &Document,
        template: TemplateKind,
        status: RecordStatus,
    ) -> Result<ResumeRecord, PersistenceError> {
        self.check()?;
        let record = ResumeRecord::new(document.clone(), template, status);
        self.lock().push(record.clone());
        info!("Saved resume {} ({template}, {status})", record.id);
        Ok(record)
    }

    async fn update(
        &self,
        id: Uuid,
        document: &Document,
        template: TemplateKind,
        status: RecordStatus,
    ) -> Result<(), PersistenceError> {
        self.check()?;
        let mut records = self.lock();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(PersistenceError::NotFound(id))?;
        record.full_name = display_name(document);
        record.email = document.personal_info.email.clone();
        record.template = template;
        record.status = status;
        record.data = document.clone();
        info!("Updated resume {id}");
        Ok(())
    }

    async fn list_all(&self) -> Vec<ResumeRecord> {
        if let Err(e) = self.check() {
            warn!("Listing resumes failed, showing none: {e}");
            return vec![];
        }
        let mut records = self.lock().clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    async fn delete_one(&self, id: Uuid) -> Result<(), PersistenceError> {
        self.check()?;
        self.lock().retain(|r| r.id != id);
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), PersistenceError> {
        self.check()?;
        self.lock().clear();
        Ok(())
    }

    async fn auto_cleanup(&self, retention_limit: usize) -> Result<usize, PersistenceError> {
        self.check()?;
        let mut records = self.lock();
        let stamps: Vec<(Uuid, DateTime<Utc>)> =
            records.iter().map(|r| (r.id, r.created_at)).collect();
        let doomed = cleanup_candidates(&stamps, retention_limit);
        if !doomed.is_empty() {
            info!(
                "Auto-cleanup triggered: deleting {} records to keep the single newest one",
                doomed.len()
            );
        }
        records.retain(|r| !doomed.contains(&r.id));
        Ok(doomed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn seeded(n: usize) -> (MemoryResumeStore, Uuid) {
        let store = MemoryResumeStore::new();
        let base = Utc::now() - Duration::days(1);
        let mut newest = Uuid::nil();
        for i in 0..n {
            let mut record =
                ResumeRecord::new(Document::default(), TemplateKind::Tech, RecordStatus::Draft);
            record.created_at = base + Duration::minutes(i as i64);
            newest = record.id;
            store.insert(record);
        }
        (store, newest)
    }

    #[tokio::test]
    async fn test_auto_cleanup_at_threshold() {
        let (store, newest) = seeded(50);
        assert_eq!(store.auto_cleanup(50).await.unwrap(), 49);
        let left = store.list_all().await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, newest);
    }

    #[tokio::test]
    async fn test_auto_cleanup_below_threshold() {
        let (store, _) = seeded(49);
        assert_eq!(store.auto_cleanup(50).await.unwrap(), 0);
        assert_eq!(store.len(), 49);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (store, newest) = seeded(3);
        let list = store.list_all().await;
        assert_eq!(list[0].id, newest);
        assert!(list[0].created_at > list[2].created_at);
    }

    #[tokio::test]
    async fn test_update_missing_record_is_an_error() {
        let store = MemoryResumeStore::new();
        let err = store
            .update(
                Uuid::new_v4(),
                &Document::default(),
                TemplateKind::Bold,
                RecordStatus::Completed,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_refreshes_denormalized_columns() {
        let store = MemoryResumeStore::new();
        let created = store
            .create(&Document::default(), TemplateKind::Modern, RecordStatus::Draft)
            .await
            .unwrap();
        let mut doc = Document::default();
        doc.personal_info.first_name = "Grace".to_string();
        doc.personal_info.last_name = "Hopper".to_string();
        store
            .update(created.id, &doc, TemplateKind::Classic, RecordStatus::Completed)
            .await
            .unwrap();
        let list = store.list_all().await;
        assert_eq!(list[0].full_name, "Grace Hopper");
        assert_eq!(list[0].template, TemplateKind::Classic);
        assert_eq!(list[0].status, RecordStatus::Completed);
    }

    #[tokio::test]
    async fn test_failing_store_degrades_reads_and_fails_writes() {
        let (store, _) = seeded(2);
        store.set_failing(true);
        assert!(store.list_all().await.is_empty());
        assert!(store.delete_all().await.is_err());
        assert!(store
            .create(&Document::default(), TemplateKind::Tech, RecordStatus::Draft)
            .await
            .is_err());
        store.set_failing(false);
        assert_eq!(store.list_all().await.len(), 2);
    }
}
