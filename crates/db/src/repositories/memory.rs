use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;

use plusplus_core::points::{PointRecord, PointStore, StoreError};

/// Process-local store for tests and dry runs. The write lock makes each
/// upsert atomic per key.
#[derive(Default)]
pub struct InMemoryPointStore {
    records: RwLock<HashMap<String, PointRecord>>,
    closed: AtomicBool,
}

impl InMemoryPointStore {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PointStore for InMemoryPointStore {
    async fn add_points(&self, key: &str, delta: i64, is_user: bool) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut records = self.records.write().await;
        let now = Utc::now();
        records
            .entry(key.to_owned())
            .and_modify(|record| {
                record.points += delta;
                record.is_user = is_user;
                record.last_modified = now;
            })
            .or_insert_with(|| PointRecord {
                key: key.to_owned(),
                points: delta,
                is_user,
                last_modified: now,
            });
        Ok(())
    }

    async fn get_points(&self, key: &str) -> Result<i64, StoreError> {
        self.ensure_open()?;
        let records = self.records.read().await;
        Ok(records.get(key).map(|record| record.points).unwrap_or(0))
    }

    async fn find_record(&self, key: &str) -> Result<Option<PointRecord>, StoreError> {
        self.ensure_open()?;
        let records = self.records.read().await;
        Ok(records.get(key).cloned())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
