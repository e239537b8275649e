use std::collections::{BTreeMap, BTreeSet};

use substation_client::domain::{
    DistinctField, MeasurementRecord, NewMeasurementRecord, RecordFilter,
};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::RecordStore;
use crate::error::ServiceError;

/// In-process record store with the same ordering guarantees as the
/// Postgres one. Used by tests and local runs without a database.
#[derive(Default)]
pub struct MemoryRecordStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    records: BTreeMap<i64, MeasurementRecord>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, record: NewMeasurementRecord) -> Result<i64, ServiceError> {
        let ts = record.timestamp.unwrap_or_else(OffsetDateTime::now_utc);
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.insert(id, record.into_record(id, ts));
        Ok(id)
    }

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<MeasurementRecord>, ServiceError> {
        let inner = self.inner.read().await;
        let mut out: Vec<_> = inner
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        out.sort_by_key(|r| (r.timestamp, r.id));
        Ok(out)
    }

    async fn distinct(&self, field: DistinctField) -> Result<Vec<String>, ServiceError> {
        let inner = self.inner.read().await;
        let values: BTreeSet<&str> = inner.records.values().map(|r| field.value_of(r)).collect();
        Ok(values.into_iter().map(str::to_string).collect())
    }

    async fn fetch_by_ids(&self, ids: &[i64]) -> Result<Vec<MeasurementRecord>, ServiceError> {
        let wanted: BTreeSet<i64> = ids.iter().copied().collect();
        let inner = self.inner.read().await;
        Ok(wanted
            .into_iter()
            .filter_map(|id| inner.records.get(&id).cloned())
            .collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<MeasurementRecord>, ServiceError> {
        let inner = self.inner.read().await;
        let mut out: Vec<_> = inner.records.values().cloned().collect();
        out.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        out.truncate(limit);
        Ok(out)
    }

    async fn delete(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(self.inner.write().await.records.remove(&id).is_some())
    }
}
