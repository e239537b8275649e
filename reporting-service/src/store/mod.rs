pub mod memory;
pub mod postgres;

pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;

use substation_client::domain::{
    DistinctField, MeasurementRecord, NewMeasurementRecord, RecordFilter,
};

use crate::error::ServiceError;

#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Store a record with all its children atomically and return its id.
    ///
    /// A record without a timestamp is stamped with the current UTC time.
    async fn insert(&self, record: NewMeasurementRecord) -> Result<i64, ServiceError>;

    /// Matching records ascending by timestamp, ties by id.
    async fn query(&self, filter: &RecordFilter) -> Result<Vec<MeasurementRecord>, ServiceError>;

    /// Sorted distinct values of `field` across all records.
    async fn distinct(&self, field: DistinctField) -> Result<Vec<String>, ServiceError>;

    /// Records with the given ids, ascending by id. Unknown ids are skipped.
    async fn fetch_by_ids(&self, ids: &[i64]) -> Result<Vec<MeasurementRecord>, ServiceError>;

    /// Newest records first.
    async fn recent(&self, limit: usize) -> Result<Vec<MeasurementRecord>, ServiceError>;

    /// Delete a record and its children. `false` if no such record.
    async fn delete(&self, id: i64) -> Result<bool, ServiceError>;
}
