use sqlx::postgres::PgPool;
use substation_client::{
    db::measurement_queries,
    domain::{DistinctField, MeasurementRecord, NewMeasurementRecord, RecordFilter},
};
use time::OffsetDateTime;

use super::RecordStore;
use crate::error::ServiceError;

/// Record store backed by the Postgres schema in `substation-client/sql`.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("record store closed");
    }
}

#[async_trait::async_trait]
impl RecordStore for PgRecordStore {
    async fn insert(&self, record: NewMeasurementRecord) -> Result<i64, ServiceError> {
        let ts = record.timestamp.unwrap_or_else(OffsetDateTime::now_utc);
        measurement_queries::insert_record(&self.pool, &record, ts)
            .await
            .map_err(ServiceError::store)
    }

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<MeasurementRecord>, ServiceError> {
        measurement_queries::filtered_records(&self.pool, filter)
            .await
            .map_err(ServiceError::store)
    }

    async fn distinct(&self, field: DistinctField) -> Result<Vec<String>, ServiceError> {
        measurement_queries::distinct_values(&self.pool, field)
            .await
            .map_err(ServiceError::store)
    }

    async fn fetch_by_ids(&self, ids: &[i64]) -> Result<Vec<MeasurementRecord>, ServiceError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        measurement_queries::records_by_ids(&self.pool, ids)
            .await
            .map_err(ServiceError::store)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<MeasurementRecord>, ServiceError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        measurement_queries::recent_records(&self.pool, limit)
            .await
            .map_err(ServiceError::store)
    }

    async fn delete(&self, id: i64) -> Result<bool, ServiceError> {
        measurement_queries::delete_record(&self.pool, id)
            .await
            .map_err(ServiceError::store)
    }
}
