use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use substation_client::domain::MeasurementRecord;

use crate::{
    assembler::{
        ExportOutcome, FilterOptions, ReportService, SummaryReport, ThresholdReport, TrendReport,
    },
    error::ServiceError,
    reports::FilterRequest,
    store::RecordStore,
};

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 500;

type Shared<S> = State<Arc<ReportService<S>>>;

pub fn router<S: RecordStore + 'static>(service: Arc<ReportService<S>>) -> Router {
    Router::new()
        .route("/measurements", post(submit_measurement::<S>).get(list_measurements::<S>))
        .route("/measurements/:id", delete(delete_measurement::<S>))
        .route("/reports/options", get(report_options::<S>))
        .route("/reports/summary", post(summary_report::<S>))
        .route("/reports/thresholds", post(threshold_report::<S>))
        .route("/reports/trends", post(trend_report::<S>))
        .route("/export", post(export_records::<S>))
        .with_state(service)
}

/// Flatten a JSON object into form fields. Scalars are stringified and
/// `null` counts as absent.
fn form_fields(body: HashMap<String, Value>) -> Result<HashMap<String, String>, ServiceError> {
    let mut fields = HashMap::with_capacity(body.len());
    for (name, value) in body {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(ServiceError::Validation(format!(
                    "field '{name}' must be a scalar value"
                )));
            }
        };
        fields.insert(name, text);
    }
    Ok(fields)
}

async fn submit_measurement<S: RecordStore>(
    State(svc): Shared<S>,
    Json(body): Json<HashMap<String, Value>>,
) -> Result<(StatusCode, Json<Value>), ServiceError> {
    let id = svc.submit(&form_fields(body)?).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

async fn list_measurements<S: RecordStore>(
    State(svc): Shared<S>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<MeasurementRecord>>, ServiceError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
    Ok(Json(svc.recent_records(limit).await?))
}

async fn delete_measurement<S: RecordStore>(
    State(svc): Shared<S>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_record(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn report_options<S: RecordStore>(
    State(svc): Shared<S>,
) -> Result<Json<FilterOptions>, ServiceError> {
    Ok(Json(svc.filter_options().await?))
}

async fn summary_report<S: RecordStore>(
    State(svc): Shared<S>,
    Json(req): Json<FilterRequest>,
) -> Result<Json<SummaryReport>, ServiceError> {
    Ok(Json(svc.summary_report(&req).await?))
}

async fn threshold_report<S: RecordStore>(
    State(svc): Shared<S>,
    Json(req): Json<FilterRequest>,
) -> Result<Json<ThresholdReport>, ServiceError> {
    Ok(Json(svc.threshold_report(&req).await?))
}

#[derive(Debug, Deserialize)]
struct TrendRequest {
    #[serde(flatten)]
    filters: FilterRequest,
    #[serde(default)]
    parameters: Vec<String>,
}

async fn trend_report<S: RecordStore>(
    State(svc): Shared<S>,
    Json(req): Json<TrendRequest>,
) -> Result<Response, ServiceError> {
    let response = match svc.trend_report(&req.filters, &req.parameters).await? {
        TrendReport::Chart(chart) => Json(chart).into_response(),
        TrendReport::NoData => Json(json!({ "no_data": true })).into_response(),
    };
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct ExportRequest {
    #[serde(default)]
    record_ids: Vec<i64>,
}

async fn export_records<S: RecordStore>(
    State(svc): Shared<S>,
    Json(req): Json<ExportRequest>,
) -> Result<(StatusCode, Json<ExportOutcome>), ServiceError> {
    let outcome = svc.export(&req.record_ids).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}
