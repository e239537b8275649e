use std::{collections::HashMap, path::PathBuf, sync::Arc};

use serde::Serialize;
use substation_client::domain::{DistinctField, MeasurementRecord};
use time::OffsetDateTime;

use crate::{
    chart::{ChartPayload, ChartRenderer, DatasetRenderer},
    error::ServiceError,
    export::{build_workbook, TabularWriter},
    reports::{
        aggregate, evaluate_thresholds, extract_trend, query_records, summary, Alert, FilterRequest,
        GroupStats, MeasurementKind, SummaryStatistics, ThresholdRules, Trend, TrendParameter,
    },
    store::RecordStore,
    submission::parse_submission,
};

#[derive(Debug, Clone, Serialize)]
pub struct FilterOptions {
    pub substations: Vec<String>,
    pub bays: Vec<String>,
    pub trend_parameters: &'static [&'static str],
    pub thresholds: ThresholdRules,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub currents: Vec<GroupStats>,
    pub voltages: Vec<GroupStats>,
    pub sequence_components: Vec<GroupStats>,
    pub statistics: SummaryStatistics,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThresholdReport {
    pub alerts: Vec<Alert>,
    pub thresholds: ThresholdRules,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrendReport {
    Chart(ChartPayload),
    NoData,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportOutcome {
    pub workbook: String,
    pub location: PathBuf,
    pub records: usize,
}

pub struct ReportService<S> {
    store: S,
    thresholds: ThresholdRules,
    writer: Arc<dyn TabularWriter + Send + Sync>,
}

impl<S: RecordStore> ReportService<S> {
    pub fn new(
        store: S,
        thresholds: ThresholdRules,
        writer: Arc<dyn TabularWriter + Send + Sync>,
    ) -> Self {
        Self {
            store,
            thresholds,
            writer,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn thresholds(&self) -> &ThresholdRules {
        &self.thresholds
    }

    /// Validate a form submission and store it with all its children.
    pub async fn submit(&self, fields: &HashMap<String, String>) -> Result<i64, ServiceError> {
        let record = match parse_submission(fields) {
            Ok(r) => r,
            Err(e) => {
                metrics::counter!("measurement_submissions_rejected_total").increment(1);
                tracing::warn!(error = %e, "measurement submission rejected");
                return Err(e);
            }
        };

        let element = record.element.kind();
        let id = self.store.insert(record).await?;
        metrics::counter!("measurement_submissions_total", "element" => element.as_str())
            .increment(1);
        tracing::info!(id, element = %element, "measurement recorded");
        Ok(id)
    }

    pub async fn recent_records(
        &self,
        limit: usize,
    ) -> Result<Vec<MeasurementRecord>, ServiceError> {
        self.store.recent(limit).await
    }

    pub async fn delete_record(&self, id: i64) -> Result<(), ServiceError> {
        if self.store.delete(id).await? {
            tracing::info!(id, "measurement deleted");
            Ok(())
        } else {
            Err(ServiceError::NotFound(format!("record {id} not found")))
        }
    }

    pub async fn filter_options(&self) -> Result<FilterOptions, ServiceError> {
        Ok(FilterOptions {
            substations: self.store.distinct(DistinctField::Substation).await?,
            bays: self.store.distinct(DistinctField::Bay).await?,
            trend_parameters: &TrendParameter::VOCABULARY,
            thresholds: self.thresholds.clone(),
        })
    }

    pub async fn summary_report(&self, req: &FilterRequest) -> Result<SummaryReport, ServiceError> {
        metrics::counter!("report_requests_total", "report" => "summary").increment(1);
        let records = query_records(&self.store, req).await?;

        let report = SummaryReport {
            currents: aggregate(&records, MeasurementKind::Current),
            voltages: aggregate(&records, MeasurementKind::Voltage),
            sequence_components: aggregate(&records, MeasurementKind::Sequence),
            statistics: summary(&records),
        };
        tracing::info!(
            records = records.len(),
            groups = report.currents.len(),
            "summary report built"
        );
        Ok(report)
    }

    pub async fn threshold_report(
        &self,
        req: &FilterRequest,
    ) -> Result<ThresholdReport, ServiceError> {
        metrics::counter!("report_requests_total", "report" => "thresholds").increment(1);
        let records = query_records(&self.store, req).await?;

        let alerts = evaluate_thresholds(&records, &self.thresholds);
        metrics::counter!("threshold_alerts_total").increment(alerts.len() as u64);
        tracing::info!(records = records.len(), alerts = alerts.len(), "threshold report built");

        Ok(ThresholdReport {
            alerts,
            thresholds: self.thresholds.clone(),
        })
    }

    pub async fn trend_report(
        &self,
        req: &FilterRequest,
        parameters: &[String],
    ) -> Result<TrendReport, ServiceError> {
        metrics::counter!("report_requests_total", "report" => "trends").increment(1);
        let records = query_records(&self.store, req).await?;

        match extract_trend(&records, parameters) {
            Trend::Plot(series) => {
                let chart = DatasetRenderer.render("Parameter Trends", &series);
                Ok(TrendReport::Chart(chart))
            }
            Trend::NoData => {
                tracing::info!(records = records.len(), "no trend data for selected parameters");
                Ok(TrendReport::NoData)
            }
        }
    }

    /// Build and write a workbook for the selected records.
    pub async fn export(&self, ids: &[i64]) -> Result<ExportOutcome, ServiceError> {
        if ids.is_empty() {
            return Err(ServiceError::NotFound("no records selected for export".to_string()));
        }

        let records = self.store.fetch_by_ids(ids).await?;
        if records.is_empty() {
            return Err(ServiceError::NotFound("none of the selected records exist".to_string()));
        }

        let workbook = build_workbook(&records, OffsetDateTime::now_utc())?;
        let name = workbook.name.clone();
        let writer = Arc::clone(&self.writer);
        let location = tokio::task::spawn_blocking(move || writer.write(&workbook))
            .await
            .map_err(|e| ServiceError::Compute(format!("export task failed: {e}")))??;

        metrics::counter!("exports_total").increment(1);
        Ok(ExportOutcome {
            workbook: name,
            location,
            records: records.len(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        export::{CsvWorkbookWriter, Workbook},
        reports::fixtures::{as_new, line_record, with_current},
        store::MemoryRecordStore,
    };
    use std::sync::Mutex;
    use substation_client::domain::CurrentPhase;
    use time::macros::datetime;

    /// Keeps written workbooks in memory.
    #[derive(Default)]
    pub(crate) struct RecordingWriter {
        pub written: Mutex<Vec<Workbook>>,
    }

    impl TabularWriter for RecordingWriter {
        fn write(&self, workbook: &Workbook) -> Result<PathBuf, ServiceError> {
            let mut written = self.written.lock().unwrap();
            written.push(workbook.clone());
            Ok(PathBuf::from(&workbook.name))
        }
    }

    fn line_form(substation: &str, bay: &str, ia: &str) -> HashMap<String, String> {
        let mut f: HashMap<String, String> = [
            ("element_type", "line"),
            ("substation_name", substation),
            ("bay_name", bay),
            ("voltage_level", "132kV"),
            ("relay_type", "P443"),
            ("active_power", "1"),
            ("reactive_power", "1"),
            ("ct_ratio", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for label in [
            "IB", "IC", "IN", "VA", "VB", "VC", "VN", "I0", "I1", "I2", "V0", "V1", "V2",
        ] {
            f.insert(format!("{label}_value"), "1".into());
        }
        f.insert("IA_value".into(), ia.into());
        f
    }

    pub(crate) fn service_with(
        writer: Arc<dyn TabularWriter + Send + Sync>,
    ) -> ReportService<MemoryRecordStore> {
        ReportService::new(MemoryRecordStore::new(), ThresholdRules::default(), writer)
    }

    #[tokio::test]
    async fn submitted_records_show_up_in_reports() {
        let svc = service_with(Arc::new(RecordingWriter::default()));
        svc.submit(&line_form("A", "B1", "100")).await.unwrap();
        svc.submit(&line_form("A", "B1", "300")).await.unwrap();

        let report = svc.summary_report(&FilterRequest::default()).await.unwrap();
        let ia = report.currents.iter().find(|g| g.label == "IA").unwrap();
        assert_eq!((ia.min, ia.max, ia.mean, ia.population_std_dev), (100.0, 300.0, 200.0, 100.0));
        assert_eq!(report.sequence_components.len(), 6);
        assert_eq!(report.statistics.total_records, 2);
    }

    #[tokio::test]
    async fn rejected_submission_stores_nothing() {
        let svc = service_with(Arc::new(RecordingWriter::default()));
        let mut form = line_form("A", "B1", "100");
        form.insert("V2_value".into(), "high".into());

        assert!(matches!(svc.submit(&form).await, Err(ServiceError::Validation(_))));
        assert_eq!(svc.store().len().await, 0);
    }

    #[tokio::test]
    async fn threshold_report_flags_overcurrent() {
        let svc = service_with(Arc::new(RecordingWriter::default()));
        svc.submit(&line_form("A", "B1", "2000")).await.unwrap();
        svc.submit(&line_form("A", "B1", "1600")).await.unwrap();

        let report = svc.threshold_report(&FilterRequest::default()).await.unwrap();
        assert_eq!(report.alerts.len(), 1);
        assert_eq!((report.alerts[0].label, report.alerts[0].value), ("IA", 2000.0));
        assert_eq!(report.thresholds, ThresholdRules::default());
    }

    #[tokio::test]
    async fn trend_report_without_matches_is_no_data() {
        let svc = service_with(Arc::new(RecordingWriter::default()));
        let report = svc
            .trend_report(&FilterRequest::default(), &["IA".to_string()])
            .await
            .unwrap();
        assert_eq!(report, TrendReport::NoData);

        svc.submit(&line_form("A", "B1", "5")).await.unwrap();
        let TrendReport::Chart(chart) = svc
            .trend_report(&FilterRequest::default(), &["IA".to_string(), "VA".to_string()])
            .await
            .unwrap()
        else {
            panic!("expected chart");
        };
        assert_eq!(chart.datasets.len(), 2);
    }

    #[tokio::test]
    async fn filter_options_list_known_values() {
        let svc = service_with(Arc::new(RecordingWriter::default()));
        svc.submit(&line_form("South", "L2", "1")).await.unwrap();
        svc.submit(&line_form("North", "L1", "1")).await.unwrap();

        let opts = svc.filter_options().await.unwrap();
        assert_eq!(opts.substations, vec!["North", "South"]);
        assert_eq!(opts.bays, vec!["L1", "L2"]);
        assert_eq!(opts.trend_parameters.len(), 12);
    }

    #[tokio::test]
    async fn deleting_unknown_record_is_not_found() {
        let svc = service_with(Arc::new(RecordingWriter::default()));
        let id = svc.submit(&line_form("A", "B1", "1")).await.unwrap();

        svc.delete_record(id).await.unwrap();
        assert!(matches!(svc.delete_record(id).await, Err(ServiceError::NotFound(_))));
        assert!(svc.recent_records(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_export_writes_nothing() {
        let writer = Arc::new(RecordingWriter::default());
        let svc = service_with(writer.clone());

        assert!(matches!(svc.export(&[]).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(svc.export(&[41, 42]).await, Err(ServiceError::NotFound(_))));
        assert!(writer.written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn export_writes_selected_records() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service_with(Arc::new(CsvWorkbookWriter::new(dir.path())));
        let r = line_record(0, datetime!(2024-03-05 14:07:00 UTC), "North", "L1");
        let r = with_current(r, CurrentPhase::IA, 42.0);
        let id = svc.store().insert(as_new(r)).await.unwrap();

        let outcome = svc.export(&[id, 999]).await.unwrap();
        assert_eq!(outcome.records, 1);
        assert!(outcome.workbook.starts_with("North_substation_data_"));
        assert!(outcome.location.join("Summary.csv").exists());
        assert!(outcome.location.join(format!("L1_{id}.csv")).exists());
    }
}
