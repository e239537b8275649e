use anyhow::Result;
use reporting_service::{
    config::AppConfig,
    observability,
    reports::{evaluate_thresholds, query_records, FilterRequest},
    store::PgRecordStore,
};
use sqlx::postgres::PgPoolOptions;

const USAGE: &str = "usage: threshold_scan <start_date> <end_date> [substation] [bay]";

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing_with("threshold_scan=info");

    let mut args = std::env::args().skip(1);
    let (Some(start_date), Some(end_date)) = (args.next(), args.next()) else {
        anyhow::bail!(USAGE);
    };
    let request = FilterRequest {
        start_date: Some(start_date),
        end_date: Some(end_date),
        substation: args.next(),
        bay: args.next(),
    };

    let cfg = AppConfig::load()?;
    let rules = cfg.threshold_rules()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;
    let store = PgRecordStore::new(pool);

    let records = query_records(&store, &request).await?;
    let alerts = evaluate_thresholds(&records, &rules);

    for alert in &alerts {
        tracing::warn!(
            record_id = alert.record_id,
            timestamp = %alert.timestamp,
            substation = %alert.substation,
            bay = %alert.bay,
            kind = alert.kind.as_str(),
            label = alert.label,
            value = alert.value,
            threshold = alert.threshold,
            "threshold exceeded"
        );
    }
    tracing::info!(records = records.len(), alerts = alerts.len(), "threshold scan complete");

    store.close().await;
    Ok(())
}
