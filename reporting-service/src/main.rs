use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use reporting_service::{
    api,
    config::AppConfig,
    export::CsvWorkbookWriter,
    metrics_server, observability,
    store::PgRecordStore,
    ReportService,
};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let thresholds = cfg.threshold_rules()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    // Schema is expected to be applied out-of-band via `substation-client/sql/schema/*.sql`.
    let store = PgRecordStore::new(pool);
    let writer = Arc::new(CsvWorkbookWriter::new(&cfg.export.output_dir));
    let service = Arc::new(ReportService::new(store, thresholds, writer));

    let addr: SocketAddr = cfg
        .http
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http.bind_addr: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "reporting API listening");

    axum::serve(listener, api::router(Arc::clone(&service)).into_make_service())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            tracing::info!("shutdown requested");
        })
        .await?;

    service.store().close().await;
    Ok(())
}
