use anyhow::Result;
use energy_client::domain::{
    calendar::{format_clock, format_date},
    YearMonth,
};
use energy_logger::{
    config::AppConfig,
    observability,
    pipeline::{FailurePolicy, Pipeline},
    publish::SnapshotPublisher,
    render::MarkdownDashboard,
    sinks::{CsvFileStore, Ingestor},
    sources::TuyaHttpSource,
};

/// One scheduled run: read the meter, store the sample, refresh the
/// dashboard.
async fn run() -> Result<()> {
    let cfg = AppConfig::load()?;
    let credentials = cfg.credentials()?;
    tracing::info!(device_id = %credentials.device_id, "energy logger starting");

    let store = CsvFileStore::open(&cfg.storage.data_dir)?;

    let pipeline = Pipeline {
        source: TuyaHttpSource::new(&cfg.device, credentials),
        ingestor: Ingestor::new(&store),
        policy: FailurePolicy::Abort,
    };
    let report = pipeline.run().await?;

    let dashboard = MarkdownDashboard::new(cfg.dashboard_path());
    SnapshotPublisher::new(&store).render(&dashboard, YearMonth::current())?;

    if let Some(reading) = report.last {
        tracing::info!(
            kwh = reading.value_kwh,
            date = %format_date(reading.date),
            time = %format_clock(reading.time),
            "energy logging completed"
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_tracing();

    run()
        .await
        .inspect_err(|e| tracing::error!(error = %format!("{e:#}"), "energy logging failed"))
}
