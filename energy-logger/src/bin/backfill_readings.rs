use anyhow::{bail, Result};
use energy_client::domain::YearMonth;
use energy_logger::{
    config::AppConfig,
    observability,
    pipeline::{FailurePolicy, Pipeline},
    publish::SnapshotPublisher,
    render::MarkdownDashboard,
    sinks::{CsvFileStore, Ingestor},
    sources::BackfillFileSource,
};
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: backfill_readings <ndjson_file_path>");
    }
    let file_path = &args[1];

    // Device credentials are not needed for a backfill.
    let cfg = AppConfig::load()?;
    let store = CsvFileStore::open(&cfg.storage.data_dir)?;

    let pipeline = Pipeline {
        source: BackfillFileSource::new(file_path),
        ingestor: Ingestor::new(&store),
        policy: FailurePolicy::SkipInvalid,
    };
    let report = pipeline.run().await?;
    tracing::info!(
        ingested = report.ingested,
        rejected = report.rejected,
        "backfill finished"
    );

    let dashboard = MarkdownDashboard::new(cfg.dashboard_path());
    SnapshotPublisher::new(&store).render(&dashboard, YearMonth::current())?;

    Ok(())
}
