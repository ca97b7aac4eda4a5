use anyhow::Result;
use energy_client::domain::YearMonth;
use energy_logger::{
    config::AppConfig, observability, publish::SnapshotPublisher, render::MarkdownDashboard,
    sinks::CsvFileStore,
};
use std::env;

/// Rebuilds the dashboard from stored data without contacting the device.
/// Optional argument: the `YYYY-MM` month for the daily chart.
fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    observability::init_tracing();

    let month = match env::args().nth(1) {
        Some(arg) => arg.parse::<YearMonth>()?,
        None => YearMonth::current(),
    };

    let cfg = AppConfig::load()?;
    let store = CsvFileStore::open(&cfg.storage.data_dir)?;
    let dashboard = MarkdownDashboard::new(cfg.dashboard_path());
    SnapshotPublisher::new(&store).render(&dashboard, month)?;

    Ok(())
}
