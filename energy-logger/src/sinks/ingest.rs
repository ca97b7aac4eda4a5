use energy_client::{
    db::{ReadingStore, StoreError},
    domain::{LatestSnapshot, MonthlySummaryEntry, RawDeviceReading, Reading},
};

use crate::{pipeline::PipelineError, transform::validate_raw_reading};

/// Validates raw samples and writes them to a store: one daily-log append
/// and one month-summary upsert per accepted sample, then the latest
/// snapshot when the sample is the newest seen.
///
/// The append and the upsert are not transactional; a failed upsert leaves
/// the appended row in place.
pub struct Ingestor<'a, S: ReadingStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ReadingStore + ?Sized> Ingestor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn ingest(&self, raw: RawDeviceReading) -> Result<Reading, PipelineError> {
        let reading = match validate_raw_reading(&raw) {
            Ok(r) => r,
            Err(e) => {
                metrics::counter!("validation_rejected_total").increment(1);
                return Err(e);
            }
        };

        let reading_count = self.next_reading_count(&reading)?;
        self.store.append(&reading)?;
        self.store
            .upsert_monthly_entry(&MonthlySummaryEntry::from_reading(&reading, reading_count))?;

        self.refresh_latest(&reading)?;

        metrics::counter!("readings_ingested_total").increment(1);
        tracing::info!(
            kwh = reading.value_kwh,
            date = %reading.date,
            reading_count,
            "reading ingested"
        );
        Ok(reading)
    }

    /// Counts accumulate across runs rather than restarting at 1. An
    /// unreadable summary restarts the count; the upsert rebuilds it.
    fn next_reading_count(&self, reading: &Reading) -> Result<u32, PipelineError> {
        match self.store.read_monthly_summary(reading.year_month()) {
            Ok(summary) => Ok(summary
                .get(reading.date)
                .map_or(1, |prev| prev.reading_count.saturating_add(1))),
            Err(e @ StoreError::CorruptData { .. }) => {
                tracing::warn!(
                    month = %reading.year_month(),
                    error = %e,
                    "unreadable monthly summary, reading count restarts"
                );
                Ok(1)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Backfilled samples older than the recorded latest leave it untouched.
    fn refresh_latest(&self, reading: &Reading) -> Result<(), PipelineError> {
        match self.store.latest() {
            Ok(Some(current)) if current.reading.timestamp > reading.timestamp => return Ok(()),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "unreadable latest reading, overwriting"),
        }
        self.store
            .record_latest(&LatestSnapshot::from(reading.clone()))?;
        Ok(())
    }
}
