use std::path::PathBuf;

use energy_client::{
    db::{
        consumption_queries::{self, DailyConsumption, MonthlyConsumption},
        ReadingStore, StoreError,
    },
    domain::{LatestSnapshot, YearMonth},
};
use time::OffsetDateTime;

use crate::{
    pipeline::PipelineError,
    render::{RenderInput, Renderer},
};

/// `(x, y)` points handed to chart renderers.
pub type Series = Vec<(String, f64)>;

/// Aggregates computed for one publish.
#[derive(Debug, Clone)]
pub struct ConsumptionSummary {
    /// Month the daily view covers.
    pub target_month: YearMonth,
    pub monthly: MonthlyConsumption,
    pub daily: DailyConsumption,
    /// Sum of the monthly deltas.
    pub total_kwh: f64,
    pub months_covered: usize,
}

impl ConsumptionSummary {
    /// `(YYYY-MM, kWh)` in month order.
    pub fn monthly_series(&self) -> Series {
        self.monthly
            .iter()
            .map(|(month, delta)| (month.to_string(), delta.kwh()))
            .collect()
    }

    /// `(MM-DD, kWh)` in date order.
    pub fn daily_series(&self) -> Series {
        self.daily
            .iter()
            .map(|(date, delta)| {
                (
                    format!("{:02}-{:02}", u8::from(date.month()), date.day()),
                    delta.kwh(),
                )
            })
            .collect()
    }
}

/// Read side over a store: the latest reading and fresh aggregates.
pub struct SnapshotPublisher<'a, S: ReadingStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ReadingStore + ?Sized> SnapshotPublisher<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// `None` when nothing was ingested yet or the record is unreadable.
    pub fn latest(&self) -> Option<LatestSnapshot> {
        self.store.latest().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "latest reading unavailable");
            None
        })
    }

    /// Recomputes every aggregate from the store.
    pub fn summary(&self, target_month: YearMonth) -> Result<ConsumptionSummary, StoreError> {
        let monthly = consumption_queries::monthly_consumption(self.store)?;
        let daily = consumption_queries::daily_consumption(self.store, target_month)?;
        let total_kwh = consumption_queries::total_consumption(&monthly);

        Ok(ConsumptionSummary {
            target_month,
            months_covered: monthly.len(),
            monthly,
            daily,
            total_kwh,
        })
    }

    pub fn render<R: Renderer + ?Sized>(
        &self,
        renderer: &R,
        target_month: YearMonth,
    ) -> Result<PathBuf, PipelineError> {
        let latest = self.latest();
        let summary = self.summary(target_month)?;
        let input = RenderInput {
            latest: latest.as_ref(),
            summary: &summary,
            generated_at: OffsetDateTime::now_utc(),
        };

        let path = renderer.render(&input)?;
        tracing::info!(
            path = %path.display(),
            total_kwh = summary.total_kwh,
            months = summary.months_covered,
            "dashboard updated"
        );
        Ok(path)
    }
}
