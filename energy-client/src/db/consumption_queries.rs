use std::collections::BTreeMap;

use time::Date;
use tracing::{debug, warn};

use super::{LogFilter, ReadingStore, StoreError};
use crate::domain::{ConsumptionDelta, DailyLog, YearMonth};

pub type MonthlyConsumption = BTreeMap<YearMonth, ConsumptionDelta>;
pub type DailyConsumption = BTreeMap<Date, ConsumptionDelta>;

/// Loads one log, logging and discarding it when unreadable.
fn load_log<S: ReadingStore + ?Sized>(store: &S, date: Date) -> Option<DailyLog> {
    match store.read_daily_log(date) {
        Ok(log) => Some(log),
        Err(e) => {
            metrics::counter!("aggregation_skipped_logs_total").increment(1);
            warn!(%date, error = %e, "skipping unreadable daily log");
            None
        }
    }
}

fn sorted_dates<S: ReadingStore + ?Sized>(
    store: &S,
    filter: LogFilter,
) -> Result<Vec<Date>, StoreError> {
    let mut dates: Vec<Date> = store.list_daily_logs(filter)?.collect();
    dates.sort_unstable();
    dates.dedup();
    Ok(dates)
}

fn warn_if_negative(period: &str, delta: &ConsumptionDelta) {
    if delta.is_negative() {
        warn!(
            period,
            start_kwh = delta.start_kwh,
            end_kwh = delta.end_kwh,
            consumption_kwh = delta.kwh(),
            "negative consumption, counter may have been reset"
        );
    }
}

/// Consumption per month: last reading of the month's latest log minus the
/// first reading of its earliest log.
///
/// Empty and unreadable logs are left out of the earliest/latest selection;
/// months without any usable log are omitted.
pub fn monthly_consumption<S: ReadingStore + ?Sized>(
    store: &S,
) -> Result<MonthlyConsumption, StoreError> {
    let mut by_month: BTreeMap<YearMonth, Vec<Date>> = BTreeMap::new();
    for date in sorted_dates(store, LogFilter::All)? {
        by_month.entry(YearMonth::of(date)).or_default().push(date);
    }

    let mut out = MonthlyConsumption::new();
    for (month, dates) in by_month {
        let logs: Vec<DailyLog> = dates
            .into_iter()
            .filter_map(|date| load_log(store, date))
            .filter(|log| !log.is_empty())
            .collect();

        let (Some(first), Some(last)) = (
            logs.first().and_then(DailyLog::first),
            logs.last().and_then(DailyLog::last),
        ) else {
            debug!(%month, "no usable daily logs, month omitted");
            continue;
        };

        let delta = ConsumptionDelta::between(first.value_kwh, last.value_kwh);
        warn_if_negative(&month.to_string(), &delta);
        debug!(%month, consumption_kwh = delta.kwh(), "monthly consumption");
        out.insert(month, delta);
    }

    Ok(out)
}

/// Consumption per day of `month`.
///
/// A day is measured from the previous processed day's last reading, so
/// overnight usage lands on the later day. The first usable day of the
/// month falls back to its own first reading.
pub fn daily_consumption<S: ReadingStore + ?Sized>(
    store: &S,
    month: YearMonth,
) -> Result<DailyConsumption, StoreError> {
    let mut out = DailyConsumption::new();
    let mut prev_day_last: Option<f64> = None;

    for date in sorted_dates(store, LogFilter::Month(month))? {
        let Some(log) = load_log(store, date) else {
            continue;
        };
        let Some((first, last)) = log.bounds() else {
            debug!(%date, "empty daily log skipped");
            continue;
        };

        let delta = ConsumptionDelta::between(prev_day_last.unwrap_or(first), last);
        warn_if_negative(&date.to_string(), &delta);
        out.insert(date, delta);
        prev_day_last = Some(last);
    }

    Ok(out)
}

pub fn total_consumption(monthly: &MonthlyConsumption) -> f64 {
    monthly.values().map(ConsumptionDelta::kwh).sum()
}
