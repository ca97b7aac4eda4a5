use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
};

use energy_client::{
    db::{DailyLogIds, LogFilter, ReadingStore, StoreError},
    domain::{DailyLog, LatestSnapshot, MonthlySummary, MonthlySummaryEntry, Reading, YearMonth},
};
use time::Date;

#[derive(Default)]
struct Inner {
    daily: BTreeMap<Date, Vec<Reading>>,
    monthly: BTreeMap<YearMonth, MonthlySummary>,
    latest: Option<LatestSnapshot>,
}

/// In-process store with the same contracts as the file store. Nothing
/// survives the process.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Write {
            target: "memory store".to_string(),
            reason: "lock poisoned".to_string(),
        })
    }
}

impl ReadingStore for MemoryStore {
    fn append(&self, reading: &Reading) -> Result<(), StoreError> {
        self.lock()?
            .daily
            .entry(reading.date)
            .or_default()
            .push(reading.clone());
        Ok(())
    }

    fn upsert_monthly_entry(&self, entry: &MonthlySummaryEntry) -> Result<(), StoreError> {
        let month = entry.year_month();
        self.lock()?
            .monthly
            .entry(month)
            .or_insert_with(|| MonthlySummary::new(month))
            .upsert(entry.clone());
        Ok(())
    }

    fn list_daily_logs(&self, filter: LogFilter) -> Result<DailyLogIds<'_>, StoreError> {
        let dates: Vec<Date> = self
            .lock()?
            .daily
            .keys()
            .copied()
            .filter(|date| filter.matches(*date))
            .collect();
        Ok(Box::new(dates.into_iter()))
    }

    fn read_daily_log(&self, date: Date) -> Result<DailyLog, StoreError> {
        let inner = self.lock()?;
        let readings = inner.daily.get(&date).ok_or(StoreError::NotFound(date))?;
        Ok(DailyLog {
            date,
            readings: readings.clone(),
        })
    }

    fn read_monthly_summary(&self, month: YearMonth) -> Result<MonthlySummary, StoreError> {
        Ok(self
            .lock()?
            .monthly
            .get(&month)
            .cloned()
            .unwrap_or_else(|| MonthlySummary::new(month)))
    }

    fn record_latest(&self, snapshot: &LatestSnapshot) -> Result<(), StoreError> {
        self.lock()?.latest = Some(snapshot.clone());
        Ok(())
    }

    fn latest(&self) -> Result<Option<LatestSnapshot>, StoreError> {
        Ok(self.lock()?.latest.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn append_groups_readings_by_date() {
        let store = MemoryStore::default();
        store
            .append(&Reading::new(datetime!(2024-01-01 10:00:00 UTC), 1.0))
            .unwrap();
        store
            .append(&Reading::new(datetime!(2024-01-01 11:00:00 UTC), 2.0))
            .unwrap();
        store
            .append(&Reading::new(datetime!(2024-01-02 10:00:00 UTC), 3.0))
            .unwrap();

        assert_eq!(store.read_daily_log(date!(2024 - 01 - 01)).unwrap().readings.len(), 2);
        assert_eq!(store.list_daily_logs(LogFilter::All).unwrap().count(), 2);
        assert!(matches!(
            store.read_daily_log(date!(2024 - 01 - 03)),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn unknown_month_summary_is_empty() {
        let store = MemoryStore::default();
        let s = store
            .read_monthly_summary(YearMonth::new(2024, 1).unwrap())
            .unwrap();
        assert!(s.is_empty());
    }
}
