use std::collections::BTreeMap;

use time::{Date, OffsetDateTime, Weekday};

use super::{calendar::YearMonth, reading::Reading};

/// Per-date row of a month summary.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummaryEntry {
    pub date: Date,
    pub latest_value_kwh: f64,
    pub last_updated: OffsetDateTime,
    pub reading_count: u32,
}

impl MonthlySummaryEntry {
    pub fn from_reading(reading: &Reading, reading_count: u32) -> Self {
        Self {
            date: reading.date,
            latest_value_kwh: reading.value_kwh,
            last_updated: reading.timestamp,
            reading_count,
        }
    }

    pub fn day_of_week(&self) -> Weekday {
        self.date.weekday()
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }
}

/// Summary rows of one month, at most one per date, kept in date order.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    pub month: YearMonth,
    entries: BTreeMap<Date, MonthlySummaryEntry>,
}

impl MonthlySummary {
    pub fn new(month: YearMonth) -> Self {
        Self {
            month,
            entries: BTreeMap::new(),
        }
    }

    /// Replaces the row for `entry.date`, returning the previous row.
    pub fn upsert(&mut self, entry: MonthlySummaryEntry) -> Option<MonthlySummaryEntry> {
        self.entries.insert(entry.date, entry)
    }

    pub fn get(&self, date: Date) -> Option<&MonthlySummaryEntry> {
        self.entries.get(&date)
    }

    pub fn entries(&self) -> impl Iterator<Item = &MonthlySummaryEntry> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn entry(ts: OffsetDateTime, kwh: f64, count: u32) -> MonthlySummaryEntry {
        MonthlySummaryEntry::from_reading(&Reading::new(ts, kwh), count)
    }

    #[test]
    fn upsert_replaces_existing_date() {
        let mut s = MonthlySummary::new(YearMonth::new(2024, 1).unwrap());
        assert!(s.upsert(entry(datetime!(2024-01-02 10:00:00 UTC), 10.0, 1)).is_none());
        let prev = s.upsert(entry(datetime!(2024-01-02 11:00:00 UTC), 11.0, 2));

        assert_eq!(prev.map(|e| e.latest_value_kwh), Some(10.0));
        assert_eq!(s.entries().count(), 1);
        assert_eq!(s.get(date!(2024 - 01 - 02)).unwrap().reading_count, 2);
    }

    #[test]
    fn entries_are_sorted_by_date() {
        let mut s = MonthlySummary::new(YearMonth::new(2024, 1).unwrap());
        s.upsert(entry(datetime!(2024-01-20 10:00:00 UTC), 20.0, 1));
        s.upsert(entry(datetime!(2024-01-03 10:00:00 UTC), 3.0, 1));
        s.upsert(entry(datetime!(2024-01-11 10:00:00 UTC), 11.0, 1));

        let dates: Vec<_> = s.entries().map(|e| e.date.day()).collect();
        assert_eq!(dates, vec![3, 11, 20]);
    }

    #[test]
    fn day_of_week_follows_date() {
        let e = entry(datetime!(2024-01-01 10:00:00 UTC), 1.0, 1);
        assert_eq!(e.day_of_week(), Weekday::Monday);
    }
}
