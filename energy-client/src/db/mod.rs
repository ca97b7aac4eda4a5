//! Storage contract for readings and month summaries.

pub mod consumption_queries;

use time::Date;

use crate::domain::{DailyLog, LatestSnapshot, MonthlySummary, MonthlySummaryEntry, Reading, YearMonth};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write {target}: {reason}")]
    Write { target: String, reason: String },
    #[error("no daily log for {0}")]
    NotFound(Date),
    #[error("corrupt data in {target}: {reason}")]
    CorruptData { target: String, reason: String },
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Selects which daily logs `list_daily_logs` yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFilter {
    All,
    Month(YearMonth),
    Day(Date),
}

impl LogFilter {
    pub fn matches(&self, date: Date) -> bool {
        match self {
            Self::All => true,
            Self::Month(month) => month.contains(date),
            Self::Day(day) => *day == date,
        }
    }
}

/// Dates of the daily logs currently in the store, in no particular order.
pub type DailyLogIds<'a> = Box<dyn Iterator<Item = Date> + 'a>;

/// Append-only daily logs plus a mutable per-month summary index.
///
/// Implementations are not safe for concurrent writers; callers serialize
/// runs externally.
pub trait ReadingStore {
    /// Appends to the log for `reading.date`, creating the log if needed.
    fn append(&self, reading: &Reading) -> Result<(), StoreError>;

    /// Inserts or replaces the row for `entry.date` in its month summary.
    fn upsert_monthly_entry(&self, entry: &MonthlySummaryEntry) -> Result<(), StoreError>;

    /// Enumerates stored log dates. Every call re-reads store state.
    fn list_daily_logs(&self, filter: LogFilter) -> Result<DailyLogIds<'_>, StoreError>;

    fn read_daily_log(&self, date: Date) -> Result<DailyLog, StoreError>;

    /// Empty summary when the month has none.
    fn read_monthly_summary(&self, month: YearMonth) -> Result<MonthlySummary, StoreError>;

    fn record_latest(&self, snapshot: &LatestSnapshot) -> Result<(), StoreError>;

    fn latest(&self) -> Result<Option<LatestSnapshot>, StoreError>;
}
