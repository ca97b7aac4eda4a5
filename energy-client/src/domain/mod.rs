pub mod calendar;
pub mod consumption;
pub mod monthly_summary;
pub mod reading;

pub use calendar::{ParseYearMonthError, YearMonth};
pub use consumption::ConsumptionDelta;
pub use monthly_summary::{MonthlySummary, MonthlySummaryEntry};
pub use reading::{DailyLog, LatestSnapshot, RawDeviceReading, Reading};
