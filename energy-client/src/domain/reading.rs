use time::{Date, OffsetDateTime, Time, UtcOffset};

use super::calendar::{format_clock, format_date, YearMonth};

/// Raw counter sample as reported by the device, before unit conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDeviceReading {
    /// Counter value in device units; `None` when the device reported null.
    pub value: Option<f64>,
    /// Divisor turning device units into kWh.
    pub unit_scale: f64,
    pub read_at: OffsetDateTime,
}

/// One cumulative-counter sample. `date` and `time` are the UTC components
/// of `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: OffsetDateTime,
    pub value_kwh: f64,
    pub date: Date,
    pub time: Time,
}

impl Reading {
    pub fn new(timestamp: OffsetDateTime, value_kwh: f64) -> Self {
        let timestamp = timestamp.to_offset(UtcOffset::UTC);
        Self {
            timestamp,
            value_kwh,
            date: timestamp.date(),
            time: timestamp.time(),
        }
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth::of(self.date)
    }

    /// Human readable form, e.g. `1234.5 kWh at 2024-01-01 10:00:00 UTC`.
    /// Whole values keep one decimal place (`20.0 kWh`).
    pub fn label(&self) -> String {
        format!(
            "{:?} kWh at {} {} UTC",
            self.value_kwh,
            format_date(self.date),
            format_clock(self.time)
        )
    }
}

/// Readings for exactly one calendar date, in append order.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyLog {
    pub date: Date,
    pub readings: Vec<Reading>,
}

impl DailyLog {
    pub fn new(date: Date) -> Self {
        Self {
            date,
            readings: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn first(&self) -> Option<&Reading> {
        self.readings.first()
    }

    pub fn last(&self) -> Option<&Reading> {
        self.readings.last()
    }

    /// Values of the first and last reading of the day.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        Some((self.first()?.value_kwh, self.last()?.value_kwh))
    }
}

/// Most recent reading together with its display label.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestSnapshot {
    pub reading: Reading,
    pub label: String,
}

impl From<Reading> for LatestSnapshot {
    fn from(reading: Reading) -> Self {
        let label = reading.label();
        Self { reading, label }
    }
}
