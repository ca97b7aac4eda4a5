use std::{
    fmt::Display,
    fs::{self, File, OpenOptions},
    io::{BufReader, BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
};

use csv::StringRecord;
use energy_client::{
    db::{DailyLogIds, LogFilter, ReadingStore, StoreError},
    domain::{
        calendar::{format_clock, format_date, format_utc_timestamp, parse_date, parse_utc_timestamp},
        DailyLog, LatestSnapshot, MonthlySummary, MonthlySummaryEntry, Reading, YearMonth,
    },
};
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, Date, OffsetDateTime};

const DAILY_DIR: &str = "daily";
const MONTHLY_DIR: &str = "monthly";
const LATEST_FILE: &str = "latest_reading.json";

const DAILY_HEADERS: [&str; 7] = [
    "timestamp",
    "date",
    "time",
    "forward_energy_total_kwh",
    "hour",
    "day_of_week",
    "unix_timestamp",
];

const MONTHLY_HEADERS: [&str; 5] = [
    "date",
    "day_of_week",
    "latest_reading_kwh",
    "last_updated",
    "readings_count",
];

/// CSV-backed store rooted at a data directory:
///
/// - `daily/energy_YYYY-MM-DD.csv`: one appended row per reading
/// - `monthly/energy_summary_YYYY-MM.csv`: one row per date, rewritten whole
/// - `latest_reading.json`: the most recent reading
pub struct CsvFileStore {
    root: PathBuf,
    daily_dir: PathBuf,
    monthly_dir: PathBuf,
}

/// On-disk shape of `latest_reading.json`.
#[derive(Debug, Serialize, Deserialize)]
struct LatestReadingFile {
    timestamp: String,
    date: String,
    time: String,
    forward_energy_total_kwh: f64,
    hour: u8,
    day_of_week: String,
    unix_timestamp: i64,
    formatted_reading: String,
}

fn write_error(path: &Path, e: impl Display) -> StoreError {
    StoreError::Write {
        target: path.display().to_string(),
        reason: e.to_string(),
    }
}

fn corrupt(path: &Path, reason: impl Display) -> StoreError {
    StoreError::CorruptData {
        target: path.display().to_string(),
        reason: reason.to_string(),
    }
}

fn column<'r>(record: &'r StringRecord, headers: &StringRecord, name: &str) -> Result<&'r str, String> {
    headers
        .iter()
        .position(|h| h == name)
        .and_then(|idx| record.get(idx))
        .map(str::trim)
        .ok_or_else(|| format!("missing column '{name}'"))
}

fn record_to_reading(record: &StringRecord, headers: &StringRecord) -> Result<Reading, String> {
    let get = |name: &str| column(record, headers, name);

    let unix_str = get("unix_timestamp")?;
    let unix: i64 = unix_str
        .parse()
        .map_err(|e| format!("invalid unix_timestamp '{unix_str}': {e}"))?;
    let ts = OffsetDateTime::from_unix_timestamp(unix)
        .map_err(|e| format!("invalid unix_timestamp '{unix_str}': {e}"))?;

    let kwh_str = get("forward_energy_total_kwh")?;
    let kwh: f64 = kwh_str
        .parse()
        .map_err(|e| format!("invalid forward_energy_total_kwh '{kwh_str}': {e}"))?;

    Ok(Reading::new(ts, kwh))
}

fn record_to_entry(record: &StringRecord, headers: &StringRecord) -> Result<MonthlySummaryEntry, String> {
    let get = |name: &str| column(record, headers, name);

    let date_str = get("date")?;
    let date = parse_date(date_str).ok_or_else(|| format!("invalid date '{date_str}'"))?;

    let kwh_str = get("latest_reading_kwh")?;
    let latest_value_kwh: f64 = kwh_str
        .parse()
        .map_err(|e| format!("invalid latest_reading_kwh '{kwh_str}': {e}"))?;

    let updated_str = get("last_updated")?;
    let last_updated = parse_utc_timestamp(updated_str)
        .ok_or_else(|| format!("invalid last_updated '{updated_str}'"))?;

    let count_str = get("readings_count")?;
    let reading_count: u32 = count_str
        .parse()
        .map_err(|e| format!("invalid readings_count '{count_str}': {e}"))?;

    Ok(MonthlySummaryEntry {
        date,
        latest_value_kwh,
        last_updated,
        reading_count,
    })
}

fn daily_row(r: &Reading) -> [String; 7] {
    [
        format_utc_timestamp(r.timestamp),
        format_date(r.date),
        format_clock(r.time),
        r.value_kwh.to_string(),
        r.time.hour().to_string(),
        r.date.weekday().to_string(),
        r.timestamp.unix_timestamp().to_string(),
    ]
}

fn monthly_row(e: &MonthlySummaryEntry) -> [String; 5] {
    [
        format_date(e.date),
        e.day_of_week().to_string(),
        e.latest_value_kwh.to_string(),
        format_utc_timestamp(e.last_updated),
        e.reading_count.to_string(),
    ]
}

/// `energy_2024-01-05.csv` -> 2024-01-05
fn date_from_file_name(name: &str) -> Option<Date> {
    parse_date(name.strip_prefix("energy_")?.strip_suffix(".csv")?)
}

impl CsvFileStore {
    /// Opens the store, creating its directories when missing.
    pub fn open<P: Into<PathBuf>>(root: P) -> Result<Self, StoreError> {
        let root = root.into();
        let daily_dir = root.join(DAILY_DIR);
        let monthly_dir = root.join(MONTHLY_DIR);
        for dir in [&root, &daily_dir, &monthly_dir] {
            fs::create_dir_all(dir).map_err(|e| write_error(dir, e))?;
        }

        Ok(Self {
            root,
            daily_dir,
            monthly_dir,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn daily_path(&self, date: Date) -> PathBuf {
        self.daily_dir.join(format!("energy_{}.csv", format_date(date)))
    }

    pub fn monthly_path(&self, month: YearMonth) -> PathBuf {
        self.monthly_dir.join(format!("energy_summary_{month}.csv"))
    }

    pub fn latest_path(&self) -> PathBuf {
        self.root.join(LATEST_FILE)
    }

    fn write_monthly(&self, summary: &MonthlySummary) -> Result<(), StoreError> {
        let path = self.monthly_path(summary.month);
        let tmp = path.with_extension("csv.tmp");

        let mut wtr = csv::Writer::from_path(&tmp).map_err(|e| write_error(&tmp, e))?;
        wtr.write_record(MONTHLY_HEADERS)
            .map_err(|e| write_error(&tmp, e))?;
        for entry in summary.entries() {
            wtr.write_record(monthly_row(entry))
                .map_err(|e| write_error(&tmp, e))?;
        }
        wtr.flush().map_err(|e| write_error(&tmp, e))?;
        drop(wtr);

        fs::rename(&tmp, &path).map_err(|e| write_error(&path, e))
    }
}

impl ReadingStore for CsvFileStore {
    fn append(&self, reading: &Reading) -> Result<(), StoreError> {
        let path = self.daily_path(reading.date);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| write_error(&path, e))?;
        let is_new = file.metadata().map_err(|e| write_error(&path, e))?.len() == 0;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            wtr.write_record(DAILY_HEADERS)
                .map_err(|e| write_error(&path, e))?;
            tracing::info!(path = %path.display(), "created new daily log");
        }
        wtr.write_record(daily_row(reading))
            .map_err(|e| write_error(&path, e))?;
        wtr.flush().map_err(|e| write_error(&path, e))?;

        tracing::debug!(path = %path.display(), kwh = reading.value_kwh, "reading appended");
        Ok(())
    }

    /// An unreadable summary is rebuilt from this entry; the daily logs
    /// stay the source of truth.
    fn upsert_monthly_entry(&self, entry: &MonthlySummaryEntry) -> Result<(), StoreError> {
        let month = entry.year_month();
        let mut summary = match self.read_monthly_summary(month) {
            Ok(summary) => summary,
            Err(e @ StoreError::CorruptData { .. }) => {
                tracing::warn!(%month, error = %e, "rebuilding unreadable monthly summary");
                MonthlySummary::new(month)
            }
            Err(e) => return Err(e),
        };
        summary.upsert(entry.clone());
        self.write_monthly(&summary)?;

        tracing::debug!(month = %summary.month, date = %entry.date, "monthly summary updated");
        Ok(())
    }

    fn list_daily_logs(&self, filter: LogFilter) -> Result<DailyLogIds<'_>, StoreError> {
        let entries = match fs::read_dir(&self.daily_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Box::new(std::iter::empty())),
            Err(e) => return Err(e.into()),
        };

        let dates = entries
            .filter_map(|entry| match entry {
                Ok(entry) => date_from_file_name(entry.file_name().to_str()?),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read daily log directory entry");
                    None
                }
            })
            .filter(move |date| filter.matches(*date));

        Ok(Box::new(dates))
    }

    fn read_daily_log(&self, date: Date) -> Result<DailyLog, StoreError> {
        let path = self.daily_path(date);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StoreError::NotFound(date)),
            Err(e) => return Err(e.into()),
        };

        let mut rdr = csv::Reader::from_reader(file);
        let headers = rdr.headers().map_err(|e| corrupt(&path, e))?.clone();

        let mut log = DailyLog::new(date);
        for (idx, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| corrupt(&path, e))?;
            let reading = record_to_reading(&record, &headers)
                .map_err(|reason| corrupt(&path, format!("row {}: {reason}", idx + 1)))?;
            if reading.date != date {
                return Err(corrupt(
                    &path,
                    format!("row {}: reading dated {} in log for {date}", idx + 1, reading.date),
                ));
            }
            log.readings.push(reading);
        }

        Ok(log)
    }

    fn read_monthly_summary(&self, month: YearMonth) -> Result<MonthlySummary, StoreError> {
        let path = self.monthly_path(month);
        let mut summary = MonthlySummary::new(month);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(summary),
            Err(e) => return Err(e.into()),
        };

        let mut rdr = csv::Reader::from_reader(file);
        let headers = rdr.headers().map_err(|e| corrupt(&path, e))?.clone();

        for (idx, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| corrupt(&path, e))?;
            let entry = record_to_entry(&record, &headers)
                .map_err(|reason| corrupt(&path, format!("row {}: {reason}", idx + 1)))?;
            summary.upsert(entry);
        }

        Ok(summary)
    }

    fn record_latest(&self, snapshot: &LatestSnapshot) -> Result<(), StoreError> {
        let path = self.latest_path();
        let r = &snapshot.reading;
        let record = LatestReadingFile {
            timestamp: r.timestamp.format(&Rfc3339).map_err(|e| write_error(&path, e))?,
            date: format_date(r.date),
            time: format_clock(r.time),
            forward_energy_total_kwh: r.value_kwh,
            hour: r.time.hour(),
            day_of_week: r.date.weekday().to_string(),
            unix_timestamp: r.timestamp.unix_timestamp(),
            formatted_reading: snapshot.label.clone(),
        };

        let file = File::create(&path).map_err(|e| write_error(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &record).map_err(|e| write_error(&path, e))?;
        writer.flush().map_err(|e| write_error(&path, e))?;

        tracing::info!(path = %path.display(), "latest reading saved");
        Ok(())
    }

    fn latest(&self) -> Result<Option<LatestSnapshot>, StoreError> {
        let path = self.latest_path();
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: LatestReadingFile =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| corrupt(&path, e))?;
        let ts = OffsetDateTime::parse(&record.timestamp, &Rfc3339)
            .map_err(|e| corrupt(&path, format!("invalid timestamp '{}': {e}", record.timestamp)))?;

        Ok(Some(LatestSnapshot {
            reading: Reading::new(ts, record.forward_energy_total_kwh),
            label: record.formatted_reading,
        }))
    }
}
