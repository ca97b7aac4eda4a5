use std::{fs, path::PathBuf};

use energy_client::domain::calendar::format_utc_timestamp;

use super::{RenderInput, Renderer};
use crate::{pipeline::PipelineError, publish::Series};

const Y_AXIS: &str = "Energy Consumption (kWh)";

/// Status document with the consumption overview and Mermaid charts,
/// written as a markdown file next to the data it describes.
pub struct MarkdownDashboard {
    output: PathBuf,
}

enum ChartKind {
    Line,
    Bar,
}

/// Mermaid `xychart-beta` block, or `None` for an empty series.
fn xychart(title: &str, kind: ChartKind, series: &Series) -> Option<String> {
    if series.is_empty() {
        return None;
    }

    let labels: Vec<String> = series.iter().map(|(x, _)| format!("\"{x}\"")).collect();
    let values: Vec<String> = series.iter().map(|(_, y)| format!("{y:.2}")).collect();
    let mark = match kind {
        ChartKind::Line => "line",
        ChartKind::Bar => "bar",
    };

    Some(format!(
        "```mermaid\nxychart-beta\n    title \"{title}\"\n    x-axis [{}]\n    y-axis \"{Y_AXIS}\"\n    {mark} [{}]\n```\n",
        labels.join(", "),
        values.join(", "),
    ))
}

const DATA_STRUCTURE: &str = "\
## Data Structure

### Daily Data (`daily/`)
- One CSV file per day: `energy_YYYY-MM-DD.csv`
- One row per reading, appended as readings arrive

### Monthly Summaries (`monthly/`)
- One CSV file per month: `energy_summary_YYYY-MM.csv`
- One row per day with the latest reading of that day

### Latest Reading (`latest_reading.json`)
- The most recent reading, replaced on every run

## Data Columns

**Daily files:**
- `timestamp`: full UTC timestamp
- `date`: date (YYYY-MM-DD)
- `time`: time (HH:MM:SS)
- `forward_energy_total_kwh`: cumulative counter in kWh
- `hour`: hour of day (0-23)
- `day_of_week`: day name
- `unix_timestamp`: seconds since the Unix epoch

**Monthly files:**
- `date`: date (YYYY-MM-DD)
- `day_of_week`: day name
- `latest_reading_kwh`: latest counter value of that day
- `last_updated`: when the row was last written
- `readings_count`: readings recorded for that day

## Consumption Calculation

- **Monthly consumption**: last reading of the month minus the first reading of the month
- **Daily consumption**: last reading of the day minus the last reading of the previous day; \
the first day with data uses its own first reading
- Negative values mean the counter went backwards and are shown as measured
";

impl MarkdownDashboard {
    pub fn new<P: Into<PathBuf>>(output: P) -> Self {
        Self {
            output: output.into(),
        }
    }

    pub fn document(&self, input: &RenderInput<'_>) -> String {
        let summary = input.summary;
        let latest = input
            .latest
            .map(|s| s.label.as_str())
            .unwrap_or("N/A");

        let mut doc = String::from("# Energy Consumption Dashboard\n\n## Consumption Overview\n\n");
        doc.push_str(&format!("**Latest Reading:** {latest}  \n"));
        doc.push_str(&format!(
            "**Total Consumption:** {:.2} kWh  \n",
            summary.total_kwh
        ));
        doc.push_str(&format!(
            "**Monitoring Period:** {} months  \n\n",
            summary.months_covered
        ));

        doc.push_str("## Monthly Consumption\n\n");
        match xychart(
            "Monthly Energy Consumption",
            ChartKind::Line,
            &summary.monthly_series(),
        ) {
            Some(chart) => doc.push_str(&chart),
            None => doc.push_str(
                "*The monthly consumption chart will be available once data is collected.*\n",
            ),
        }
        doc.push('\n');

        doc.push_str(&format!(
            "## Daily Consumption ({})\n\n",
            summary.target_month
        ));
        match xychart(
            &format!("Daily Energy Consumption - {}", summary.target_month),
            ChartKind::Bar,
            &summary.daily_series(),
        ) {
            Some(chart) => doc.push_str(&chart),
            None => doc.push_str(
                "*The daily consumption chart will be available once daily data is collected.*\n",
            ),
        }
        doc.push('\n');

        doc.push_str(DATA_STRUCTURE);
        doc.push_str(&format!(
            "\nLast updated: {}\n",
            format_utc_timestamp(input.generated_at)
        ));
        doc
    }
}

impl Renderer for MarkdownDashboard {
    fn render(&self, input: &RenderInput<'_>) -> Result<PathBuf, PipelineError> {
        if let Some(parent) = self.output.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| PipelineError::Render(format!("{}: {e}", parent.display())))?;
        }
        fs::write(&self.output, self.document(input))
            .map_err(|e| PipelineError::Render(format!("{}: {e}", self.output.display())))?;
        Ok(self.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::ConsumptionSummary;
    use energy_client::{
        db::consumption_queries::{DailyConsumption, MonthlyConsumption},
        domain::{ConsumptionDelta, LatestSnapshot, Reading, YearMonth},
    };
    use time::macros::{date, datetime};

    fn summary() -> ConsumptionSummary {
        let mut monthly = MonthlyConsumption::new();
        monthly.insert(YearMonth::new(2024, 1).unwrap(), ConsumptionDelta::between(0.0, 120.0));
        monthly.insert(YearMonth::new(2024, 2).unwrap(), ConsumptionDelta::between(120.0, 215.5));
        let mut daily = DailyConsumption::new();
        daily.insert(date!(2024 - 02 - 01), ConsumptionDelta::between(120.0, 123.25));
        daily.insert(date!(2024 - 02 - 02), ConsumptionDelta::between(123.25, 126.0));

        ConsumptionSummary {
            target_month: YearMonth::new(2024, 2).unwrap(),
            total_kwh: 215.5,
            months_covered: 2,
            monthly,
            daily,
        }
    }

    #[test]
    fn document_contains_overview_and_charts() {
        let summary = summary();
        let latest = LatestSnapshot::from(Reading::new(datetime!(2024-02-02 08:00:00 UTC), 215.5));
        let input = RenderInput {
            latest: Some(&latest),
            summary: &summary,
            generated_at: datetime!(2024-02-02 08:00:05 UTC),
        };

        let doc = MarkdownDashboard::new("README.md").document(&input);

        assert!(doc.contains("**Latest Reading:** 215.5 kWh at 2024-02-02 08:00:00 UTC"));
        assert!(doc.contains("**Total Consumption:** 215.50 kWh"));
        assert!(doc.contains("**Monitoring Period:** 2 months"));
        assert!(doc.contains("x-axis [\"2024-01\", \"2024-02\"]"));
        assert!(doc.contains("line [120.00, 95.50]"));
        assert!(doc.contains("## Daily Consumption (2024-02)"));
        assert!(doc.contains("bar [3.25, 2.75]"));
        assert!(doc.contains("Last updated: 2024-02-02 08:00:05 UTC"));
    }

    #[test]
    fn empty_summary_renders_placeholders() {
        let summary = ConsumptionSummary {
            target_month: YearMonth::new(2024, 2).unwrap(),
            monthly: MonthlyConsumption::new(),
            daily: DailyConsumption::new(),
            total_kwh: 0.0,
            months_covered: 0,
        };
        let input = RenderInput {
            latest: None,
            summary: &summary,
            generated_at: datetime!(2024-02-02 08:00:05 UTC),
        };

        let doc = MarkdownDashboard::new("README.md").document(&input);

        assert!(doc.contains("**Latest Reading:** N/A"));
        assert!(doc.contains("**Total Consumption:** 0.00 kWh"));
        assert!(!doc.contains("```mermaid"));
        assert!(doc.contains("will be available once data is collected"));
    }

    #[test]
    fn render_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let summary = summary();
        let input = RenderInput {
            latest: None,
            summary: &summary,
            generated_at: datetime!(2024-02-02 08:00:05 UTC),
        };

        let dashboard = MarkdownDashboard::new(dir.path().join("out").join("README.md"));
        let path = dashboard.render(&input).unwrap();

        let written = fs::read_to_string(path).unwrap();
        assert!(written.starts_with("# Energy Consumption Dashboard"));
    }
}
