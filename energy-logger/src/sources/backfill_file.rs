use std::path::PathBuf;

use async_stream::stream;
use energy_client::domain::RawDeviceReading;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
};

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// NDJSON backfill source for historical counter samples.
///
/// Each non-blank line is a JSON object:
/// `{"read_at": "<RFC 3339>", "value": <counter>, "unit_scale": <divisor>}`.
/// `unit_scale` defaults to 1 (value already in kWh). A malformed line is
/// yielded as a record-level error and reading continues; failing to open
/// or read the file ends the stream.
pub struct BackfillFileSource {
    path: PathBuf,
}

#[derive(serde::Deserialize)]
struct BackfillReading {
    read_at: String,
    value: Option<f64>,
    #[serde(default = "default_unit_scale")]
    unit_scale: f64,
}

fn default_unit_scale() -> f64 {
    1.0
}

impl TryFrom<BackfillReading> for RawDeviceReading {
    type Error = PipelineError;

    fn try_from(i: BackfillReading) -> Result<Self, Self::Error> {
        let read_at = OffsetDateTime::parse(i.read_at.trim(), &Rfc3339)
            .map_err(|e| PipelineError::Source(format!("invalid read_at '{}': {e}", i.read_at)))?;
        Ok(RawDeviceReading {
            value: i.value,
            unit_scale: i.unit_scale,
            read_at,
        })
    }
}

fn parse_line(line_no: usize, line: &str) -> Result<RawDeviceReading, PipelineError> {
    let parsed: BackfillReading = serde_json::from_str(line).map_err(|e| {
        metrics::counter!("backfill_parse_errors_total").increment(1);
        PipelineError::Source(format!("line {line_no}: failed to parse backfill json: {e}"))
    })?;
    parsed.try_into().map_err(|e: PipelineError| match e {
        PipelineError::Source(msg) => PipelineError::Source(format!("line {line_no}: {msg}")),
        other => other,
    })
}

impl BackfillFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Source<RawDeviceReading> for BackfillFileSource {
    async fn stream(&self) -> EnvelopeStream<RawDeviceReading> {
        let path = self.path.clone();
        let s = stream! {
            let file = match File::open(&path).await {
                Ok(f) => f,
                Err(e) => {
                    yield Err(PipelineError::InputUnavailable(format!(
                        "failed to open backfill file {}: {e}",
                        path.display()
                    )));
                    return;
                }
            };
            let mut lines = BufReader::new(file).lines();
            let mut line_no = 0usize;

            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(PipelineError::InputUnavailable(format!(
                            "failed to read backfill line: {e}"
                        )));
                        break;
                    }
                };
                line_no += 1;
                if line.trim().is_empty() {
                    continue;
                }
                yield parse_line(line_no, &line).map(Envelope::now);
            }
        };

        Box::pin(s)
    }
}
