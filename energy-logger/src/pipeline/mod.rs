use std::{pin::Pin, time::SystemTime};

use energy_client::{
    db::{ReadingStore, StoreError},
    domain::{RawDeviceReading, Reading},
};
use futures::{Stream, StreamExt};

use crate::sinks::Ingestor;

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

impl<T> Envelope<T> {
    pub fn now(payload: T) -> Self {
        Self {
            payload,
            received_at: SystemTime::now(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("invalid reading: {0}")]
    Validation(String),
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("device protocol error: {0}")]
    DeviceProtocol(String),
    #[error("source error: {0}")]
    Source(String),
    #[error("input unavailable: {0}")]
    InputUnavailable(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("render error: {0}")]
    Render(String),
}

impl PipelineError {
    /// Errors confined to a single input record.
    pub fn is_record_level(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Source(_))
    }
}

pub type EnvelopeStream<T> = Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(&self) -> EnvelopeStream<T>;
}

/// What to do with a record that fails validation or parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    Abort,
    SkipInvalid,
}

#[derive(Debug, Default)]
pub struct IngestReport {
    pub ingested: usize,
    pub rejected: usize,
    pub last: Option<Reading>,
}

pub struct Pipeline<'a, S, St: ReadingStore + ?Sized> {
    pub source: S,
    pub ingestor: Ingestor<'a, St>,
    pub policy: FailurePolicy,
}

impl<'a, S, St> Pipeline<'a, S, St>
where
    S: Source<RawDeviceReading>,
    St: ReadingStore + ?Sized,
{
    /// Drains the source into the store. Device and store failures always
    /// abort; record-level failures abort only under `FailurePolicy::Abort`.
    pub async fn run(self) -> Result<IngestReport, PipelineError> {
        let mut stream = self.source.stream().await;
        let mut report = IngestReport::default();

        while let Some(item) = stream.next().await {
            match item.and_then(|env| self.ingestor.ingest(env.payload)) {
                Ok(reading) => {
                    report.ingested += 1;
                    report.last = Some(reading);
                }
                Err(e) if self.policy == FailurePolicy::SkipInvalid && e.is_record_level() => {
                    tracing::warn!(error = %e, "skipping rejected record");
                    report.rejected += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }
}
