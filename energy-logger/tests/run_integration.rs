use std::{fs, time::Duration};

use energy_client::{
    db::{consumption_queries, LogFilter, ReadingStore},
    domain::{RawDeviceReading, YearMonth},
};
use energy_logger::{
    config::{DeviceConfig, DeviceCredentials},
    pipeline::{Envelope, EnvelopeStream, FailurePolicy, Pipeline, PipelineError, Source},
    publish::SnapshotPublisher,
    render::MarkdownDashboard,
    sinks::{CsvFileStore, Ingestor},
    sources::TuyaHttpSource,
};
use time::macros::{date, datetime};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

struct StaticSource(Vec<RawDeviceReading>);

#[async_trait::async_trait]
impl Source<RawDeviceReading> for StaticSource {
    async fn stream(&self) -> EnvelopeStream<RawDeviceReading> {
        let items: Vec<Result<Envelope<RawDeviceReading>, PipelineError>> =
            self.0.iter().cloned().map(|r| Ok(Envelope::now(r))).collect();
        Box::pin(futures::stream::iter(items))
    }
}

fn sample(counter: f64, read_at: time::OffsetDateTime) -> RawDeviceReading {
    RawDeviceReading {
        value: Some(counter),
        unit_scale: 100.0,
        read_at,
    }
}

#[tokio::test]
async fn hourly_runs_build_store_and_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvFileStore::open(dir.path().join("data")).unwrap();

    let samples = vec![
        sample(50_000.0, datetime!(2024-01-30 22:00:00 UTC)),
        sample(50_400.0, datetime!(2024-01-31 23:00:00 UTC)),
        sample(50_500.0, datetime!(2024-02-01 00:00:00 UTC)),
        sample(50_600.0, datetime!(2024-02-01 12:00:00 UTC)),
        sample(51_000.0, datetime!(2024-02-02 12:00:00 UTC)),
    ];
    // One run per sample, as the scheduler would trigger them.
    for s in samples {
        let pipeline = Pipeline {
            source: StaticSource(vec![s]),
            ingestor: Ingestor::new(&store),
            policy: FailurePolicy::Abort,
        };
        assert_eq!(pipeline.run().await.unwrap().ingested, 1);
    }

    let feb = YearMonth::new(2024, 2).unwrap();
    let publisher = SnapshotPublisher::new(&store);
    let summary = publisher.summary(feb).unwrap();

    assert_eq!(summary.months_covered, 2);
    assert_eq!(summary.monthly_series()[0], ("2024-01".to_string(), 4.0));
    assert_eq!(summary.monthly_series()[1], ("2024-02".to_string(), 5.0));
    assert_eq!(summary.total_kwh, 9.0);
    // Feb 1st starts the month, Feb 2nd counts from Feb 1st's last reading.
    assert_eq!(
        summary.daily_series(),
        vec![("02-01".to_string(), 1.0), ("02-02".to_string(), 4.0)]
    );

    let month = store.read_monthly_summary(feb).unwrap();
    let feb1 = month.get(date!(2024 - 02 - 01)).unwrap();
    assert_eq!(feb1.reading_count, 2);
    assert_eq!(feb1.latest_value_kwh, 506.0);

    let dashboard = MarkdownDashboard::new(dir.path().join("data").join("README.md"));
    let path = publisher.render(&dashboard, feb).unwrap();
    let doc = fs::read_to_string(path).unwrap();
    assert!(doc.contains("**Latest Reading:** 510.0 kWh at 2024-02-02 12:00:00 UTC"));
    assert!(doc.contains("**Total Consumption:** 9.00 kWh"));
    assert!(doc.contains("**Monitoring Period:** 2 months"));
}

#[tokio::test]
async fn corrupt_log_degrades_aggregates_without_failing() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvFileStore::open(dir.path()).unwrap();
    let ingestor = Ingestor::new(&store);
    ingestor
        .ingest(sample(1_000.0, datetime!(2024-03-01 10:00:00 UTC)))
        .unwrap();
    ingestor
        .ingest(sample(1_500.0, datetime!(2024-03-01 11:00:00 UTC)))
        .unwrap();

    fs::write(
        store.daily_path(date!(2024 - 02 - 10)),
        "timestamp,date,time,forward_energy_total_kwh,hour,day_of_week,unix_timestamp\n\
         2024-02-10 10:00:00 UTC,2024-02-10,10:00:00,,10,Saturday,1707559200\n",
    )
    .unwrap();

    assert_eq!(store.list_daily_logs(LogFilter::All).unwrap().count(), 2);

    let monthly = consumption_queries::monthly_consumption(&store).unwrap();
    assert_eq!(monthly.len(), 1);
    assert_eq!(
        monthly
            .get(&YearMonth::new(2024, 3).unwrap())
            .map(|d| d.kwh()),
        Some(5.0)
    );

    let feb = consumption_queries::daily_consumption(&store, YearMonth::new(2024, 2).unwrap())
        .unwrap();
    assert!(feb.is_empty());
}

fn device_config(endpoint: String, timeout_secs: u64) -> (DeviceConfig, DeviceCredentials) {
    (
        DeviceConfig {
            endpoint,
            timeout_secs,
            ..DeviceConfig::default()
        },
        DeviceCredentials {
            access_id: "id".to_string(),
            access_key: "token".to_string(),
            device_id: "meter-1".to_string(),
        },
    )
}

/// Answers the first connection with a 200 carrying `body` as JSON.
async fn serve_once(body: &'static str) -> String {
    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\nconnection: close\r\ncontent-length: {}\r\n\r\n{body}",
        body.len()
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn device_source_reads_counter_over_http() {
    let endpoint =
        serve_once(r#"{"success":true,"result":[{"code":"forward_energy_total","value":1}]}"#)
            .await;
    let (device, creds) = device_config(endpoint, 5);

    let raw = TuyaHttpSource::new(&device, &creds).read_counter().await.unwrap();
    assert_eq!(raw.value, Some(1.0));
    assert_eq!(raw.unit_scale, 100.0);
}

#[tokio::test]
async fn stalled_device_times_out_as_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // Accept and hold the connection without answering.
        let held = listener.accept().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(held);
    });
    let (device, creds) = device_config(format!("http://{addr}"), 1);

    let err = TuyaHttpSource::new(&device, &creds)
        .read_counter()
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::DeviceUnavailable(_)));
}

#[tokio::test]
async fn device_failure_writes_nothing() {
    let endpoint = serve_once(r#"{"success":false,"msg":"sign invalid"}"#).await;
    let (device, creds) = device_config(endpoint, 5);
    let dir = tempfile::tempdir().unwrap();
    let store = CsvFileStore::open(dir.path()).unwrap();

    let pipeline = Pipeline {
        source: TuyaHttpSource::new(&device, &creds),
        ingestor: Ingestor::new(&store),
        policy: FailurePolicy::Abort,
    };
    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::DeviceProtocol(_)));
    assert_eq!(store.list_daily_logs(LogFilter::All).unwrap().count(), 0);
    assert!(store.latest().unwrap().is_none());
}
