use std::time::Duration;

use energy_client::domain::RawDeviceReading;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::{
    config::{DeviceConfig, DeviceCredentials},
    pipeline::{Envelope, EnvelopeStream, PipelineError, Source},
};

/// Device status client for a Tuya-style smart meter.
///
/// Sends the configured credentials as pre-issued `client_id` and
/// `access_token` headers; no request signing or token refresh.
#[derive(Clone)]
pub struct TuyaHttpSource {
    client: reqwest::Client,
    status_url: String,
    access_id: String,
    access_token: String,
    energy_code: String,
    unit_scale: f64,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    success: bool,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    result: Vec<StatusItem>,
}

#[derive(Debug, Deserialize)]
struct StatusItem {
    code: String,
    value: serde_json::Value,
}

/// Extracts the energy counter from a status response body.
fn parse_status(
    body: &str,
    energy_code: &str,
    unit_scale: f64,
    read_at: OffsetDateTime,
) -> Result<RawDeviceReading, PipelineError> {
    let status: StatusResponse = serde_json::from_str(body)
        .map_err(|e| PipelineError::DeviceProtocol(format!("malformed status response: {e}")))?;

    if !status.success {
        return Err(PipelineError::DeviceProtocol(format!(
            "device API error: {}",
            status.msg.as_deref().unwrap_or("unknown error")
        )));
    }

    debug!(
        codes = ?status.result.iter().map(|i| i.code.as_str()).collect::<Vec<_>>(),
        "available data points"
    );

    let item = status
        .result
        .iter()
        .find(|i| i.code == energy_code)
        .ok_or_else(|| {
            PipelineError::DeviceProtocol(format!("{energy_code} not found in device data"))
        })?;

    let value = match &item.value {
        serde_json::Value::Null => None,
        v => Some(v.as_f64().ok_or_else(|| {
            PipelineError::DeviceProtocol(format!("{energy_code} is not numeric: {v}"))
        })?),
    };

    Ok(RawDeviceReading {
        value,
        unit_scale,
        read_at,
    })
}

impl TuyaHttpSource {
    pub fn new(device: &DeviceConfig, credentials: &DeviceCredentials) -> Self {
        let status_url = format!(
            "{}/v1.0/devices/{}/status",
            device.endpoint.trim_end_matches('/'),
            credentials.device_id
        );

        Self {
            client: reqwest::Client::new(),
            status_url,
            access_id: credentials.access_id.clone(),
            access_token: credentials.access_key.clone(),
            energy_code: device.energy_code.clone(),
            unit_scale: device.unit_scale,
            timeout: Duration::from_secs(device.timeout_secs),
        }
    }

    /// One status call, bounded by the configured timeout.
    #[instrument(skip(self), fields(url = %self.status_url))]
    pub async fn read_counter(&self) -> Result<RawDeviceReading, PipelineError> {
        let body = tokio::time::timeout(self.timeout, self.fetch_status())
            .await
            .map_err(|_| {
                PipelineError::DeviceUnavailable(format!(
                    "no response within {}s",
                    self.timeout.as_secs()
                ))
            })??;

        let raw = parse_status(&body, &self.energy_code, self.unit_scale, OffsetDateTime::now_utc())?;
        tracing::info!(value = ?raw.value, unit_scale = raw.unit_scale, "counter read from device");
        Ok(raw)
    }

    async fn fetch_status(&self) -> Result<String, PipelineError> {
        let response = self
            .client
            .get(&self.status_url)
            .header("client_id", &self.access_id)
            .header("access_token", &self.access_token)
            .send()
            .await
            .map_err(|e| PipelineError::DeviceUnavailable(e.to_string()))?;

        debug!(status = %response.status(), "received status response");
        let response = response
            .error_for_status()
            .map_err(|e| PipelineError::DeviceUnavailable(e.to_string()))?;

        response
            .text()
            .await
            .map_err(|e| PipelineError::DeviceUnavailable(e.to_string()))
    }
}

#[async_trait::async_trait]
impl Source<RawDeviceReading> for TuyaHttpSource {
    async fn stream(&self) -> EnvelopeStream<RawDeviceReading> {
        let this = self.clone();
        let s = async_stream::try_stream! {
            let raw = this.read_counter().await.map_err(|e| {
                metrics::counter!("device_read_errors_total").increment(1);
                e
            })?;
            yield Envelope::now(raw);
        };

        Box::pin(s)
    }
}
