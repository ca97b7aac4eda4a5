use energy_client::domain::{RawDeviceReading, Reading};
use time::{macros::datetime, OffsetDateTime};

use crate::pipeline::PipelineError;

/// Pure validation and unit conversion of a device sample.
///
/// Rules:
/// - value must be present and finite.
/// - unit_scale must be finite and positive.
/// - kWh (value / unit_scale) must be non-negative.
/// - read_at must be within a broad sanity window [2000-01-01, 2100-01-01].
///
/// The timestamp is normalized to UTC at whole-second resolution, the
/// resolution the store keeps.
pub fn validate_raw_reading(raw: &RawDeviceReading) -> Result<Reading, PipelineError> {
    let value = raw
        .value
        .ok_or_else(|| PipelineError::Validation("counter value is missing".to_string()))?;

    if !value.is_finite() {
        return Err(PipelineError::Validation(format!(
            "counter value {value} is not a finite number"
        )));
    }

    if !raw.unit_scale.is_finite() || raw.unit_scale <= 0.0 {
        return Err(PipelineError::Validation(format!(
            "unit scale {} must be positive",
            raw.unit_scale
        )));
    }

    let kwh = value / raw.unit_scale;
    if kwh < 0.0 {
        return Err(PipelineError::Validation("kwh must be non-negative".to_string()));
    }

    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);

    if raw.read_at < min_ts || raw.read_at > max_ts {
        return Err(PipelineError::Validation("timestamp out of allowed range".to_string()));
    }

    let timestamp = OffsetDateTime::from_unix_timestamp(raw.read_at.unix_timestamp())
        .map_err(|e| PipelineError::Validation(format!("invalid timestamp: {e}")))?;

    Ok(Reading::new(timestamp, kwh))
}
