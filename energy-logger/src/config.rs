use serde::Deserialize;
use std::{fs, io::ErrorKind, path::PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub endpoint: String,
    /// Status data point carrying the cumulative counter.
    pub energy_code: String,
    /// Divisor turning device units into kWh.
    pub unit_scale: f64,
    pub timeout_secs: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openapi.tuyaeu.com".to_string(),
            energy_code: "forward_energy_total".to_string(),
            unit_scale: 100.0,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeviceCredentials {
    pub access_id: String,
    pub access_key: String,
    pub device_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub device: DeviceConfig,
    pub storage: StorageConfig,
    #[serde(skip)]
    credentials: Option<DeviceCredentials>,
    #[serde(skip)]
    missing_credentials: Vec<&'static str>,
}

const CREDENTIAL_VARS: [&str; 3] = ["TUYA_ACCESS_ID", "TUYA_ACCESS_KEY", "TUYA_DEVICE_ID"];

impl AppConfig {
    /// Reads `$ENERGY_LOGGER_CONFIG` (default `energy-logger.toml`; a missing
    /// file means defaults), then applies environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path =
            env::var("ENERGY_LOGGER_CONFIG").unwrap_or_else(|_| "energy-logger.toml".to_string());
        let mut cfg = match fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml_str(&contents)
                .map_err(|e| anyhow::anyhow!("invalid config file {path}: {e}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path, "no config file, using defaults");
                Self::default()
            }
            Err(e) => return Err(anyhow::anyhow!("failed to read config file {path}: {e}")),
        };

        cfg.apply_env(|key| env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies environment overrides through `lookup`; empty values count as
    /// unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = get("TUYA_API_ENDPOINT") {
            self.device.endpoint = endpoint;
        }
        if let Some(dir) = get("ENERGY_LOGGER_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        let [access_id, access_key, device_id] = CREDENTIAL_VARS.map(|key| get(key));
        self.missing_credentials = CREDENTIAL_VARS
            .iter()
            .zip([&access_id, &access_key, &device_id])
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| *k)
            .collect();

        self.credentials = match (access_id, access_key, device_id) {
            (Some(access_id), Some(access_key), Some(device_id)) => Some(DeviceCredentials {
                access_id,
                access_key,
                device_id,
            }),
            _ => None,
        };
    }

    /// Device credentials, or an error naming every missing variable.
    pub fn credentials(&self) -> anyhow::Result<&DeviceCredentials> {
        match &self.credentials {
            Some(creds) => Ok(creds),
            None => {
                let missing = if self.missing_credentials.is_empty() {
                    CREDENTIAL_VARS.to_vec()
                } else {
                    self.missing_credentials.clone()
                };
                anyhow::bail!("missing required environment variables: {}", missing.join(", "))
            }
        }
    }

    pub fn dashboard_path(&self) -> PathBuf {
        self.storage.data_dir.join("README.md")
    }
}
