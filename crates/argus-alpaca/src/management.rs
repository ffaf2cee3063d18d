//! Alpaca management API: server description and device discovery

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::io::HttpClient;
use crate::protocol::{decode, DeviceType};
use crate::AlpacaError;

const DISCOVERY_ATTEMPTS: u32 = 3;
const DISCOVERY_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Server self-description from `/management/v1/description`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerDescription {
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub manufacturer_version: String,
    #[serde(default)]
    pub location: String,
}

/// One device entry from `/management/v1/configureddevices`.
///
/// `device_type` is kept as the raw wire string; servers are inconsistent
/// about its capitalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfiguredDevice {
    pub device_name: String,
    pub device_type: String,
    pub device_number: u32,
    #[serde(rename = "UniqueID", default)]
    pub unique_id: String,
}

/// Client for one Alpaca server's management endpoints
pub struct ManagementClient {
    host: String,
    port: u16,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for ManagementClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementClient")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl ManagementClient {
    pub fn new(host: &str, port: u16, http: Arc<dyn HttpClient>) -> Self {
        Self {
            host: host.to_string(),
            port,
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}:{}/management/{}", self.host, self.port, path)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> crate::Result<T> {
        let response = self.http.get(&self.url(path)).await?;
        let envelope = decode::<T>(&response)?;
        envelope.value.ok_or_else(|| {
            AlpacaError::MalformedResponse(format!(
                "management envelope for '{path}' has no Value"
            ))
        })
    }

    /// Management API versions the server supports. Servers that predate
    /// the endpoint get assumed at version 1.
    pub async fn api_versions(&self) -> Vec<u32> {
        match self.fetch("apiversions").await {
            Ok(versions) => versions,
            Err(e) => {
                tracing::warn!(
                    "Could not read API versions from {}:{} ({}), assuming [1]",
                    self.host,
                    self.port,
                    e
                );
                vec![1]
            }
        }
    }

    pub async fn description(&self) -> crate::Result<ServerDescription> {
        self.fetch("v1/description").await
    }

    /// Every device the server exposes, regardless of type
    pub async fn configured_devices(&self) -> crate::Result<Vec<ConfiguredDevice>> {
        self.fetch("v1/configureddevices").await
    }

    /// All configured devices of one type. Servers enumerate their drivers
    /// lazily at startup, so failed reads are retried a few times before
    /// giving up.
    pub async fn find_devices(
        &self,
        device_type: DeviceType,
    ) -> crate::Result<Vec<ConfiguredDevice>> {
        let mut last_error = None;
        for attempt in 1..=DISCOVERY_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(DISCOVERY_RETRY_DELAY).await;
            }
            match self.configured_devices().await {
                Ok(devices) => {
                    return Ok(devices
                        .into_iter()
                        .filter(|d| d.device_type.eq_ignore_ascii_case(device_type.as_str()))
                        .collect());
                }
                Err(e) => {
                    tracing::debug!(
                        "Device discovery on {}:{} failed ({}/{}): {}",
                        self.host,
                        self.port,
                        attempt,
                        DISCOVERY_ATTEMPTS,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            AlpacaError::Transport(format!(
                "device discovery on {}:{} failed",
                self.host, self.port
            ))
        }))
    }

    /// First configured device of one type, in server order
    pub async fn find_first(
        &self,
        device_type: DeviceType,
    ) -> crate::Result<Option<ConfiguredDevice>> {
        Ok(self.find_devices(device_type).await?.into_iter().next())
    }
}
