//! Alpaca wire protocol: URLs, transaction IDs, envelope decoding

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::io::{HttpClient, HttpResponse};
use crate::AlpacaError;

/// The six device categories Argus monitors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Telescope,
    Focuser,
    Rotator,
    Dome,
    CoverCalibrator,
    ObservingConditions,
}

impl DeviceType {
    /// Wire name, as it appears in URL paths. Always lowercase; Alpaca
    /// servers reject mixed-case paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Telescope => "telescope",
            DeviceType::Focuser => "focuser",
            DeviceType::Rotator => "rotator",
            DeviceType::Dome => "dome",
            DeviceType::CoverCalibrator => "covercalibrator",
            DeviceType::ObservingConditions => "observingconditions",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Address of one device on one Alpaca server. Immutable after construction.
#[derive(Debug, Clone)]
pub struct DeviceAddress {
    pub host: String,
    pub port: u16,
    pub api_version: u8,
    pub device_type: DeviceType,
    pub device_number: u32,
}

impl DeviceAddress {
    pub fn new(host: &str, port: u16, device_type: DeviceType, device_number: u32) -> Self {
        Self {
            host: host.to_string(),
            port,
            api_version: 1,
            device_type,
            device_number,
        }
    }

    /// Full URL for a device endpoint, with the path lowercased
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "http://{}:{}/api/v{}/{}/{}/{}",
            self.host,
            self.port,
            self.api_version,
            self.device_type.as_str(),
            self.device_number,
            endpoint.to_ascii_lowercase()
        )
    }
}

impl std::fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}/{}/{}",
            self.host, self.port, self.device_type, self.device_number
        )
    }
}

/// The standard Alpaca JSON response envelope.
///
/// Every field defaults so that command responses, which often carry only
/// the error pair, still decode. `Value` absence is checked by the caller.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AlpacaResponse<T> {
    #[serde(default)]
    pub value: Option<T>,
    #[serde(rename = "ClientTransactionID", default)]
    pub client_transaction_id: u32,
    #[serde(rename = "ServerTransactionID", default)]
    pub server_transaction_id: u32,
    #[serde(default)]
    pub error_number: i32,
    #[serde(default)]
    pub error_message: String,
}

/// Serialize a boolean the way the protocol requires: the literal strings
/// "true" and "false", never 0/1.
pub fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// One adapter per device: owns the session identity and the HTTP seam.
///
/// The transaction counter is adapter-owned; two adapters never share a
/// sequence.
pub struct ProtocolAdapter {
    address: DeviceAddress,
    client_id: u32,
    transaction_id: AtomicU32,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for ProtocolAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolAdapter")
            .field("address", &self.address)
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl ProtocolAdapter {
    pub fn new(address: DeviceAddress, client_id: u32, http: Arc<dyn HttpClient>) -> Self {
        Self {
            address,
            client_id,
            transaction_id: AtomicU32::new(0),
            http,
        }
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    fn next_transaction_id(&self) -> u32 {
        self.transaction_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Read one property and unwrap its envelope `Value`
    pub async fn get_value<T: DeserializeOwned>(&self, endpoint: &str) -> crate::Result<T> {
        self.get_value_with(endpoint, &[]).await
    }

    /// Read one property with extra query parameters (e.g. `SensorName`)
    pub async fn get_value_with<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> crate::Result<T> {
        let transaction_id = self.next_transaction_id();
        let mut url = format!(
            "{}?ClientID={}&ClientTransactionID={}",
            self.address.endpoint_url(endpoint),
            self.client_id,
            transaction_id
        );
        for (key, value) in params {
            url.push_str(&format!("&{}={}", key, value));
        }

        tracing::debug!("GET {} txn={}", endpoint, transaction_id);
        let response = self.http.get(&url).await?;
        let envelope = decode::<T>(&response)?;
        envelope.value.ok_or_else(|| {
            AlpacaError::MalformedResponse(format!("envelope for '{}' has no Value", endpoint))
        })
    }

    /// Execute a command or property write.
    ///
    /// Vendor servers disagree about where PUT parameters belong. The first
    /// encoding puts the session identity in the query string and the
    /// payload in the form body; if that fails for any reason, one retry
    /// merges everything into the form body. When both fail, the first
    /// attempt's error is surfaced.
    pub async fn put(&self, endpoint: &str, params: &[(&str, &str)]) -> crate::Result<()> {
        let transaction_id = self.next_transaction_id();
        let client_id = self.client_id.to_string();
        let transaction = transaction_id.to_string();
        let url = self.address.endpoint_url(endpoint);

        tracing::debug!("PUT {} txn={}", endpoint, transaction_id);
        let query_url = format!(
            "{}?ClientID={}&ClientTransactionID={}",
            url, client_id, transaction
        );
        let first_error = match self.execute_put(&query_url, params).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        tracing::debug!(
            "PUT {} first encoding failed ({}), retrying with merged form body",
            endpoint,
            first_error
        );
        let mut merged: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 2);
        merged.push(("ClientID", client_id.as_str()));
        merged.push(("ClientTransactionID", transaction.as_str()));
        merged.extend_from_slice(params);

        match self.execute_put(&url, &merged).await {
            Ok(()) => Ok(()),
            Err(_) => Err(first_error),
        }
    }

    async fn execute_put(&self, url: &str, params: &[(&str, &str)]) -> crate::Result<()> {
        let response = self.http.put_form(url, params).await?;
        decode::<serde_json::Value>(&response).map(|_| ())
    }
}

/// Decode checks run in a fixed order: transport status, then JSON shape,
/// then the device's own error report.
pub(crate) fn decode<T: DeserializeOwned>(
    response: &HttpResponse,
) -> crate::Result<AlpacaResponse<T>> {
    if !(200..300).contains(&response.status) {
        return Err(AlpacaError::HttpStatus {
            status: response.status,
            body: excerpt(&response.body),
        });
    }

    let envelope: AlpacaResponse<T> = serde_json::from_str(&response.body)
        .map_err(|e| AlpacaError::MalformedResponse(e.to_string()))?;

    if envelope.error_number != 0 {
        return Err(AlpacaError::DeviceError {
            code: envelope.error_number,
            message: envelope.error_message,
        });
    }

    Ok(envelope)
}

fn excerpt(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}
