//! Common behavior shared by every Alpaca device: connection lifecycle,
//! standard metadata, and capability-gated reads.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::capabilities::{Capability, CapabilityMap};
use crate::io::HttpClient;
use crate::protocol::{bool_str, DeviceAddress, ProtocolAdapter};
use crate::AlpacaError;

const CONNECT_ATTEMPTS: u32 = 3;
const CONNECT_BACKOFF: Duration = Duration::from_millis(250);

/// Client-side view of the connection. The device's own idea of whether it
/// is connected is only learned by asking it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// One client per physical device. The typed device wrappers all embed one
/// of these and delegate the shared endpoints to it.
#[derive(Debug)]
pub struct DeviceClient {
    adapter: ProtocolAdapter,
    capabilities: CapabilityMap,
    state: RwLock<ConnectionState>,
}

impl DeviceClient {
    pub fn new(address: DeviceAddress, client_id: u32, http: Arc<dyn HttpClient>) -> Self {
        Self {
            adapter: ProtocolAdapter::new(address, client_id, http),
            capabilities: CapabilityMap::new(),
            state: RwLock::new(ConnectionState::Disconnected),
        }
    }

    pub fn address(&self) -> &DeviceAddress {
        self.adapter.address()
    }

    /// Our view of the connection, without touching the network
    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Ask the device whether it considers itself connected
    pub async fn is_connected(&self) -> crate::Result<bool> {
        self.adapter.get_value("connected").await
    }

    /// Connect and verify.
    ///
    /// Some servers acknowledge the write before the hardware is actually
    /// up, so success requires reading `connected` back as true. Both the
    /// write and the verification are retried together, with the delay
    /// doubling between rounds.
    pub async fn connect(&self) -> crate::Result<()> {
        if self.connection_state().await == ConnectionState::Connected {
            tracing::debug!("{} is already connected", self.address());
            return Ok(());
        }
        self.set_state(ConnectionState::Connecting).await;
        tracing::info!("Connecting to {}", self.address());

        let mut delay = CONNECT_BACKOFF;
        let mut last_error = None;
        for attempt in 1..=CONNECT_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }

            if let Err(e) = self
                .adapter
                .put("connected", &[("Connected", bool_str(true))])
                .await
            {
                tracing::debug!(
                    "Connect write to {} failed on attempt {}/{}: {}",
                    self.address(),
                    attempt,
                    CONNECT_ATTEMPTS,
                    e
                );
                last_error = Some(e);
                continue;
            }

            match self.is_connected().await {
                Ok(true) => {
                    self.set_state(ConnectionState::Connected).await;
                    tracing::info!("Connected to {}", self.address());
                    return Ok(());
                }
                Ok(false) => {
                    tracing::debug!(
                        "{} accepted the connect but still reports disconnected ({}/{})",
                        self.address(),
                        attempt,
                        CONNECT_ATTEMPTS
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        "Connect verification for {} failed on attempt {}/{}: {}",
                        self.address(),
                        attempt,
                        CONNECT_ATTEMPTS,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        self.set_state(ConnectionState::Disconnected).await;
        Err(last_error.unwrap_or_else(|| {
            AlpacaError::Transport(format!(
                "{} did not reach connected state after {} attempts",
                self.address(),
                CONNECT_ATTEMPTS
            ))
        }))
    }

    /// Disconnect, best effort. The device may already be gone, which is
    /// exactly when disconnects happen, so failures are logged rather than
    /// returned. Our own view always ends up Disconnected.
    pub async fn disconnect(&self) -> crate::Result<()> {
        match self
            .adapter
            .put("connected", &[("Connected", bool_str(false))])
            .await
        {
            Ok(()) => match self.is_connected().await {
                Ok(true) => {
                    tracing::warn!(
                        "{} still reports connected after disconnect",
                        self.address()
                    )
                }
                Ok(false) => tracing::info!("Disconnected from {}", self.address()),
                Err(e) => {
                    tracing::debug!(
                        "Disconnect verification for {} failed: {}",
                        self.address(),
                        e
                    )
                }
            },
            Err(e) => tracing::warn!("Disconnect from {} failed: {}", self.address(), e),
        }
        self.set_state(ConnectionState::Disconnected).await;
        self.capabilities.reset().await;
        Ok(())
    }

    pub async fn name(&self) -> crate::Result<String> {
        self.adapter.get_value("name").await
    }

    pub async fn description(&self) -> crate::Result<String> {
        self.adapter.get_value("description").await
    }

    pub async fn driver_info(&self) -> crate::Result<String> {
        self.adapter.get_value("driverinfo").await
    }

    pub async fn driver_version(&self) -> crate::Result<String> {
        self.adapter.get_value("driverversion").await
    }

    pub async fn interface_version(&self) -> crate::Result<i32> {
        self.adapter.get_value("interfaceversion").await
    }

    async fn set_state(&self, state: ConnectionState) {
        *self.state.write().await = state;
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> crate::Result<T> {
        self.adapter.get_value(endpoint).await
    }

    pub(crate) async fn get_with<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> crate::Result<T> {
        self.adapter.get_value_with(endpoint, params).await
    }

    pub(crate) async fn put(&self, endpoint: &str, params: &[(&str, &str)]) -> crate::Result<()> {
        self.adapter.put(endpoint, params).await
    }

    /// Read an endpoint the device may not implement.
    ///
    /// `Ok(None)` means the device told us it does not have this endpoint;
    /// that answer is cached so the question is asked at most once per
    /// connection. Transport problems are returned as errors and leave the
    /// capability undecided, otherwise a flaky network would permanently
    /// disable working endpoints.
    pub(crate) async fn try_get<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
    ) -> crate::Result<Option<T>> {
        if self.capabilities.get(endpoint).await == Capability::Unsupported {
            return Ok(None);
        }
        match self.adapter.get_value(endpoint).await {
            Ok(value) => {
                self.capabilities.record_supported(endpoint).await;
                Ok(Some(value))
            }
            Err(e) if e.indicates_unsupported() => {
                self.capabilities.record_unsupported(endpoint).await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
