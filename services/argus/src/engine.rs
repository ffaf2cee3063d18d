//! Engine: turns configuration into device clients and running pollers.

use std::sync::Arc;
use std::time::Duration;

use argus_alpaca::{
    CoverCalibratorClient, DeviceType, DomeClient, FocuserClient, HttpClient, ManagementClient,
    ObservingConditionsClient, ReqwestHttpClient, RotatorClient, TelescopeClient,
};
use tokio_util::sync::CancellationToken;

use crate::config::{Config, DeviceConfig};
use crate::poller::{self, DeviceHandle, PollerHandle};
use crate::state::StateRegistry;

/// A device the engine is polling
struct ManagedDevice {
    name: String,
    handle: DeviceHandle,
}

/// Owns the device clients and their poll tasks for the lifetime of the
/// service. `start` brings everything up, `shutdown` tears it down in
/// reverse order.
pub struct Engine {
    config: Config,
    http: Arc<dyn HttpClient>,
    client_id: u32,
    registry: StateRegistry,
    devices: Vec<ManagedDevice>,
    pollers: Vec<PollerHandle>,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self::with_http(config, Arc::new(ReqwestHttpClient::new()))
    }

    /// Build an engine over an injected transport
    pub fn with_http(config: Config, http: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http,
            // One ClientID per service process; devices use it to tell
            // concurrent clients apart in their own logs.
            client_id: std::process::id(),
            registry: StateRegistry::new(),
            devices: Vec::new(),
            pollers: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Live view of the latest published status per device
    pub fn registry(&self) -> StateRegistry {
        self.registry.clone()
    }

    /// The handle for a started device, for issuing commands to it
    pub fn device(&self, name: &str) -> Option<&DeviceHandle> {
        self.devices
            .iter()
            .find(|d| d.name == name)
            .map(|d| &d.handle)
    }

    /// Connect every enabled device and spawn its poll task. A device that
    /// cannot be resolved is skipped with a warning; a device that resolves
    /// but fails to connect is polled anyway, so its status stays visible.
    pub async fn start(&mut self) {
        let devices = self.config.devices.clone();
        for device_config in devices {
            if !device_config.enabled {
                tracing::info!("Device '{}' is disabled; not polling", device_config.name);
                continue;
            }
            let Some(device_number) = self.resolve_device_number(&device_config).await else {
                continue;
            };
            let handle = self.build_handle(&device_config, device_number);
            tracing::info!(
                "Connecting {} '{}' at {}",
                device_config.device_type,
                device_config.name,
                handle.device().address()
            );
            if let Err(e) = handle.device().connect().await {
                tracing::warn!("Failed to connect '{}': {}", device_config.name, e);
            }
            let (poller, rx) = poller::spawn(
                device_config.name.clone(),
                handle.clone(),
                Duration::from_secs(device_config.polling_interval_seconds),
                device_config.slow_poll_every,
                self.cancel.child_token(),
            );
            self.registry.register(rx);
            self.devices.push(ManagedDevice {
                name: device_config.name,
                handle,
            });
            self.pollers.push(poller);
        }
        if self.devices.is_empty() {
            tracing::warn!("No devices are being polled");
        }
    }

    /// Stop all poll tasks, then disconnect the devices
    pub async fn shutdown(mut self) {
        tracing::info!("Shutting down device polling");
        self.cancel.cancel();
        for poller in self.pollers.drain(..) {
            poller.stop().await;
        }
        for device in &self.devices {
            tracing::debug!("Disconnecting '{}'", device.name);
            if let Err(e) = device.handle.device().disconnect().await {
                tracing::warn!("Failed to disconnect '{}': {}", device.name, e);
            }
        }
    }

    async fn resolve_device_number(&self, device_config: &DeviceConfig) -> Option<u32> {
        if let Some(number) = device_config.device_number {
            return Some(number);
        }
        if !device_config.discover {
            return Some(0);
        }
        let management = ManagementClient::new(
            &device_config.host,
            device_config.port,
            Arc::clone(&self.http),
        );
        match management.find_first(device_config.device_type).await {
            Ok(Some(found)) => {
                tracing::info!(
                    "Discovered {} '{}' as device number {} on {}:{}",
                    device_config.device_type,
                    found.device_name,
                    found.device_number,
                    device_config.host,
                    device_config.port
                );
                Some(found.device_number)
            }
            Ok(None) => {
                tracing::warn!(
                    "No {} found on {}:{}; skipping '{}'",
                    device_config.device_type,
                    device_config.host,
                    device_config.port,
                    device_config.name
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    "Discovery for '{}' failed: {}; skipping",
                    device_config.name,
                    e
                );
                None
            }
        }
    }

    fn build_handle(&self, device_config: &DeviceConfig, device_number: u32) -> DeviceHandle {
        let http = Arc::clone(&self.http);
        let (host, port, id) = (
            device_config.host.as_str(),
            device_config.port,
            self.client_id,
        );
        match device_config.device_type {
            DeviceType::Telescope => DeviceHandle::Telescope(Arc::new(TelescopeClient::new(
                host,
                port,
                device_number,
                id,
                http,
            ))),
            DeviceType::Focuser => DeviceHandle::Focuser(Arc::new(FocuserClient::new(
                host,
                port,
                device_number,
                id,
                http,
            ))),
            DeviceType::Rotator => DeviceHandle::Rotator(Arc::new(RotatorClient::new(
                host,
                port,
                device_number,
                id,
                http,
            ))),
            DeviceType::Dome => DeviceHandle::Dome(Arc::new(DomeClient::new(
                host,
                port,
                device_number,
                id,
                http,
            ))),
            DeviceType::CoverCalibrator => {
                DeviceHandle::CoverCalibrator(Arc::new(CoverCalibratorClient::new(
                    host,
                    port,
                    device_number,
                    id,
                    http,
                )))
            }
            DeviceType::ObservingConditions => {
                DeviceHandle::ObservingConditions(Arc::new(ObservingConditionsClient::new(
                    host,
                    port,
                    device_number,
                    id,
                    http,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::testutil::{ScriptedHttp, Step};
    use argus_alpaca::ConnectionState;

    fn device_config(name: &str, device_type: DeviceType) -> DeviceConfig {
        DeviceConfig {
            device_type,
            name: name.to_string(),
            host: "localhost".to_string(),
            port: 11111,
            device_number: Some(0),
            discover: false,
            polling_interval_seconds: 1,
            slow_poll_every: 5,
            enabled: true,
        }
    }

    fn config_with(devices: Vec<DeviceConfig>) -> Config {
        Config {
            service: ServiceConfig::default(),
            devices,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn start_polls_enabled_devices_only() {
        let http = Arc::new(ScriptedHttp::new(vec![(
            "/connected?",
            vec![Step::Value("true")],
        )]));
        let mut disabled = device_config("Unused", DeviceType::Dome);
        disabled.enabled = false;
        let config = config_with(vec![
            device_config("Main focuser", DeviceType::Focuser),
            disabled,
        ]);

        let mut engine = Engine::with_http(config, http);
        engine.start().await;

        assert_eq!(engine.registry().len(), 1);
        assert!(engine.device("Main focuser").is_some());
        assert!(engine.device("Unused").is_none());

        let statuses = engine.registry().statuses();
        assert_eq!(statuses[0].name, "Main focuser");
        assert_eq!(statuses[0].device_type, DeviceType::Focuser);

        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn connect_failure_still_spawns_the_poller() {
        // Device never reports connected, so connect gives up after its
        // retries; the poller must run regardless.
        let http = Arc::new(ScriptedHttp::new(vec![(
            "/connected?",
            vec![Step::Value("false")],
        )]));
        let config = config_with(vec![device_config("Stubborn", DeviceType::Telescope)]);

        let mut engine = Engine::with_http(config, http);
        engine.start().await;

        assert_eq!(engine.registry().len(), 1);
        let handle = engine.device("Stubborn").cloned();
        assert_eq!(
            handle.as_ref().map(|h| h.device_type()),
            Some(DeviceType::Telescope)
        );

        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn discovery_resolves_the_device_number() {
        let http = Arc::new(ScriptedHttp::new(vec![
            (
                "/management/v1/configureddevices",
                vec![Step::Value(
                    r#"[
                        {"DeviceName": "Dome A", "DeviceType": "dome", "DeviceNumber": 2, "UniqueID": "a"},
                        {"DeviceName": "Big scope", "DeviceType": "Telescope", "DeviceNumber": 3, "UniqueID": "b"}
                    ]"#,
                )],
            ),
            ("/connected?", vec![Step::Value("true")]),
        ]));
        let mut device = device_config("Scope", DeviceType::Telescope);
        device.device_number = None;
        device.discover = true;
        let config = config_with(vec![device]);

        let mut engine = Engine::with_http(config, http);
        engine.start().await;

        let address = engine
            .device("Scope")
            .map(|h| h.device().address().to_string());
        assert_eq!(address.as_deref(), Some("localhost:11111/telescope/3"));

        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_discovery_skips_the_device() {
        // No management endpoint scripted: every discovery attempt 404s
        let http = Arc::new(ScriptedHttp::new(vec![]));
        let mut device = device_config("Ghost", DeviceType::Rotator);
        device.device_number = None;
        device.discover = true;
        let config = config_with(vec![device]);

        let mut engine = Engine::with_http(config, http);
        engine.start().await;

        assert_eq!(engine.registry().len(), 0);
        assert!(engine.device("Ghost").is_none());

        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unnumbered_device_without_discovery_defaults_to_zero() {
        let http = Arc::new(ScriptedHttp::new(vec![(
            "/connected?",
            vec![Step::Value("true")],
        )]));
        let mut device = device_config("First cover", DeviceType::CoverCalibrator);
        device.device_number = None;
        let config = config_with(vec![device]);

        let mut engine = Engine::with_http(config, http);
        engine.start().await;

        let address = engine
            .device("First cover")
            .map(|h| h.device().address().to_string());
        assert_eq!(
            address.as_deref(),
            Some("localhost:11111/covercalibrator/0")
        );

        engine.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_disconnects_every_device() {
        let http = Arc::new(ScriptedHttp::new(vec![(
            "/connected?",
            vec![Step::Value("true")],
        )]));
        let config = config_with(vec![device_config("Main focuser", DeviceType::Focuser)]);

        let mut engine = Engine::with_http(config, Arc::clone(&http) as Arc<dyn HttpClient>);
        engine.start().await;
        {
            let handle = engine.device("Main focuser").cloned();
            assert_eq!(
                handle.as_ref().map(|h| h.device_type()),
                Some(DeviceType::Focuser)
            );
        }
        engine.shutdown().await;

        let puts = http.puts();
        let disconnect_sent = puts.iter().any(|(url, params)| {
            url.contains("/focuser/0/connected")
                && params
                    .iter()
                    .any(|(k, v)| k == "Connected" && v == "false")
        });
        assert!(disconnect_sent, "no disconnect PUT observed: {puts:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn connected_state_is_published_after_start() {
        let http = Arc::new(ScriptedHttp::new(vec![(
            "/connected?",
            vec![Step::Value("true")],
        )]));
        let config = config_with(vec![device_config("Main focuser", DeviceType::Focuser)]);

        let mut engine = Engine::with_http(config, http);
        engine.start().await;

        // The first publish races start() returning; give the poll task a
        // few ticks to land it.
        let mut connection = ConnectionState::Disconnected;
        for _ in 0..10 {
            connection = engine.registry().statuses()[0].connection;
            if connection == ConnectionState::Connected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(connection, ConnectionState::Connected);

        engine.shutdown().await;
    }
}
