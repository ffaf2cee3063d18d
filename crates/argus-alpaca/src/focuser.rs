//! Focuser client: position, temperature, and moves

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::device::DeviceClient;
use crate::io::HttpClient;
use crate::protocol::{bool_str, DeviceAddress, DeviceType};
use crate::validate;
use crate::AlpacaError;

/// Client for one Alpaca focuser device.
///
/// The travel limit is remembered from the last `max_step` read so that
/// out-of-range moves can be refused locally once it is known.
#[derive(Debug)]
pub struct FocuserClient {
    device: DeviceClient,
    max_step: RwLock<Option<i32>>,
}

impl FocuserClient {
    pub fn new(
        host: &str,
        port: u16,
        device_number: u32,
        client_id: u32,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        let address = DeviceAddress::new(host, port, DeviceType::Focuser, device_number);
        Self {
            device: DeviceClient::new(address, client_id, http),
            max_step: RwLock::new(None),
        }
    }

    /// Shared device operations: connect, disconnect, metadata
    pub fn device(&self) -> &DeviceClient {
        &self.device
    }

    /// Current position in steps
    pub async fn position(&self) -> crate::Result<i32> {
        self.device.get("position").await
    }

    pub async fn is_moving(&self) -> crate::Result<bool> {
        self.device.get("ismoving").await
    }

    /// Maximum step position. The value is cached for move validation.
    pub async fn max_step(&self) -> crate::Result<i32> {
        let value: i32 = self.device.get("maxstep").await?;
        *self.max_step.write().await = Some(value);
        Ok(value)
    }

    /// Step size in microns
    pub async fn step_size(&self) -> crate::Result<f64> {
        self.device.get("stepsize").await
    }

    /// Ambient temperature at the focuser in degrees Celsius
    pub async fn temperature(&self) -> crate::Result<f64> {
        self.device.get("temperature").await
    }

    /// True when the focuser positions absolutely rather than by offset
    pub async fn absolute(&self) -> crate::Result<bool> {
        self.device.get("absolute").await
    }

    pub async fn temp_comp_available(&self) -> crate::Result<bool> {
        self.device.get("tempcompavailable").await
    }

    pub async fn temp_comp(&self) -> crate::Result<bool> {
        self.device.get("tempcomp").await
    }

    pub async fn set_temp_comp(&self, enabled: bool) -> crate::Result<()> {
        self.device
            .put("tempcomp", &[("TempComp", bool_str(enabled))])
            .await
    }

    /// Move to an absolute position. Negative targets are always refused;
    /// targets beyond `maxstep` are refused once the limit has been read.
    pub async fn move_to(&self, position: i32) -> crate::Result<()> {
        validate::focuser_position(position)?;
        if let Some(max) = *self.max_step.read().await {
            if position > max {
                return Err(AlpacaError::Validation(format!(
                    "focuser position {position} beyond maxstep {max}"
                )));
            }
        }
        self.device
            .put("move", &[("Position", &position.to_string())])
            .await
    }

    pub async fn halt(&self) -> crate::Result<()> {
        self.device.put("halt", &[]).await
    }
}
