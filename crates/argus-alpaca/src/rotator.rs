//! Rotator client: sky angle, mechanical angle, and moves

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::device::DeviceClient;
use crate::io::HttpClient;
use crate::protocol::{bool_str, DeviceAddress, DeviceType};
use crate::validate;
use crate::AlpacaError;

/// Client for one Alpaca rotator device
#[derive(Debug)]
pub struct RotatorClient {
    device: DeviceClient,
    can_reverse: RwLock<Option<bool>>,
}

impl RotatorClient {
    pub fn new(
        host: &str,
        port: u16,
        device_number: u32,
        client_id: u32,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        let address = DeviceAddress::new(host, port, DeviceType::Rotator, device_number);
        Self {
            device: DeviceClient::new(address, client_id, http),
            can_reverse: RwLock::new(None),
        }
    }

    /// Shared device operations: connect, disconnect, metadata
    pub fn device(&self) -> &DeviceClient {
        &self.device
    }

    /// Sky position angle in degrees
    pub async fn position(&self) -> crate::Result<f64> {
        self.device.get("position").await
    }

    /// Raw mechanical angle in degrees, ignoring any sync offset
    pub async fn mechanical_position(&self) -> crate::Result<f64> {
        self.device.get("mechanicalposition").await
    }

    pub async fn target_position(&self) -> crate::Result<f64> {
        self.device.get("targetposition").await
    }

    pub async fn is_moving(&self) -> crate::Result<bool> {
        self.device.get("ismoving").await
    }

    pub async fn can_reverse(&self) -> crate::Result<bool> {
        let value: bool = self.device.get("canreverse").await?;
        *self.can_reverse.write().await = Some(value);
        Ok(value)
    }

    pub async fn reversed(&self) -> crate::Result<bool> {
        self.device.get("reverse").await
    }

    /// Set the direction sense. Refused when the rotator reports it cannot
    /// reverse; `canreverse` is fetched first if it has not been read yet.
    pub async fn set_reverse(&self, reversed: bool) -> crate::Result<()> {
        let supported = match *self.can_reverse.read().await {
            Some(value) => value,
            None => self.can_reverse().await?,
        };
        if !supported {
            return Err(AlpacaError::Validation(
                "rotator does not support reverse".to_string(),
            ));
        }
        self.device
            .put("reverse", &[("Reverse", bool_str(reversed))])
            .await
    }

    /// Step size in degrees
    pub async fn step_size(&self) -> crate::Result<f64> {
        self.device.get("stepsize").await
    }

    /// Move to an absolute sky angle in `[0, 360)` degrees
    pub async fn move_absolute(&self, position: f64) -> crate::Result<()> {
        validate::rotation_angle("position", position)?;
        self.device
            .put("moveabsolute", &[("Position", &position.to_string())])
            .await
    }

    /// Move by a relative offset in degrees
    pub async fn move_relative(&self, offset: f64) -> crate::Result<()> {
        if !offset.is_finite() {
            return Err(AlpacaError::Validation("offset must be finite".to_string()));
        }
        self.device
            .put("move", &[("Position", &offset.to_string())])
            .await
    }

    /// Move to an absolute mechanical angle in `[0, 360)` degrees
    pub async fn move_mechanical(&self, position: f64) -> crate::Result<()> {
        validate::rotation_angle("mechanical position", position)?;
        self.device
            .put("movemechanical", &[("Position", &position.to_string())])
            .await
    }

    /// Calibrate the sky angle to the given value without moving
    pub async fn sync(&self, position: f64) -> crate::Result<()> {
        validate::rotation_angle("sync position", position)?;
        self.device
            .put("sync", &[("Position", &position.to_string())])
            .await
    }

    pub async fn halt(&self) -> crate::Result<()> {
        self.device.put("halt", &[]).await
    }
}
