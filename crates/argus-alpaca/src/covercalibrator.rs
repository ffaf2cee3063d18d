//! Cover calibrator client: dust cover motion and flat panel control

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::device::DeviceClient;
use crate::io::HttpClient;
use crate::protocol::{DeviceAddress, DeviceType};
use crate::validate;
use crate::AlpacaError;

/// Dust cover position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoverState {
    NotPresent,
    Closed,
    Moving,
    Open,
    Unknown,
}

impl From<i32> for CoverState {
    fn from(code: i32) -> Self {
        match code {
            0 => CoverState::NotPresent,
            1 => CoverState::Closed,
            2 => CoverState::Moving,
            3 => CoverState::Open,
            _ => CoverState::Unknown,
        }
    }
}

impl std::fmt::Display for CoverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoverState::NotPresent => write!(f, "not present"),
            CoverState::Closed => write!(f, "closed"),
            CoverState::Moving => write!(f, "moving"),
            CoverState::Open => write!(f, "open"),
            CoverState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Flat panel state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CalibratorState {
    NotPresent,
    Off,
    Ready,
    CalibrationRequired,
    On,
    Unknown,
}

impl From<i32> for CalibratorState {
    fn from(code: i32) -> Self {
        match code {
            0 => CalibratorState::NotPresent,
            1 => CalibratorState::Off,
            2 => CalibratorState::Ready,
            3 => CalibratorState::CalibrationRequired,
            4 => CalibratorState::On,
            _ => CalibratorState::Unknown,
        }
    }
}

impl std::fmt::Display for CalibratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibratorState::NotPresent => write!(f, "not present"),
            CalibratorState::Off => write!(f, "off"),
            CalibratorState::Ready => write!(f, "ready"),
            CalibratorState::CalibrationRequired => write!(f, "calibration required"),
            CalibratorState::On => write!(f, "on"),
            CalibratorState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Client for one Alpaca cover calibrator device.
///
/// The `covermoving` and `calibratorchanging` endpoints only exist on
/// newer interface versions, so both predicates fall back to deriving the
/// answer from the state enums when the device does not implement them.
#[derive(Debug)]
pub struct CoverCalibratorClient {
    device: DeviceClient,
    max_brightness: RwLock<Option<i32>>,
}

impl CoverCalibratorClient {
    pub fn new(
        host: &str,
        port: u16,
        device_number: u32,
        client_id: u32,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        let address = DeviceAddress::new(host, port, DeviceType::CoverCalibrator, device_number);
        Self {
            device: DeviceClient::new(address, client_id, http),
            max_brightness: RwLock::new(None),
        }
    }

    /// Shared device operations: connect, disconnect, metadata
    pub fn device(&self) -> &DeviceClient {
        &self.device
    }

    pub async fn cover_state(&self) -> crate::Result<CoverState> {
        let code: i32 = self.device.get("coverstate").await?;
        Ok(CoverState::from(code))
    }

    pub async fn calibrator_state(&self) -> crate::Result<CalibratorState> {
        let code: i32 = self.device.get("calibratorstate").await?;
        Ok(CalibratorState::from(code))
    }

    /// Current panel brightness in device units
    pub async fn brightness(&self) -> crate::Result<i32> {
        self.device.get("brightness").await
    }

    /// Maximum panel brightness. The value is cached for `calibrator_on`
    /// validation.
    pub async fn max_brightness(&self) -> crate::Result<i32> {
        let value: i32 = self.device.get("maxbrightness").await?;
        *self.max_brightness.write().await = Some(value);
        Ok(value)
    }

    /// True while the cover is in motion.
    ///
    /// Prefers the dedicated `covermoving` endpoint and derives the answer
    /// from `coverstate` on devices that do not implement it.
    pub async fn cover_moving(&self) -> crate::Result<bool> {
        match self.device.try_get("covermoving").await? {
            Some(moving) => Ok(moving),
            None => Ok(self.cover_state().await? == CoverState::Moving),
        }
    }

    /// True while the calibrator is warming up or settling.
    ///
    /// Prefers the dedicated `calibratorchanging` endpoint and derives the
    /// answer from `calibratorstate` on devices that do not implement it.
    pub async fn calibrator_changing(&self) -> crate::Result<bool> {
        match self.device.try_get("calibratorchanging").await? {
            Some(changing) => Ok(changing),
            None => Ok(self.calibrator_state().await? == CalibratorState::CalibrationRequired),
        }
    }

    /// Switch the panel on. Negative brightness is always refused; values
    /// beyond `maxbrightness` are refused once the limit has been read.
    pub async fn calibrator_on(&self, brightness: i32) -> crate::Result<()> {
        validate::brightness(brightness)?;
        if let Some(max) = *self.max_brightness.read().await {
            if brightness > max {
                return Err(AlpacaError::Validation(format!(
                    "brightness {brightness} beyond maxbrightness {max}"
                )));
            }
        }
        self.device
            .put("calibratoron", &[("Brightness", &brightness.to_string())])
            .await
    }

    pub async fn calibrator_off(&self) -> crate::Result<()> {
        self.device.put("calibratoroff", &[]).await
    }

    pub async fn open_cover(&self) -> crate::Result<()> {
        self.device.put("opencover", &[]).await
    }

    pub async fn close_cover(&self) -> crate::Result<()> {
        self.device.put("closecover", &[]).await
    }

    pub async fn halt_cover(&self) -> crate::Result<()> {
        self.device.put("haltcover", &[]).await
    }
}
