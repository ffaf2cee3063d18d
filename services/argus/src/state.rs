//! Published device state.
//!
//! Snapshots are plain data: every field is optional so a property that
//! could not be read is representable without inventing a value. The poll
//! tasks publish whole `DeviceStatus` values over watch channels; readers
//! always see a complete snapshot from a single poll cycle.

use argus_alpaca::{
    CalibratorState, ConnectionState, CoverState, DeviceType, EquatorialSystem, ShutterState,
    TrackingRate,
};
use serde::Serialize;
use tokio::sync::watch;

/// Milliseconds since the Unix epoch
pub(crate) fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelescopeSnapshot {
    pub right_ascension: Option<f64>,
    pub declination: Option<f64>,
    pub altitude: Option<f64>,
    pub azimuth: Option<f64>,
    pub sidereal_time: Option<f64>,
    pub tracking: Option<bool>,
    pub tracking_rate: Option<TrackingRate>,
    pub slewing: Option<bool>,
    pub at_park: Option<bool>,
    pub at_home: Option<bool>,
    pub pulse_guiding: Option<bool>,
    pub equatorial_system: Option<EquatorialSystem>,
    pub site_latitude: Option<f64>,
    pub site_longitude: Option<f64>,
    pub site_elevation: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FocuserSnapshot {
    pub position: Option<i32>,
    pub moving: Option<bool>,
    pub temperature: Option<f64>,
    pub temp_comp: Option<bool>,
    pub max_step: Option<i32>,
    pub step_size: Option<f64>,
    pub absolute: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RotatorSnapshot {
    pub position: Option<f64>,
    pub mechanical_position: Option<f64>,
    pub target_position: Option<f64>,
    pub moving: Option<bool>,
    pub reversed: Option<bool>,
    pub can_reverse: Option<bool>,
    pub step_size: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomeSnapshot {
    pub azimuth: Option<f64>,
    pub altitude: Option<f64>,
    pub shutter: Option<ShutterState>,
    pub slewing: Option<bool>,
    pub at_park: Option<bool>,
    pub at_home: Option<bool>,
    pub slaved: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverCalibratorSnapshot {
    pub cover_state: Option<CoverState>,
    pub calibrator_state: Option<CalibratorState>,
    pub cover_moving: Option<bool>,
    pub calibrator_changing: Option<bool>,
    pub brightness: Option<i32>,
    pub max_brightness: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeatherSnapshot {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub dew_point: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub wind_gust: Option<f64>,
    pub rain_rate: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub sky_brightness: Option<f64>,
    pub sky_temperature: Option<f64>,
    pub sky_quality: Option<f64>,
    pub star_fwhm: Option<f64>,
    pub average_period: Option<f64>,
}

/// Class-specific portion of a device status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DeviceSnapshot {
    Telescope(TelescopeSnapshot),
    Focuser(FocuserSnapshot),
    Rotator(RotatorSnapshot),
    Dome(DomeSnapshot),
    CoverCalibrator(CoverCalibratorSnapshot),
    ObservingConditions(WeatherSnapshot),
}

/// Everything the status API reports about one device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceStatus {
    pub name: String,
    pub device_type: DeviceType,
    pub connection: ConnectionState,
    /// Consecutive poll cycles in which every read failed at transport level
    pub consecutive_failures: u32,
    pub updated_at_ms: u64,
    pub snapshot: DeviceSnapshot,
}

/// Read side of every device's watch channel, shared with the status API
#[derive(Debug, Clone, Default)]
pub struct StateRegistry {
    receivers: Vec<watch::Receiver<DeviceStatus>>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, receiver: watch::Receiver<DeviceStatus>) {
        self.receivers.push(receiver);
    }

    /// Current status of every registered device, in registration order
    pub fn statuses(&self) -> Vec<DeviceStatus> {
        self.receivers.iter().map(|r| r.borrow().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }
}
