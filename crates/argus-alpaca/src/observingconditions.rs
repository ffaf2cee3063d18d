//! Weather station client.
//!
//! Stations rarely carry the full sensor suite, so every sensor read goes
//! through the capability cache and reports `None` once the device has
//! said a sensor is not fitted.

use std::sync::Arc;

use crate::device::DeviceClient;
use crate::io::HttpClient;
use crate::protocol::{DeviceAddress, DeviceType};
use crate::validate;

/// Client for one Alpaca observing conditions device
#[derive(Debug)]
pub struct ObservingConditionsClient {
    device: DeviceClient,
}

impl ObservingConditionsClient {
    pub fn new(
        host: &str,
        port: u16,
        device_number: u32,
        client_id: u32,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        let address =
            DeviceAddress::new(host, port, DeviceType::ObservingConditions, device_number);
        Self {
            device: DeviceClient::new(address, client_id, http),
        }
    }

    /// Shared device operations: connect, disconnect, metadata
    pub fn device(&self) -> &DeviceClient {
        &self.device
    }

    /// Ambient temperature in degrees Celsius
    pub async fn temperature(&self) -> crate::Result<Option<f64>> {
        self.device.try_get("temperature").await
    }

    /// Relative humidity in percent
    pub async fn humidity(&self) -> crate::Result<Option<f64>> {
        self.device.try_get("humidity").await
    }

    /// Atmospheric pressure in hectopascals
    pub async fn pressure(&self) -> crate::Result<Option<f64>> {
        self.device.try_get("pressure").await
    }

    /// Dew point in degrees Celsius
    pub async fn dew_point(&self) -> crate::Result<Option<f64>> {
        self.device.try_get("dewpoint").await
    }

    /// Wind speed in meters per second
    pub async fn wind_speed(&self) -> crate::Result<Option<f64>> {
        self.device.try_get("windspeed").await
    }

    /// Wind direction in degrees, the direction the wind is coming from
    pub async fn wind_direction(&self) -> crate::Result<Option<f64>> {
        self.device.try_get("winddirection").await
    }

    /// Peak wind gust over the last two minutes, in meters per second
    pub async fn wind_gust(&self) -> crate::Result<Option<f64>> {
        self.device.try_get("windgust").await
    }

    /// Rain rate in millimeters per hour
    pub async fn rain_rate(&self) -> crate::Result<Option<f64>> {
        self.device.try_get("rainrate").await
    }

    /// Cloud cover in percent
    pub async fn cloud_cover(&self) -> crate::Result<Option<f64>> {
        self.device.try_get("cloudcover").await
    }

    /// Sky brightness in lux
    pub async fn sky_brightness(&self) -> crate::Result<Option<f64>> {
        self.device.try_get("skybrightness").await
    }

    /// Sky temperature in degrees Celsius, from an infrared sensor
    pub async fn sky_temperature(&self) -> crate::Result<Option<f64>> {
        self.device.try_get("skytemperature").await
    }

    /// Sky quality in magnitudes per square arcsecond
    pub async fn sky_quality(&self) -> crate::Result<Option<f64>> {
        self.device.try_get("skyquality").await
    }

    /// Seeing as star FWHM in arcseconds
    pub async fn star_fwhm(&self) -> crate::Result<Option<f64>> {
        self.device.try_get("starfwhm").await
    }

    /// Averaging period for sensor readings, in hours
    pub async fn average_period(&self) -> crate::Result<f64> {
        self.device.get("averageperiod").await
    }

    /// Set the averaging period in hours; zero selects instantaneous values
    pub async fn set_average_period(&self, hours: f64) -> crate::Result<()> {
        validate::average_period(hours)?;
        self.device
            .put("averageperiod", &[("AveragePeriod", &hours.to_string())])
            .await
    }

    /// Ask the station to refresh its readings now
    pub async fn refresh(&self) -> crate::Result<()> {
        self.device.put("refresh", &[]).await
    }

    /// Description of the named sensor, e.g. `"temperature"`
    pub async fn sensor_description(&self, sensor: &str) -> crate::Result<String> {
        self.device
            .get_with("sensordescription", &[("SensorName", sensor)])
            .await
    }

    /// Seconds since the named sensor last updated
    pub async fn time_since_last_update(&self, sensor: &str) -> crate::Result<f64> {
        self.device
            .get_with("timesincelastupdate", &[("SensorName", sensor)])
            .await
    }
}
