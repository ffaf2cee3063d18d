//! Telescope mount client: pointing state, tracking, slews, and parking

use std::sync::Arc;

use serde::Serialize;

use crate::device::DeviceClient;
use crate::io::HttpClient;
use crate::protocol::{bool_str, DeviceAddress, DeviceType};
use crate::validate;
use crate::AlpacaError;

/// Coordinate frame the mount reports its pointing in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EquatorialSystem {
    Other,
    Topocentric,
    J2000,
    J2050,
    B1950,
    Unknown,
}

impl From<i32> for EquatorialSystem {
    fn from(code: i32) -> Self {
        match code {
            0 => EquatorialSystem::Other,
            1 => EquatorialSystem::Topocentric,
            2 => EquatorialSystem::J2000,
            3 => EquatorialSystem::J2050,
            4 => EquatorialSystem::B1950,
            _ => EquatorialSystem::Unknown,
        }
    }
}

impl std::fmt::Display for EquatorialSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EquatorialSystem::Other => write!(f, "other"),
            EquatorialSystem::Topocentric => write!(f, "topocentric"),
            EquatorialSystem::J2000 => write!(f, "J2000"),
            EquatorialSystem::J2050 => write!(f, "J2050"),
            EquatorialSystem::B1950 => write!(f, "B1950"),
            EquatorialSystem::Unknown => write!(f, "unknown"),
        }
    }
}

/// Sidereal/lunar/solar/king drive rates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackingRate {
    Sidereal,
    Lunar,
    Solar,
    King,
    Unknown,
}

impl TrackingRate {
    fn code(&self) -> Option<i32> {
        match self {
            TrackingRate::Sidereal => Some(0),
            TrackingRate::Lunar => Some(1),
            TrackingRate::Solar => Some(2),
            TrackingRate::King => Some(3),
            TrackingRate::Unknown => None,
        }
    }
}

impl From<i32> for TrackingRate {
    fn from(code: i32) -> Self {
        match code {
            0 => TrackingRate::Sidereal,
            1 => TrackingRate::Lunar,
            2 => TrackingRate::Solar,
            3 => TrackingRate::King,
            _ => TrackingRate::Unknown,
        }
    }
}

impl std::fmt::Display for TrackingRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingRate::Sidereal => write!(f, "sidereal"),
            TrackingRate::Lunar => write!(f, "lunar"),
            TrackingRate::Solar => write!(f, "solar"),
            TrackingRate::King => write!(f, "king"),
            TrackingRate::Unknown => write!(f, "unknown"),
        }
    }
}

/// Client for one Alpaca telescope device
#[derive(Debug)]
pub struct TelescopeClient {
    device: DeviceClient,
}

impl TelescopeClient {
    pub fn new(
        host: &str,
        port: u16,
        device_number: u32,
        client_id: u32,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        let address = DeviceAddress::new(host, port, DeviceType::Telescope, device_number);
        Self {
            device: DeviceClient::new(address, client_id, http),
        }
    }

    /// Shared device operations: connect, disconnect, metadata
    pub fn device(&self) -> &DeviceClient {
        &self.device
    }

    /// Right ascension in hours
    pub async fn right_ascension(&self) -> crate::Result<f64> {
        self.device.get("rightascension").await
    }

    /// Declination in degrees
    pub async fn declination(&self) -> crate::Result<f64> {
        self.device.get("declination").await
    }

    /// Altitude above the horizon in degrees
    pub async fn altitude(&self) -> crate::Result<f64> {
        self.device.get("altitude").await
    }

    /// Azimuth in degrees, north-referenced
    pub async fn azimuth(&self) -> crate::Result<f64> {
        self.device.get("azimuth").await
    }

    /// Local apparent sidereal time in hours
    pub async fn sidereal_time(&self) -> crate::Result<f64> {
        self.device.get("siderealtime").await
    }

    pub async fn site_latitude(&self) -> crate::Result<f64> {
        self.device.get("sitelatitude").await
    }

    pub async fn site_longitude(&self) -> crate::Result<f64> {
        self.device.get("sitelongitude").await
    }

    pub async fn site_elevation(&self) -> crate::Result<f64> {
        self.device.get("siteelevation").await
    }

    pub async fn tracking(&self) -> crate::Result<bool> {
        self.device.get("tracking").await
    }

    pub async fn set_tracking(&self, enabled: bool) -> crate::Result<()> {
        self.device
            .put("tracking", &[("Tracking", bool_str(enabled))])
            .await
    }

    pub async fn tracking_rate(&self) -> crate::Result<TrackingRate> {
        let code: i32 = self.device.get("trackingrate").await?;
        Ok(TrackingRate::from(code))
    }

    pub async fn set_tracking_rate(&self, rate: TrackingRate) -> crate::Result<()> {
        let code = rate.code().ok_or_else(|| {
            AlpacaError::Validation("cannot set an unknown tracking rate".to_string())
        })?;
        self.device
            .put("trackingrate", &[("TrackingRate", &code.to_string())])
            .await
    }

    /// Drive rates this mount supports
    pub async fn tracking_rates(&self) -> crate::Result<Vec<TrackingRate>> {
        let codes: Vec<i32> = self.device.get("trackingrates").await?;
        Ok(codes.into_iter().map(TrackingRate::from).collect())
    }

    pub async fn equatorial_system(&self) -> crate::Result<EquatorialSystem> {
        let code: i32 = self.device.get("equatorialsystem").await?;
        Ok(EquatorialSystem::from(code))
    }

    pub async fn slewing(&self) -> crate::Result<bool> {
        self.device.get("slewing").await
    }

    pub async fn at_park(&self) -> crate::Result<bool> {
        self.device.get("atpark").await
    }

    pub async fn at_home(&self) -> crate::Result<bool> {
        self.device.get("athome").await
    }

    pub async fn is_pulse_guiding(&self) -> crate::Result<bool> {
        self.device.get("ispulseguiding").await
    }

    /// Set the target coordinates without slewing. Both values are checked
    /// before either write, so a bad declination never leaves a half-set
    /// target on the device.
    pub async fn set_target(&self, ra: f64, dec: f64) -> crate::Result<()> {
        validate::right_ascension(ra)?;
        validate::declination(dec)?;
        self.device
            .put(
                "targetrightascension",
                &[("TargetRightAscension", &ra.to_string())],
            )
            .await?;
        self.device
            .put(
                "targetdeclination",
                &[("TargetDeclination", &dec.to_string())],
            )
            .await
    }

    /// Start a slew to the given equatorial coordinates. Returns as soon as
    /// the device accepts the command; watch `slewing` for completion.
    pub async fn slew_to_coordinates(&self, ra: f64, dec: f64) -> crate::Result<()> {
        validate::right_ascension(ra)?;
        validate::declination(dec)?;
        self.device
            .put(
                "slewtocoordinatesasync",
                &[
                    ("RightAscension", &ra.to_string()),
                    ("Declination", &dec.to_string()),
                ],
            )
            .await
    }

    /// Start a slew to the given horizontal coordinates
    pub async fn slew_to_alt_az(&self, altitude: f64, azimuth: f64) -> crate::Result<()> {
        validate::altitude(altitude)?;
        validate::azimuth(azimuth)?;
        self.device
            .put(
                "slewtoaltazasync",
                &[
                    ("Altitude", &altitude.to_string()),
                    ("Azimuth", &azimuth.to_string()),
                ],
            )
            .await
    }

    /// Move one mount axis at a fixed rate; rate 0 stops the axis
    pub async fn move_axis(&self, axis: i32, rate: f64) -> crate::Result<()> {
        validate::axis(axis)?;
        validate::axis_rate(rate)?;
        self.device
            .put(
                "moveaxis",
                &[("Axis", &axis.to_string()), ("Rate", &rate.to_string())],
            )
            .await
    }

    pub async fn park(&self) -> crate::Result<()> {
        self.device.put("park", &[]).await
    }

    pub async fn unpark(&self) -> crate::Result<()> {
        self.device.put("unpark", &[]).await
    }

    pub async fn find_home(&self) -> crate::Result<()> {
        self.device.put("findhome", &[]).await
    }

    /// Record the current position as the park position
    pub async fn set_park(&self) -> crate::Result<()> {
        self.device.put("setpark", &[]).await
    }

    pub async fn abort_slew(&self) -> crate::Result<()> {
        self.device.put("abortslew", &[]).await
    }
}
