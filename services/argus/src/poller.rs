//! Per-device polling tasks.
//!
//! Each configured device gets one tokio task that reads the device's
//! properties, merges them into the previous snapshot, and publishes the
//! result over a watch channel. Reads are independent: one failing
//! property leaves its previous value in place while the rest refresh.
//! Only cycles in which every read fails at transport level count toward
//! the backoff that stretches the polling interval.

use std::sync::Arc;
use std::time::Duration;

use argus_alpaca::{
    AlpacaError, CoverCalibratorClient, DeviceClient, DeviceType, DomeClient, FocuserClient,
    ObservingConditionsClient, RotatorClient, TelescopeClient,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::state::{
    epoch_ms, CoverCalibratorSnapshot, DeviceSnapshot, DeviceStatus, DomeSnapshot, FocuserSnapshot,
    RotatorSnapshot, TelescopeSnapshot, WeatherSnapshot,
};

/// Consecutive failed cycles before the first warning
const FAILURE_WARN_THRESHOLD: u32 = 5;
/// Longest stretch of the polling interval under backoff
const MAX_BACKOFF_MULTIPLIER: u32 = 8;
/// How long `stop` waits for a poll task to finish
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// One concrete device client behind a uniform polling surface
#[derive(Debug, Clone)]
pub enum DeviceHandle {
    Telescope(Arc<TelescopeClient>),
    Focuser(Arc<FocuserClient>),
    Rotator(Arc<RotatorClient>),
    Dome(Arc<DomeClient>),
    CoverCalibrator(Arc<CoverCalibratorClient>),
    ObservingConditions(Arc<ObservingConditionsClient>),
}

impl DeviceHandle {
    pub fn device(&self) -> &DeviceClient {
        match self {
            DeviceHandle::Telescope(c) => c.device(),
            DeviceHandle::Focuser(c) => c.device(),
            DeviceHandle::Rotator(c) => c.device(),
            DeviceHandle::Dome(c) => c.device(),
            DeviceHandle::CoverCalibrator(c) => c.device(),
            DeviceHandle::ObservingConditions(c) => c.device(),
        }
    }

    pub fn device_type(&self) -> DeviceType {
        match self {
            DeviceHandle::Telescope(_) => DeviceType::Telescope,
            DeviceHandle::Focuser(_) => DeviceType::Focuser,
            DeviceHandle::Rotator(_) => DeviceType::Rotator,
            DeviceHandle::Dome(_) => DeviceType::Dome,
            DeviceHandle::CoverCalibrator(_) => DeviceType::CoverCalibrator,
            DeviceHandle::ObservingConditions(_) => DeviceType::ObservingConditions,
        }
    }

    fn initial_snapshot(&self) -> DeviceSnapshot {
        match self {
            DeviceHandle::Telescope(_) => DeviceSnapshot::Telescope(TelescopeSnapshot::default()),
            DeviceHandle::Focuser(_) => DeviceSnapshot::Focuser(FocuserSnapshot::default()),
            DeviceHandle::Rotator(_) => DeviceSnapshot::Rotator(RotatorSnapshot::default()),
            DeviceHandle::Dome(_) => DeviceSnapshot::Dome(DomeSnapshot::default()),
            DeviceHandle::CoverCalibrator(_) => {
                DeviceSnapshot::CoverCalibrator(CoverCalibratorSnapshot::default())
            }
            DeviceHandle::ObservingConditions(_) => {
                DeviceSnapshot::ObservingConditions(WeatherSnapshot::default())
            }
        }
    }

    /// Refresh every property of this device into `snapshot`. Slow cycles
    /// additionally read the static/rarely-changing properties.
    async fn refresh(&self, name: &str, snapshot: &mut DeviceSnapshot, slow: bool) -> CycleStats {
        let mut stats = CycleStats::default();
        match (self, snapshot) {
            (DeviceHandle::Telescope(c), DeviceSnapshot::Telescope(s)) => {
                stats.apply(
                    name,
                    "rightascension",
                    &mut s.right_ascension,
                    c.right_ascension().await,
                );
                stats.apply(
                    name,
                    "declination",
                    &mut s.declination,
                    c.declination().await,
                );
                stats.apply(name, "altitude", &mut s.altitude, c.altitude().await);
                stats.apply(name, "azimuth", &mut s.azimuth, c.azimuth().await);
                stats.apply(
                    name,
                    "siderealtime",
                    &mut s.sidereal_time,
                    c.sidereal_time().await,
                );
                stats.apply(name, "tracking", &mut s.tracking, c.tracking().await);
                stats.apply(
                    name,
                    "trackingrate",
                    &mut s.tracking_rate,
                    c.tracking_rate().await,
                );
                stats.apply(name, "slewing", &mut s.slewing, c.slewing().await);
                stats.apply(name, "atpark", &mut s.at_park, c.at_park().await);
                stats.apply(name, "athome", &mut s.at_home, c.at_home().await);
                stats.apply(
                    name,
                    "ispulseguiding",
                    &mut s.pulse_guiding,
                    c.is_pulse_guiding().await,
                );
                if slow {
                    stats.apply(
                        name,
                        "equatorialsystem",
                        &mut s.equatorial_system,
                        c.equatorial_system().await,
                    );
                    stats.apply(
                        name,
                        "sitelatitude",
                        &mut s.site_latitude,
                        c.site_latitude().await,
                    );
                    stats.apply(
                        name,
                        "sitelongitude",
                        &mut s.site_longitude,
                        c.site_longitude().await,
                    );
                    stats.apply(
                        name,
                        "siteelevation",
                        &mut s.site_elevation,
                        c.site_elevation().await,
                    );
                }
            }
            (DeviceHandle::Focuser(c), DeviceSnapshot::Focuser(s)) => {
                stats.apply(name, "position", &mut s.position, c.position().await);
                stats.apply(name, "ismoving", &mut s.moving, c.is_moving().await);
                stats.apply(
                    name,
                    "temperature",
                    &mut s.temperature,
                    c.temperature().await,
                );
                stats.apply(name, "tempcomp", &mut s.temp_comp, c.temp_comp().await);
                if slow {
                    stats.apply(name, "maxstep", &mut s.max_step, c.max_step().await);
                    stats.apply(name, "stepsize", &mut s.step_size, c.step_size().await);
                    stats.apply(name, "absolute", &mut s.absolute, c.absolute().await);
                }
            }
            (DeviceHandle::Rotator(c), DeviceSnapshot::Rotator(s)) => {
                stats.apply(name, "position", &mut s.position, c.position().await);
                stats.apply(
                    name,
                    "mechanicalposition",
                    &mut s.mechanical_position,
                    c.mechanical_position().await,
                );
                stats.apply(
                    name,
                    "targetposition",
                    &mut s.target_position,
                    c.target_position().await,
                );
                stats.apply(name, "ismoving", &mut s.moving, c.is_moving().await);
                stats.apply(name, "reverse", &mut s.reversed, c.reversed().await);
                if slow {
                    stats.apply(
                        name,
                        "canreverse",
                        &mut s.can_reverse,
                        c.can_reverse().await,
                    );
                    stats.apply(name, "stepsize", &mut s.step_size, c.step_size().await);
                }
            }
            (DeviceHandle::Dome(c), DeviceSnapshot::Dome(s)) => {
                stats.apply(name, "azimuth", &mut s.azimuth, c.azimuth().await);
                stats.apply(name, "altitude", &mut s.altitude, c.altitude().await);
                stats.apply(
                    name,
                    "shutterstatus",
                    &mut s.shutter,
                    c.shutter_status().await,
                );
                stats.apply(name, "slewing", &mut s.slewing, c.slewing().await);
                stats.apply(name, "atpark", &mut s.at_park, c.at_park().await);
                stats.apply(name, "athome", &mut s.at_home, c.at_home().await);
                stats.apply(name, "slaved", &mut s.slaved, c.slaved().await);
            }
            (DeviceHandle::CoverCalibrator(c), DeviceSnapshot::CoverCalibrator(s)) => {
                stats.apply(
                    name,
                    "coverstate",
                    &mut s.cover_state,
                    c.cover_state().await,
                );
                stats.apply(
                    name,
                    "calibratorstate",
                    &mut s.calibrator_state,
                    c.calibrator_state().await,
                );
                stats.apply(
                    name,
                    "covermoving",
                    &mut s.cover_moving,
                    c.cover_moving().await,
                );
                stats.apply(
                    name,
                    "calibratorchanging",
                    &mut s.calibrator_changing,
                    c.calibrator_changing().await,
                );
                stats.apply(name, "brightness", &mut s.brightness, c.brightness().await);
                if slow {
                    stats.apply(
                        name,
                        "maxbrightness",
                        &mut s.max_brightness,
                        c.max_brightness().await,
                    );
                }
            }
            (DeviceHandle::ObservingConditions(c), DeviceSnapshot::ObservingConditions(s)) => {
                stats.apply_sensor(
                    name,
                    "temperature",
                    &mut s.temperature,
                    c.temperature().await,
                );
                stats.apply_sensor(name, "humidity", &mut s.humidity, c.humidity().await);
                stats.apply_sensor(name, "pressure", &mut s.pressure, c.pressure().await);
                stats.apply_sensor(name, "dewpoint", &mut s.dew_point, c.dew_point().await);
                stats.apply_sensor(name, "windspeed", &mut s.wind_speed, c.wind_speed().await);
                stats.apply_sensor(
                    name,
                    "winddirection",
                    &mut s.wind_direction,
                    c.wind_direction().await,
                );
                stats.apply_sensor(name, "windgust", &mut s.wind_gust, c.wind_gust().await);
                stats.apply_sensor(name, "rainrate", &mut s.rain_rate, c.rain_rate().await);
                stats.apply_sensor(
                    name,
                    "cloudcover",
                    &mut s.cloud_cover,
                    c.cloud_cover().await,
                );
                stats.apply_sensor(
                    name,
                    "skybrightness",
                    &mut s.sky_brightness,
                    c.sky_brightness().await,
                );
                stats.apply_sensor(
                    name,
                    "skytemperature",
                    &mut s.sky_temperature,
                    c.sky_temperature().await,
                );
                stats.apply_sensor(
                    name,
                    "skyquality",
                    &mut s.sky_quality,
                    c.sky_quality().await,
                );
                stats.apply_sensor(name, "starfwhm", &mut s.star_fwhm, c.star_fwhm().await);
                if slow {
                    stats.apply(
                        name,
                        "averageperiod",
                        &mut s.average_period,
                        c.average_period().await,
                    );
                }
            }
            // A handle only ever refreshes the snapshot it created
            _ => {}
        }
        stats
    }
}

/// Read outcomes of one poll cycle
#[derive(Debug, Default)]
struct CycleStats {
    reads: u32,
    transport_failures: u32,
}

impl CycleStats {
    /// Every read attempted this cycle failed at transport level
    fn all_transport_failed(&self) -> bool {
        self.reads > 0 && self.transport_failures == self.reads
    }

    fn apply<T>(
        &mut self,
        device: &str,
        property: &str,
        field: &mut Option<T>,
        result: argus_alpaca::Result<T>,
    ) {
        self.reads += 1;
        match result {
            Ok(value) => *field = Some(value),
            Err(e) => self.note_failure(device, property, &e),
        }
    }

    /// Variant for sensors that legitimately read as absent: `Ok(None)`
    /// means the device does not have the sensor, which clears the field
    /// rather than preserving a stale value.
    fn apply_sensor<T>(
        &mut self,
        device: &str,
        property: &str,
        field: &mut Option<T>,
        result: argus_alpaca::Result<Option<T>>,
    ) {
        self.reads += 1;
        match result {
            Ok(value) => *field = value,
            Err(e) => self.note_failure(device, property, &e),
        }
    }

    fn note_failure(&mut self, device: &str, property: &str, error: &AlpacaError) {
        if error.is_retryable() {
            self.transport_failures += 1;
            tracing::debug!("Reading {} from {} failed: {}", property, device, error);
        } else {
            // The device answered and refused; keep the previous value and
            // let the error show up in the logs only.
            tracing::debug!("{} rejected {} read: {}", device, property, error);
        }
    }
}

fn backoff_multiplier(consecutive_failures: u32) -> u32 {
    match consecutive_failures {
        0 => 1,
        n => 2u32
            .saturating_pow(n.min(3))
            .min(MAX_BACKOFF_MULTIPLIER),
    }
}

fn should_warn(consecutive_failures: u32) -> bool {
    consecutive_failures >= FAILURE_WARN_THRESHOLD
        && (consecutive_failures - FAILURE_WARN_THRESHOLD) % 10 == 0
}

/// Running poll task for one device
#[derive(Debug)]
pub struct PollerHandle {
    name: String,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cancel the poll loop and wait for the task to finish
    pub async fn stop(self) {
        self.cancel.cancel();
        match tokio::time::timeout(STOP_TIMEOUT, self.task).await {
            Ok(Ok(())) => tracing::debug!("Poller for {} stopped", self.name),
            Ok(Err(e)) => tracing::warn!("Poller for {} ended abnormally: {}", self.name, e),
            Err(_) => tracing::warn!(
                "Poller for {} did not stop within {:?}",
                self.name,
                STOP_TIMEOUT
            ),
        }
    }
}

/// Spawn the poll task for one device. The returned receiver always holds
/// the most recently published status.
pub fn spawn(
    name: String,
    handle: DeviceHandle,
    interval: Duration,
    slow_every: u32,
    cancel: CancellationToken,
) -> (PollerHandle, watch::Receiver<DeviceStatus>) {
    let seed = DeviceStatus {
        name: name.clone(),
        device_type: handle.device_type(),
        connection: argus_alpaca::ConnectionState::Disconnected,
        consecutive_failures: 0,
        updated_at_ms: epoch_ms(),
        snapshot: handle.initial_snapshot(),
    };
    let (tx, rx) = watch::channel(seed);

    let loop_cancel = cancel.clone();
    let loop_name = name.clone();
    let task = tokio::spawn(async move {
        poll_loop(loop_name, handle, interval, slow_every, loop_cancel, tx).await;
    });

    (PollerHandle { name, cancel, task }, rx)
}

async fn poll_loop(
    name: String,
    handle: DeviceHandle,
    interval: Duration,
    slow_every: u32,
    cancel: CancellationToken,
    tx: watch::Sender<DeviceStatus>,
) {
    let slow_every = u64::from(slow_every.max(1));
    let mut snapshot = handle.initial_snapshot();
    let mut cycle: u64 = 0;
    let mut consecutive_failures: u32 = 0;

    tracing::info!("Polling {} every {:?}", name, interval);
    loop {
        let slow = cycle % slow_every == 0;
        let stats = handle.refresh(&name, &mut snapshot, slow).await;

        if stats.all_transport_failed() {
            consecutive_failures = consecutive_failures.saturating_add(1);
            if should_warn(consecutive_failures) {
                tracing::warn!(
                    "{} has been unreachable for {} consecutive poll cycles",
                    name,
                    consecutive_failures
                );
            }
        } else if consecutive_failures > 0 {
            tracing::info!(
                "{} is reachable again after {} failed cycles",
                name,
                consecutive_failures
            );
            consecutive_failures = 0;
        }

        // The whole status is swapped in one send; readers never observe a
        // partially updated snapshot.
        tx.send_replace(DeviceStatus {
            name: name.clone(),
            device_type: handle.device_type(),
            connection: handle.device().connection_state().await,
            consecutive_failures,
            updated_at_ms: epoch_ms(),
            snapshot: snapshot.clone(),
        });

        cycle += 1;
        let delay = interval * backoff_multiplier(consecutive_failures);
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Poller for {} cancelled", name);
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
