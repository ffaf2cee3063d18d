//! Argument checks shared by the device clients.
//!
//! All checks run before any request is built, so a bad value never
//! reaches the network.

use crate::error::{AlpacaError, Result};

fn finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AlpacaError::Validation(format!("{name} must be finite")))
    }
}

/// Hours, [0, 24)
pub(crate) fn right_ascension(ra: f64) -> Result<()> {
    finite("right ascension", ra)?;
    if (0.0..24.0).contains(&ra) {
        Ok(())
    } else {
        Err(AlpacaError::Validation(format!(
            "right ascension {ra} out of range [0, 24)"
        )))
    }
}

/// Degrees, [-90, 90]
pub(crate) fn declination(dec: f64) -> Result<()> {
    finite("declination", dec)?;
    if (-90.0..=90.0).contains(&dec) {
        Ok(())
    } else {
        Err(AlpacaError::Validation(format!(
            "declination {dec} out of range [-90, 90]"
        )))
    }
}

/// Degrees, [-90, 90]
pub(crate) fn altitude(alt: f64) -> Result<()> {
    finite("altitude", alt)?;
    if (-90.0..=90.0).contains(&alt) {
        Ok(())
    } else {
        Err(AlpacaError::Validation(format!(
            "altitude {alt} out of range [-90, 90]"
        )))
    }
}

/// Degrees, [0, 360)
pub(crate) fn azimuth(az: f64) -> Result<()> {
    finite("azimuth", az)?;
    if (0.0..360.0).contains(&az) {
        Ok(())
    } else {
        Err(AlpacaError::Validation(format!(
            "azimuth {az} out of range [0, 360)"
        )))
    }
}

/// Mount axis index: 0 primary, 1 secondary, 2 tertiary
pub(crate) fn axis(axis: i32) -> Result<()> {
    if (0..=2).contains(&axis) {
        Ok(())
    } else {
        Err(AlpacaError::Validation(format!(
            "axis {axis} out of range [0, 2]"
        )))
    }
}

/// Degrees per second, any finite value; the device enforces its own limits
pub(crate) fn axis_rate(rate: f64) -> Result<()> {
    finite("axis rate", rate)
}

/// Rotator angles use the same [0, 360) convention as azimuth
pub(crate) fn rotation_angle(name: &str, angle: f64) -> Result<()> {
    finite(name, angle)?;
    if (0.0..360.0).contains(&angle) {
        Ok(())
    } else {
        Err(AlpacaError::Validation(format!(
            "{name} {angle} out of range [0, 360)"
        )))
    }
}

/// Absolute focuser position; the device enforces its maxstep ceiling
pub(crate) fn focuser_position(position: i32) -> Result<()> {
    if position >= 0 {
        Ok(())
    } else {
        Err(AlpacaError::Validation(format!(
            "focuser position {position} must not be negative"
        )))
    }
}

/// Calibrator brightness; the device enforces its maxbrightness ceiling
pub(crate) fn brightness(brightness: i32) -> Result<()> {
    if brightness >= 0 {
        Ok(())
    } else {
        Err(AlpacaError::Validation(format!(
            "brightness {brightness} must not be negative"
        )))
    }
}

/// Averaging period in hours, zero meaning instantaneous readings
pub(crate) fn average_period(hours: f64) -> Result<()> {
    finite("average period", hours)?;
    if hours >= 0.0 {
        Ok(())
    } else {
        Err(AlpacaError::Validation(format!(
            "average period {hours} must not be negative"
        )))
    }
}
