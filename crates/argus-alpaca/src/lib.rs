//! ASCOM Alpaca device client library for Argus.
//!
//! Talks to Alpaca servers over their HTTP/JSON protocol and exposes one
//! typed client per device class: telescope, focuser, rotator, dome, cover
//! calibrator, and observing conditions. All requests flow through a
//! single protocol adapter that owns URL construction, transaction IDs,
//! and response envelope decoding, with an injectable HTTP seam so every
//! behavior is testable against a mock transport.

pub mod capabilities;
pub mod covercalibrator;
pub mod device;
pub mod dome;
pub mod error;
pub mod focuser;
pub mod io;
pub mod management;
pub mod observingconditions;
pub mod protocol;
pub mod rotator;
pub mod telescope;
mod validate;

pub use covercalibrator::{CalibratorState, CoverCalibratorClient, CoverState};
pub use device::{ConnectionState, DeviceClient};
pub use dome::{DomeClient, ShutterState};
pub use error::{AlpacaError, Result};
pub use focuser::FocuserClient;
pub use io::{HttpClient, HttpResponse, ReqwestHttpClient};
pub use management::{ConfiguredDevice, ManagementClient, ServerDescription};
pub use observingconditions::ObservingConditionsClient;
pub use protocol::{DeviceAddress, DeviceType};
pub use rotator::RotatorClient;
pub use telescope::{EquatorialSystem, TelescopeClient, TrackingRate};
