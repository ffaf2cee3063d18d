//! Dome client: shutter, rotation, and slaving

use std::sync::Arc;

use serde::Serialize;

use crate::device::DeviceClient;
use crate::io::HttpClient;
use crate::protocol::{bool_str, DeviceAddress, DeviceType};
use crate::validate;

/// Shutter position reported by the dome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShutterState {
    Open,
    Closed,
    Opening,
    Closing,
    Error,
    Unknown,
}

impl From<i32> for ShutterState {
    fn from(code: i32) -> Self {
        match code {
            0 => ShutterState::Open,
            1 => ShutterState::Closed,
            2 => ShutterState::Opening,
            3 => ShutterState::Closing,
            4 => ShutterState::Error,
            _ => ShutterState::Unknown,
        }
    }
}

impl std::fmt::Display for ShutterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutterState::Open => write!(f, "open"),
            ShutterState::Closed => write!(f, "closed"),
            ShutterState::Opening => write!(f, "opening"),
            ShutterState::Closing => write!(f, "closing"),
            ShutterState::Error => write!(f, "error"),
            ShutterState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Client for one Alpaca dome device.
///
/// Commands return as soon as the dome accepts them; shutter and slew
/// progress is observed by polling the state getters.
#[derive(Debug)]
pub struct DomeClient {
    device: DeviceClient,
}

impl DomeClient {
    pub fn new(
        host: &str,
        port: u16,
        device_number: u32,
        client_id: u32,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        let address = DeviceAddress::new(host, port, DeviceType::Dome, device_number);
        Self {
            device: DeviceClient::new(address, client_id, http),
        }
    }

    /// Shared device operations: connect, disconnect, metadata
    pub fn device(&self) -> &DeviceClient {
        &self.device
    }

    /// Dome azimuth in degrees, north-referenced
    pub async fn azimuth(&self) -> crate::Result<f64> {
        self.device.get("azimuth").await
    }

    /// Shutter opening altitude in degrees
    pub async fn altitude(&self) -> crate::Result<f64> {
        self.device.get("altitude").await
    }

    pub async fn shutter_status(&self) -> crate::Result<ShutterState> {
        let code: i32 = self.device.get("shutterstatus").await?;
        Ok(ShutterState::from(code))
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

    /// True when the dome follows the telescope
    pub async fn slaved(&self) -> crate::Result<bool> {
        self.device.get("slaved").await
    }

    /// Some dome controllers accept a slaved write but silently stay
    /// unslaved when no telescope link is configured, so the new state is
    /// read back once. A mismatch is logged, not an error.
    pub async fn set_slaved(&self, slaved: bool) -> crate::Result<()> {
        self.device
            .put("slaved", &[("Slaved", bool_str(slaved))])
            .await?;
        match self.device.get::<bool>("slaved").await {
            Ok(reported) if reported != slaved => {
                tracing::warn!(
                    "Dome accepted slaved={} but reports slaved={}",
                    slaved,
                    reported
                );
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("Verifying slaved after set failed: {}", e),
        }
        Ok(())
    }

    /// Start rotating the dome to the given azimuth
    pub async fn slew_to_azimuth(&self, azimuth: f64) -> crate::Result<()> {
        validate::azimuth(azimuth)?;
        self.device
            .put("slewtoazimuth", &[("Azimuth", &azimuth.to_string())])
            .await
    }

    pub async fn abort_slew(&self) -> crate::Result<()> {
        self.device.put("abortslew", &[]).await
    }

    pub async fn open_shutter(&self) -> crate::Result<()> {
        self.device.put("openshutter", &[]).await
    }

    pub async fn close_shutter(&self) -> crate::Result<()> {
        self.device.put("closeshutter", &[]).await
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{HttpResponse, MockHttpClient};
    use crate::AlpacaError;

    fn dome_with(mock: MockHttpClient) -> DomeClient {
        DomeClient::new("localhost", 11111, 0, 1, Arc::new(mock))
    }

    fn value_response(value: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: format!(r#"{{"Value": {value}, "ErrorNumber": 0, "ErrorMessage": ""}}"#),
        }
    }

    fn ok_response() -> HttpResponse {
        HttpResponse {
            status: 200,
            body: r#"{"ErrorNumber": 0, "ErrorMessage": ""}"#.to_string(),
        }
    }

    #[tokio::test]
    async fn shutter_status_decodes_known_codes() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .withf(|url| url.contains("/dome/0/shutterstatus?"))
            .returning(|_| Box::pin(async { Ok(value_response("2")) }));

        let dome = dome_with(mock);
        assert_eq!(dome.shutter_status().await.unwrap(), ShutterState::Opening);
    }

    #[tokio::test]
    async fn unrecognized_shutter_code_maps_to_unknown() {
        let mut mock = MockHttpClient::new();
        mock.expect_get()
            .returning(|_| Box::pin(async { Ok(value_response("7")) }));

        let dome = dome_with(mock);
        assert_eq!(dome.shutter_status().await.unwrap(), ShutterState::Unknown);
    }

    #[tokio::test]
    async fn slew_to_azimuth_rejects_out_of_range() {
        let dome = dome_with(MockHttpClient::new());
        let err = dome.slew_to_azimuth(360.0).await.unwrap_err();
        assert!(matches!(err, AlpacaError::Validation(_)));
        let err = dome.slew_to_azimuth(-1.0).await.unwrap_err();
        assert!(matches!(err, AlpacaError::Validation(_)));
    }

    #[tokio::test]
    async fn slew_to_azimuth_sends_azimuth() {
        let mut mock = MockHttpClient::new();
        mock.expect_put_form()
            .withf(|url, params| {
                url.contains("/slewtoazimuth") && params.contains(&("Azimuth", "245.5"))
            })
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(ok_response()) }));

        let dome = dome_with(mock);
        dome.slew_to_azimuth(245.5).await.unwrap();
    }

    #[tokio::test]
    async fn set_slaved_writes_then_verifies() {
        let mut mock = MockHttpClient::new();
        mock.expect_put_form()
            .withf(|url, params| url.contains("/slaved") && params.contains(&("Slaved", "true")))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(ok_response()) }));
        mock.expect_get()
            .withf(|url| url.contains("/dome/0/slaved?"))
            .times(1)
            .returning(|_| Box::pin(async { Ok(value_response("true")) }));

        let dome = dome_with(mock);
        dome.set_slaved(true).await.unwrap();
    }

    #[tokio::test]
    async fn set_slaved_mismatch_is_logged_not_fatal() {
        let mut mock = MockHttpClient::new();
        mock.expect_put_form()
            .returning(|_, _| Box::pin(async { Ok(ok_response()) }));
        // Device takes the write but stays unslaved
        mock.expect_get()
            .times(1)
            .returning(|_| Box::pin(async { Ok(value_response("false")) }));

        let dome = dome_with(mock);
        assert!(dome.set_slaved(true).await.is_ok());
    }

    #[tokio::test]
    async fn shutter_commands_hit_their_endpoints() {
        let mut mock = MockHttpClient::new();
        mock.expect_put_form()
            .withf(|url, _| url.contains("/openshutter"))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(ok_response()) }));
        mock.expect_put_form()
            .withf(|url, _| url.contains("/closeshutter"))
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(ok_response()) }));

        let dome = dome_with(mock);
        dome.open_shutter().await.unwrap();
        dome.close_shutter().await.unwrap();
    }
}
