//! Tri-state support cache for optional device endpoints

use std::collections::HashMap;

use tokio::sync::RwLock;

/// What we know about one optional endpoint on one device.
///
/// `Unsupported` is sticky for the lifetime of a connection: once a device
/// has answered "not implemented", asking again every poll cycle would only
/// add latency and log noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Unknown,
    Supported,
    Unsupported,
}

/// Per-device capability flags, keyed by endpoint name
#[derive(Debug, Default)]
pub struct CapabilityMap {
    flags: RwLock<HashMap<&'static str, Capability>>,
}

impl CapabilityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, endpoint: &str) -> Capability {
        self.flags
            .read()
            .await
            .get(endpoint)
            .copied()
            .unwrap_or(Capability::Unknown)
    }

    pub async fn record_supported(&self, endpoint: &'static str) {
        let mut flags = self.flags.write().await;
        let entry = flags.entry(endpoint).or_insert(Capability::Unknown);
        if *entry != Capability::Unsupported {
            *entry = Capability::Supported;
        }
    }

    pub async fn record_unsupported(&self, endpoint: &'static str) {
        let mut flags = self.flags.write().await;
        if flags.insert(endpoint, Capability::Unsupported) != Some(Capability::Unsupported) {
            tracing::info!(
                "Endpoint '{}' is not implemented, using fallback from now on",
                endpoint
            );
        }
    }

    /// Forget everything. Called on disconnect, since a reconnect may reach
    /// a different driver version.
    pub async fn reset(&self) {
        self.flags.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unprobed_endpoint_is_unknown() {
        let map = CapabilityMap::new();
        assert_eq!(map.get("covermoving").await, Capability::Unknown);
    }

    #[tokio::test]
    async fn success_marks_supported() {
        let map = CapabilityMap::new();
        map.record_supported("covermoving").await;
        assert_eq!(map.get("covermoving").await, Capability::Supported);
    }

    #[tokio::test]
    async fn failure_marks_unsupported() {
        let map = CapabilityMap::new();
        map.record_unsupported("calibratorchanging").await;
        assert_eq!(map.get("calibratorchanging").await, Capability::Unsupported);
    }

    #[tokio::test]
    async fn unsupported_is_sticky() {
        let map = CapabilityMap::new();
        map.record_unsupported("covermoving").await;
        map.record_supported("covermoving").await;
        assert_eq!(map.get("covermoving").await, Capability::Unsupported);
    }

    #[tokio::test]
    async fn reset_forgets_flags() {
        let map = CapabilityMap::new();
        map.record_unsupported("covermoving").await;
        map.reset().await;
        assert_eq!(map.get("covermoving").await, Capability::Unknown);
    }
}
