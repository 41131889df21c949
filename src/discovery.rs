//! Local-network discovery collaborator interface
//!
//! Discovery only produces pairing candidates; the protocol itself lives in
//! the collaborator. Scanning is bounded by the duration the caller passes.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ConnectError;

/// One device seen on the local network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub product_id: String,
    pub device_id: String,
    pub friendly_name: String,
}

/// Local device scanner, implemented by the transport collaborator
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Scan the local network for the given duration and return every
    /// device that announced itself.
    async fn scan(&self, duration: Duration) -> Result<Vec<DiscoveredDevice>, ConnectError>;
}
