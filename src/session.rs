//! Connection collaborator interface
//!
//! The pairing layer never moves bytes itself. It drives an
//! already-established [`Session`] owned by the transport collaborator:
//! a CoAP-like request/response exchange, password authentication, and the
//! device fingerprint the secure channel was established against. Payloads
//! cross this boundary as `serde_json::Value`; the transport owns the wire
//! encoding.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AuthError, ConnectError};
use crate::identity::Fingerprint;

/// Status code a device answers with when a pairing claim succeeded
pub const STATUS_CREATED: u16 = 201;

/// Status code a device answers with when serving requested content
pub const STATUS_CONTENT: u16 = 205;

/// Response to a single exchange on a session
#[derive(Debug, Clone)]
pub struct Response {
    /// CoAP-like status code
    pub status: u16,
    /// Decoded payload, if the device sent one
    pub body: Option<Value>,
}

impl Response {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    /// Human-readable reason text carried in the payload, if any.
    /// Devices answer failed pairing claims with a short reason string.
    pub fn reason(&self) -> String {
        match &self.body {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

/// A connected session to one device.
///
/// Implemented by the transport collaborator. The pairing layer issues
/// strictly sequential exchanges on it; a session undergoes at most one
/// pairing attempt at a time.
#[async_trait]
pub trait Session: Send + Sync {
    /// Establish the secure channel.
    async fn connect(&self) -> Result<(), ConnectError>;

    /// Close the session. Must be called after a failed identity check;
    /// no further exchanges are valid afterwards.
    async fn close(&self);

    /// Fingerprint of the device key the channel was established against.
    /// `None` when the transport could not produce one.
    fn device_fingerprint(&self) -> Option<Fingerprint>;

    /// Password-authenticate on the open channel. An empty username selects
    /// the anonymous pairing identity.
    async fn authenticate(&self, username: &str, password: &str) -> Result<(), AuthError>;

    /// Issue one request/response exchange.
    async fn request(
        &self,
        method: &str,
        path: &str,
        payload: Option<Value>,
    ) -> Result<Response, ConnectError>;
}
