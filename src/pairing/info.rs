//! Pairing info and user queries
//!
//! Two thin read-only queries against a connected device: the pairing
//! offer (who the device is and which pairing modes it currently accepts)
//! and the current user (whether this client is already registered on the
//! device). Both issue exactly one exchange; retrying is the caller's
//! decision.

use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::error::PairingError;
use crate::identity::PairingMode;
use crate::session::{Session, STATUS_CONTENT};

/// Identity and pairing modes a device advertises before pairing.
/// Ephemeral: fetched per attempt, never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct PairingOffer {
    #[serde(rename = "ProductId", default)]
    pub product_id: String,

    #[serde(rename = "DeviceId", default)]
    pub device_id: String,

    #[serde(rename = "FriendlyName", default)]
    pub friendly_name: String,

    #[serde(rename = "NabtoVersion", default)]
    pub firmware_version: String,

    #[serde(rename = "AppName", default)]
    pub app_name: String,

    #[serde(rename = "AppVersion", default)]
    pub app_version: String,

    /// Offered modes in the order the device returned them
    #[serde(rename = "Modes", default, deserialize_with = "modes_from_wire")]
    pub offered_modes: Vec<PairingMode>,
}

/// The user record a device keeps for this client once paired
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    #[serde(rename = "Username", default)]
    pub username: String,

    #[serde(rename = "Sct", default)]
    pub server_connect_token: String,
}

/// Modes arrive as strings; unknown ones are dropped so a newer device
/// does not break the negotiation over a mode this client cannot run.
fn modes_from_wire<'de, D>(deserializer: D) -> Result<Vec<PairingMode>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(raw
        .iter()
        .filter_map(|s| {
            let mode = PairingMode::from_wire(s);
            if mode.is_none() {
                warn!("ignoring unknown pairing mode {:?} offered by the device", s);
            }
            mode
        })
        .collect())
}

/// Ask a connected, not-yet-verified device for its pairing offer.
///
/// A non-success status means the device will not serve pairing info
/// ([`PairingError::InfoUnavailable`]); an undecodable body is a protocol
/// error. No retries at this layer.
pub async fn fetch_pairing_offer<S: Session + ?Sized>(
    session: &S,
) -> Result<PairingOffer, PairingError> {
    let response = session.request("GET", "/iam/pairing", None).await?;
    if response.status != STATUS_CONTENT {
        debug!(
            status = response.status,
            "device did not serve its pairing info"
        );
        return Err(PairingError::InfoUnavailable {
            status: response.status,
        });
    }
    let body = response.body.ok_or_else(|| {
        PairingError::Protocol("pairing info response carried no payload".to_string())
    })?;
    serde_json::from_value(body)
        .map_err(|e| PairingError::Protocol(format!("could not decode pairing info: {e}")))
}

/// Ask the device which user this client's key is registered as.
///
/// `None` means the client is not paired with the device (the device
/// answers the query with a non-success status in that case).
pub async fn fetch_current_user<S: Session + ?Sized>(
    session: &S,
) -> Result<Option<UserInfo>, PairingError> {
    let response = session.request("GET", "/iam/me", None).await?;
    if response.status != STATUS_CONTENT {
        debug!(status = response.status, "no user registered for this client");
        return Ok(None);
    }
    let body = response
        .body
        .ok_or_else(|| PairingError::Protocol("user response carried no payload".to_string()))?;
    let user = serde_json::from_value(body)
        .map_err(|e| PairingError::Protocol(format!("could not decode user record: {e}")))?;
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuthError, ConnectError};
    use crate::identity::Fingerprint;
    use crate::session::Response;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct FixedSession {
        response: Response,
    }

    #[async_trait]
    impl Session for FixedSession {
        async fn connect(&self) -> Result<(), ConnectError> {
            Ok(())
        }
        async fn close(&self) {}
        fn device_fingerprint(&self) -> Option<Fingerprint> {
            None
        }
        async fn authenticate(&self, _: &str, _: &str) -> Result<(), AuthError> {
            Ok(())
        }
        async fn request(
            &self,
            _method: &str,
            _path: &str,
            _payload: Option<Value>,
        ) -> Result<Response, ConnectError> {
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn test_offer_decodes_and_drops_unknown_modes() {
        let session = FixedSession {
            response: Response::new(
                205,
                Some(json!({
                    "ProductId": "pr-1",
                    "DeviceId": "de-1",
                    "FriendlyName": "Heat Pump",
                    "NabtoVersion": "5.2.0",
                    "AppName": "heatpump",
                    "AppVersion": "1.0.0",
                    "Modes": ["PasswordOpen", "FutureMode", "LocalOpen"]
                })),
            ),
        };

        let offer = fetch_pairing_offer(&session).await.unwrap();
        assert_eq!(offer.product_id, "pr-1");
        assert_eq!(offer.friendly_name, "Heat Pump");
        assert_eq!(
            offer.offered_modes,
            vec![PairingMode::PasswordOpen, PairingMode::LocalOpen]
        );
    }

    #[tokio::test]
    async fn test_offer_unavailable_on_error_status() {
        let session = FixedSession {
            response: Response::new(404, None),
        };
        let result = fetch_pairing_offer(&session).await;
        assert!(matches!(
            result,
            Err(PairingError::InfoUnavailable { status: 404 })
        ));
    }

    #[tokio::test]
    async fn test_offer_protocol_error_on_malformed_body() {
        let session = FixedSession {
            response: Response::new(205, Some(json!("just a string"))),
        };
        assert!(matches!(
            fetch_pairing_offer(&session).await,
            Err(PairingError::Protocol(_))
        ));

        let session = FixedSession {
            response: Response::new(205, None),
        };
        assert!(matches!(
            fetch_pairing_offer(&session).await,
            Err(PairingError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_current_user_present_and_absent() {
        let session = FixedSession {
            response: Response::new(205, Some(json!({ "Username": "alice", "Sct": "tok" }))),
        };
        let user = fetch_current_user(&session).await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.server_connect_token, "tok");

        let session = FixedSession {
            response: Response::new(404, None),
        };
        assert!(fetch_current_user(&session).await.unwrap().is_none());
    }
}
