//! Pairing string parser
//!
//! Devices hand out pairing strings of the form
//! `p=<product>,d=<device>,pwd=<password>,sct=<token>,u=<username>`.
//! Pairs without a `=` are skipped, unknown keys are ignored.

use tracing::debug;

use super::strategy::PairingCredentials;

/// Parsed pairing string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairingInvite {
    pub product_id: Option<String>,
    pub device_id: Option<String>,
    pub password: Option<String>,
    pub server_connect_token: Option<String>,
    pub username: Option<String>,
}

impl PairingInvite {
    pub fn parse(pairing_string: &str) -> Self {
        let mut invite = Self::default();
        for pair in pairing_string.split(',') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = value.to_string();
            match key.trim() {
                "p" => invite.product_id = Some(value),
                "d" => invite.device_id = Some(value),
                "pwd" => invite.password = Some(value),
                "sct" => invite.server_connect_token = Some(value),
                "u" => invite.username = Some(value),
                other => debug!("ignoring unknown pairing string key {:?}", other),
            }
        }
        invite
    }

    /// The credential subset a pairing handshake consumes
    pub fn credentials(&self) -> PairingCredentials {
        PairingCredentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}
