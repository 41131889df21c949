//! Device identity types
//!
//! A paired device is remembered as a [`DeviceIdentity`] bookmark. The
//! [`Fingerprint`] is the authoritative identity: it is derived from the
//! device's key material, so names can lie but the fingerprint cannot.
//! `(product_id, device_id)` describe what the device claims to be and are
//! only used for diagnostics when fingerprints disagree.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cryptographic device fingerprint, stored as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse and normalize a hex fingerprint string.
    ///
    /// Returns `None` for empty or non-hex input.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() || hex::decode(&normalized).is_err() {
            return None;
        }
        Some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trust-establishment modes a device can offer.
///
/// `None` is a sentinel meaning "no mode selected"; it is never offered by
/// a real device and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PairingMode {
    /// Credential-less claim, only open in the device's initial setup window
    LocalInitial,
    /// Open local pairing with a chosen username
    LocalOpen,
    /// Anonymous password authentication followed by a username claim
    PasswordOpen,
    /// Password authentication as an invited, pre-provisioned username
    PasswordInvite,
    /// No mode selected
    None,
}

impl PairingMode {
    /// Parse the mode string a device advertises in its pairing info.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "LocalInitial" => Some(Self::LocalInitial),
            "LocalOpen" => Some(Self::LocalOpen),
            "PasswordOpen" => Some(Self::PasswordOpen),
            "PasswordInvite" => Some(Self::PasswordInvite),
            _ => None,
        }
    }
}

impl fmt::Display for PairingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LocalInitial => "local-initial",
            Self::LocalOpen => "local-open",
            Self::PasswordOpen => "password-open",
            Self::PasswordInvite => "password-invite",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// One bookmarked device: the persisted outcome of a successful pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Stable bookmark index, assigned by the trust store. Unique and
    /// immutable once assigned, never reused after deletion.
    #[serde(rename = "Index", default)]
    pub index: u32,

    /// Vendor product namespace
    #[serde(rename = "ProductId")]
    pub product_id: String,

    /// Device id, unique within the product
    #[serde(rename = "DeviceId")]
    pub device_id: String,

    /// Cryptographic identity asserted by the device's key
    #[serde(rename = "DeviceFingerprint")]
    pub fingerprint: Fingerprint,

    /// Opaque token for re-establishing relayed sessions
    #[serde(rename = "Sct", default)]
    pub server_connect_token: String,

    /// Host for direct, non-relayed connections
    #[serde(rename = "DirectCandidate", default, skip_serializing_if = "Option::is_none")]
    pub direct_address: Option<String>,

    /// Display name, as advertised at pairing time or set by a rename
    #[serde(rename = "FriendlyName", default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,

    /// When the pairing was established
    #[serde(rename = "PairedAt", default = "Utc::now")]
    pub paired_at: DateTime<Utc>,
}

impl DeviceIdentity {
    /// Create a new identity record. The index is assigned by the trust
    /// store when the record is added.
    pub fn new(
        product_id: impl Into<String>,
        device_id: impl Into<String>,
        fingerprint: Fingerprint,
        server_connect_token: impl Into<String>,
    ) -> Self {
        Self {
            index: 0,
            product_id: product_id.into(),
            device_id: device_id.into(),
            fingerprint,
            server_connect_token: server_connect_token.into(),
            direct_address: None,
            friendly_name: None,
            paired_at: Utc::now(),
        }
    }

    pub fn with_direct_address(mut self, host: impl Into<String>) -> Self {
        self.direct_address = Some(host.into());
        self
    }

    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Short human-readable handle, e.g. `[2] pr-12345678.de-abcdefgh`
    pub fn label(&self) -> String {
        format!("[{}] {}.{}", self.index, self.product_id, self.device_id)
    }
}
