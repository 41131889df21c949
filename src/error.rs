//! Error handling for pairing and trust-store operations
//!
//! Each layer owns its own error type so callers can react to the failure
//! class that matters to them: transport failures ([`ConnectError`]) come
//! from the connection collaborator and are never retried here, handshake
//! failures ([`StrategyError`]) distinguish a wrong password from a
//! device-side rejection, and store failures ([`StoreError`]) separate a
//! missing bookmark from a broken disk. [`PairingError`] is the umbrella
//! type the pairing flow returns; the lower-level types convert into it
//! with `From`.

use std::path::PathBuf;

use thiserror::Error;

use crate::identity::PairingMode;

/// Result type for pairing operations
pub type Result<T> = std::result::Result<T, PairingError>;

/// Transport-layer failure, owned by the connection collaborator.
///
/// The pairing layer propagates these unchanged; retry policy (if any)
/// belongs to the caller.
#[derive(Error, Debug)]
pub enum ConnectError {
    /// No usable channel to the device, with the per-channel reasons
    /// the transport reported.
    #[error("not connected (local: {local}, remote: {remote})")]
    NoChannels { local: String, remote: String },

    /// Any other transport failure
    #[error("transport error: {0}")]
    Transport(String),
}

/// Password authentication rejected by the peer, owned by the connection
/// collaborator.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct AuthError(pub String);

/// Failure while executing a pairing handshake.
///
/// The two variants are deliberately distinct: a wrong password must not
/// be reported as a device-side rejection (such as a username collision),
/// because the user has to react differently to each.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// Step-1 password authentication failed (wrong password)
    #[error("could not password authenticate with the device: {reason}")]
    AuthenticationFailed { reason: String },

    /// The device rejected the pairing claim itself
    #[error("the device rejected the pairing request (status {status}): {reason}")]
    RejectedByDevice { status: u16, reason: String },
}

/// Failure writing the durable trust-store snapshot
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("state file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Trust-store operation failure
#[derive(Error, Debug)]
pub enum StoreError {
    /// No bookmark exists with the given index
    #[error("no bookmark with index {0}")]
    NotFound(u32),

    /// The fingerprint is already bookmarked under another index.
    /// Two bookmarks must never share a fingerprint; use an update on the
    /// existing index instead.
    #[error("fingerprint already bookmarked at index {index}")]
    DuplicateFingerprint { index: u32 },

    /// The snapshot could not be written; the in-memory mutation was
    /// rolled back.
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Failure while loading or saving the client configuration document
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Failure while loading or creating the private key material file
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("key file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key generator supplied by the connection collaborator failed
    #[error("could not generate a private key: {0}")]
    Generate(String),

    /// The key file exists but holds no key material
    #[error("key file {0:?} is empty")]
    Empty(PathBuf),
}

/// Errors returned by the pairing flow
#[derive(Error, Debug)]
pub enum PairingError {
    /// Transport failure from the connection collaborator
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// The device did not serve its pairing info
    #[error("pairing info unavailable, the device answered with status {status}")]
    InfoUnavailable { status: u16 },

    /// The device answered with something this client cannot decode
    #[error("malformed response from the device: {0}")]
    Protocol(String),

    /// The device offered no pairing mode this client supports
    #[error("the device offers no supported pairing modes")]
    NoSupportedMode,

    /// The mode chooser declined to pick a mode
    #[error("pairing cancelled")]
    Cancelled,

    /// The mode chooser returned an index outside the offered list.
    /// The selection is never clamped or wrapped.
    #[error("invalid pairing mode selection: index {chosen} with {available} modes offered")]
    InvalidSelection { chosen: usize, available: usize },

    /// The selected mode needs an input that was not supplied
    #[error("pairing mode {mode} requires a {what}")]
    MissingCredential {
        mode: PairingMode,
        what: &'static str,
    },

    /// The handshake itself failed
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    /// The pairing succeeded but the bookmark could not be stored
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PairingError::NoSupportedMode;
        assert_eq!(
            error.to_string(),
            "the device offers no supported pairing modes"
        );

        let error = PairingError::InvalidSelection {
            chosen: 5,
            available: 2,
        };
        assert!(error.to_string().contains("index 5"));

        let error = StoreError::NotFound(7);
        assert_eq!(error.to_string(), "no bookmark with index 7");
    }

    #[test]
    fn test_strategy_errors_stay_distinct() {
        let auth = PairingError::from(StrategyError::AuthenticationFailed {
            reason: "bad password".to_string(),
        });
        assert!(matches!(
            auth,
            PairingError::Strategy(StrategyError::AuthenticationFailed { .. })
        ));

        let rejected = PairingError::from(StrategyError::RejectedByDevice {
            status: 400,
            reason: "username exists".to_string(),
        });
        assert!(matches!(
            rejected,
            PairingError::Strategy(StrategyError::RejectedByDevice { status: 400, .. })
        ));
    }

    #[test]
    fn test_store_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let persist: PersistError = io.into();
        let store: StoreError = persist.into();
        assert!(matches!(store, StoreError::Persist(PersistError::Io(_))));
    }
}
