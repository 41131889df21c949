//! Edge Device Pairing
//!
//! This library implements the trust-establishment side of a client for
//! embedded edge devices: negotiating one of several pairing modes with a
//! device, driving the chosen handshake, and remembering the outcome in a
//! durable bookmark store whose fingerprints are re-verified on every
//! later reconnect.
//!
//! Moving bytes is not this crate's job. The secure transport, the
//! request/response exchange, and local discovery are collaborator traits
//! ([`Session`], [`discovery::Discovery`]) supplied by the embedding
//! application.

pub mod config;
pub mod discovery;
pub mod identity;
pub mod keys;
pub mod pairing;
pub mod session;
pub mod store;
pub mod verify;

mod error;

pub use config::{ClientConfig, Paths};
pub use error::{
    AuthError, ConfigError, ConnectError, KeyError, PairingError, PersistError, Result,
    StoreError, StrategyError,
};
pub use identity::{DeviceIdentity, Fingerprint, PairingMode};
pub use pairing::{
    pair_device, FirstOffered, ModeChooser, PairingCredentials, PairingInvite, PairingOffer,
    PairingOptions, PairingOutcome, PairingStrategy, RequireSingle, UserInfo,
};
pub use session::{Response, Session};
pub use store::TrustStore;
pub use verify::{
    verify_reconnect, MismatchDiagnostic, ReconnectError, VerificationOutcome,
};
