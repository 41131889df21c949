//! Reconnect-time identity verification
//!
//! Every reconnect to a bookmarked device compares the live fingerprint
//! against the stored one before anything privileged happens. Bare
//! equality is not enough for a useful diagnostic: when fingerprints
//! disagree, the advertised `(product_id, device_id)` decide whether the
//! user connected to the wrong product, the wrong device, or — the
//! security-critical case — the right names with the wrong key, which has
//! to be reported as a possible impersonation rather than silently
//! accepted.

use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::error::PairingError;
use crate::identity::{DeviceIdentity, Fingerprint};
use crate::pairing::info::{fetch_current_user, fetch_pairing_offer, PairingOffer};
use crate::session::Session;

/// Result of comparing a stored identity against a live fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The live key matches the bookmark
    Match,
    /// The live key differs from the bookmark
    FingerprintMismatch {
        expected: Fingerprint,
        actual: Fingerprint,
    },
    /// The peer could not produce a fingerprint at all. A hard failure,
    /// never "no opinion".
    FingerprintUnavailable,
}

/// Why a fingerprint mismatch happened, judged by the names the live
/// device advertises
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MismatchDiagnostic {
    /// Connected to a device of a different product
    WrongProduct { expected: String, actual: String },
    /// Right product, different device
    WrongDevice { expected: String, actual: String },
    /// Same advertised names, different key. Possible impersonation;
    /// re-pairing is the only way forward.
    KeyMismatch,
}

impl fmt::Display for MismatchDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongProduct { expected, actual } => write!(
                f,
                "the product id of the connected device ({actual}) does not match the bookmark ({expected})"
            ),
            Self::WrongDevice { expected, actual } => write!(
                f,
                "the device id of the connected device ({actual}) does not match the bookmark ({expected})"
            ),
            Self::KeyMismatch => write!(
                f,
                "the public key of the device does not match the bookmarked key, pair with the device again"
            ),
        }
    }
}

/// Why a reconnect to a bookmarked device must be abandoned
#[derive(Error, Debug)]
pub enum ReconnectError {
    /// The live key does not match the bookmark. The diagnostic is absent
    /// when the device would not even serve its pairing info.
    #[error("device identity mismatch")]
    Mismatch {
        expected: Fingerprint,
        actual: Fingerprint,
        diagnostic: Option<MismatchDiagnostic>,
    },

    /// The device presented no fingerprint
    #[error("the device did not present a fingerprint")]
    FingerprintUnavailable,

    /// The device no longer has a user for this client's key
    #[error("the client is not paired with the device, pair again")]
    NotRegistered,

    #[error(transparent)]
    Pairing(#[from] PairingError),
}

impl ReconnectError {
    /// Message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            Self::Mismatch {
                diagnostic: Some(d),
                ..
            } => d.to_string(),
            Self::Mismatch { .. } => {
                "the device's identity does not match the bookmark".to_string()
            }
            Self::FingerprintUnavailable => {
                "the device presented no fingerprint, pair with the device again".to_string()
            }
            Self::NotRegistered => {
                "the client is not paired with the device, pair again".to_string()
            }
            Self::Pairing(e) => e.to_string(),
        }
    }
}

/// Compare a stored identity against the fingerprint a live session
/// produced.
pub fn verify_identity(
    stored: &DeviceIdentity,
    live: Option<&Fingerprint>,
) -> VerificationOutcome {
    match live {
        None => VerificationOutcome::FingerprintUnavailable,
        Some(actual) if *actual == stored.fingerprint => VerificationOutcome::Match,
        Some(actual) => VerificationOutcome::FingerprintMismatch {
            expected: stored.fingerprint.clone(),
            actual: actual.clone(),
        },
    }
}

/// Judge a fingerprint mismatch by the names the live device advertises.
pub fn classify_mismatch(stored: &DeviceIdentity, live: &PairingOffer) -> MismatchDiagnostic {
    if live.product_id != stored.product_id {
        MismatchDiagnostic::WrongProduct {
            expected: stored.product_id.clone(),
            actual: live.product_id.clone(),
        }
    } else if live.device_id != stored.device_id {
        MismatchDiagnostic::WrongDevice {
            expected: stored.device_id.clone(),
            actual: live.device_id.clone(),
        }
    } else {
        MismatchDiagnostic::KeyMismatch
    }
}

/// Verify a freshly connected session against its bookmark.
///
/// Checks the fingerprint first and, when it matches, confirms the client
/// is still registered on the device. Any failure is fatal to the
/// session: the caller must close it and must not run privileged
/// operations on it.
pub async fn verify_reconnect<S: Session + ?Sized>(
    session: &S,
    stored: &DeviceIdentity,
) -> Result<(), ReconnectError> {
    let live = session.device_fingerprint();
    match verify_identity(stored, live.as_ref()) {
        VerificationOutcome::Match => {}
        VerificationOutcome::FingerprintUnavailable => {
            warn!("bookmark {} has no matching live fingerprint", stored.label());
            return Err(ReconnectError::FingerprintUnavailable);
        }
        VerificationOutcome::FingerprintMismatch { expected, actual } => {
            let diagnostic = fetch_pairing_offer(session)
                .await
                .ok()
                .map(|offer| classify_mismatch(stored, &offer));
            warn!(
                "fingerprint mismatch for bookmark {}: {}",
                stored.label(),
                diagnostic
                    .as_ref()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "device serves no pairing info".to_string())
            );
            return Err(ReconnectError::Mismatch {
                expected,
                actual,
                diagnostic,
            });
        }
    }

    match fetch_current_user(session).await? {
        Some(_) => Ok(()),
        None => Err(ReconnectError::NotRegistered),
    }
}
