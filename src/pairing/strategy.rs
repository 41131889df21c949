//! Per-mode pairing handshakes
//!
//! One variant per pairing mode, each carrying exactly the inputs its
//! handshake needs. All handshakes end in the device either registering
//! this client (status 201 on the claim) or rejecting it; nothing is
//! retried automatically — a failed attempt goes back to the caller, which
//! may restart negotiation from scratch.
//!
//! ## Two-step modes
//!
//! The password modes authenticate before they claim, and the two steps
//! fail differently on purpose. `PasswordOpen` authenticates as the
//! anonymous pairing identity and only names a user in the claim;
//! `PasswordInvite` authenticates directly as the invited username and
//! the claim carries nothing. A wrong password surfaces as
//! [`StrategyError::AuthenticationFailed`], a refused claim (for example
//! a username collision) as [`StrategyError::RejectedByDevice`] — the
//! user reacts differently to each, so the claim step never runs once
//! authentication has failed.

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{PairingError, StrategyError};
use crate::identity::PairingMode;
use crate::session::{Session, STATUS_CREATED};

/// Inputs a caller gathered for a pairing attempt. Which ones a handshake
/// actually needs depends on the negotiated mode.
#[derive(Debug, Clone, Default)]
pub struct PairingCredentials {
    /// Username to register or authenticate as
    pub username: Option<String>,
    /// Pairing or invite password
    pub password: Option<String>,
}

/// One pairing handshake, ready to execute against a session
#[derive(Debug, Clone)]
pub enum PairingStrategy {
    /// Credential-less claim; the device only accepts it inside its
    /// initial local setup window.
    LocalInitial,
    /// Claim carrying the chosen username. Uniqueness among the device's
    /// users is enforced by the device, not locally.
    LocalOpen { username: String },
    /// Anonymous password authentication, then a claim for the username
    PasswordOpen { username: String, password: String },
    /// Password authentication as the invited username, then a bare
    /// invite-confirmation claim
    PasswordInvite { username: String, password: String },
}

impl PairingStrategy {
    /// Build the handshake for a negotiated mode from the supplied
    /// credentials, failing when a required input is missing or empty.
    pub fn for_mode(
        mode: PairingMode,
        credentials: &PairingCredentials,
    ) -> Result<Self, PairingError> {
        let username = || {
            credentials
                .username
                .clone()
                .filter(|u| !u.is_empty())
                .ok_or(PairingError::MissingCredential {
                    mode,
                    what: "username",
                })
        };
        let password = || {
            credentials
                .password
                .clone()
                .ok_or(PairingError::MissingCredential {
                    mode,
                    what: "password",
                })
        };

        match mode {
            PairingMode::LocalInitial => Ok(Self::LocalInitial),
            PairingMode::LocalOpen => Ok(Self::LocalOpen {
                username: username()?,
            }),
            PairingMode::PasswordOpen => Ok(Self::PasswordOpen {
                username: username()?,
                password: password()?,
            }),
            PairingMode::PasswordInvite => Ok(Self::PasswordInvite {
                username: username()?,
                password: password()?,
            }),
            PairingMode::None => Err(PairingError::NoSupportedMode),
        }
    }

    /// The mode this handshake implements
    pub fn mode(&self) -> PairingMode {
        match self {
            Self::LocalInitial => PairingMode::LocalInitial,
            Self::LocalOpen { .. } => PairingMode::LocalOpen,
            Self::PasswordOpen { .. } => PairingMode::PasswordOpen,
            Self::PasswordInvite { .. } => PairingMode::PasswordInvite,
        }
    }

    /// Drive the handshake to completion. Steps are strictly sequential;
    /// each exchange is awaited before the next is issued.
    pub async fn execute<S: Session + ?Sized>(&self, session: &S) -> Result<(), PairingError> {
        info!(mode = %self.mode(), "executing pairing handshake");
        match self {
            Self::LocalInitial => claim(session, "/iam/pairing/local-initial", None).await,
            Self::LocalOpen { username } => {
                claim(
                    session,
                    "/iam/pairing/local-open",
                    Some(json!({ "Username": username })),
                )
                .await
            }
            Self::PasswordOpen { username, password } => {
                authenticate(session, "", password).await?;
                claim(
                    session,
                    "/iam/pairing/password-open",
                    Some(json!({ "Username": username })),
                )
                .await
            }
            Self::PasswordInvite { username, password } => {
                authenticate(session, username, password).await?;
                claim(session, "/iam/pairing/password-invite", None).await
            }
        }
    }
}

async fn authenticate<S: Session + ?Sized>(
    session: &S,
    username: &str,
    password: &str,
) -> Result<(), PairingError> {
    session.authenticate(username, password).await.map_err(|e| {
        debug!("password authentication failed: {e}");
        PairingError::from(StrategyError::AuthenticationFailed {
            reason: e.to_string(),
        })
    })
}

async fn claim<S: Session + ?Sized>(
    session: &S,
    path: &str,
    payload: Option<Value>,
) -> Result<(), PairingError> {
    let response = session.request("POST", path, payload).await?;
    if response.status != STATUS_CREATED {
        info!(
            status = response.status,
            path, "device rejected the pairing claim"
        );
        return Err(StrategyError::RejectedByDevice {
            status: response.status,
            reason: response.reason(),
        }
        .into());
    }
    Ok(())
}
