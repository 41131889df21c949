//! Pairing orchestration
//!
//! Ties the pieces together for one attempt on one connected session:
//! detect an existing registration, fetch the offer, negotiate a mode,
//! run the handshake, then bookmark the resulting identity in the trust
//! store. One attempt per session at a time; independent sessions may
//! pair concurrently and only share the trust store.

use tracing::info;

use crate::error::PairingError;
use crate::identity::DeviceIdentity;
use crate::pairing::info::{fetch_current_user, fetch_pairing_offer, UserInfo};
use crate::pairing::negotiator::{select_mode, ModeChooser};
use crate::pairing::strategy::{PairingCredentials, PairingStrategy};
use crate::session::Session;
use crate::store::TrustStore;

/// How a pairing attempt concluded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingOutcome {
    /// A handshake ran and the device registered this client
    Paired { index: u32 },
    /// The device already knew this client; the bookmark was refreshed
    /// (or recreated, if the local state had been lost)
    AlreadyPaired { index: u32 },
}

impl PairingOutcome {
    /// Bookmark index of the paired device
    pub fn index(&self) -> u32 {
        match self {
            Self::Paired { index } | Self::AlreadyPaired { index } => *index,
        }
    }
}

/// Caller-supplied inputs for one pairing attempt
#[derive(Debug, Clone, Default)]
pub struct PairingOptions {
    pub credentials: PairingCredentials,
    /// Host to remember for direct, non-relayed reconnects
    pub direct_address: Option<String>,
}

/// Run one complete pairing attempt against a connected session.
///
/// If the device already has a user for this client's key no handshake
/// runs; the bookmark is refreshed from the live session instead. A
/// failure anywhere is returned to the caller, which may restart
/// negotiation from scratch — nothing is retried here, and a failed
/// password is never re-tried silently.
pub async fn pair_device<S: Session + ?Sized>(
    session: &S,
    store: &TrustStore,
    chooser: &dyn ModeChooser,
    options: &PairingOptions,
) -> Result<PairingOutcome, PairingError> {
    if let Some(user) = fetch_current_user(session).await? {
        info!(username = %user.username, "client is already paired with the device");
        let index = bookmark_session(session, store, options, user).await?;
        return Ok(PairingOutcome::AlreadyPaired { index });
    }

    let offer = fetch_pairing_offer(session).await?;
    let mode = select_mode(&offer.offered_modes, chooser)?;
    let strategy = PairingStrategy::for_mode(mode, &options.credentials)?;
    strategy.execute(session).await?;

    let user = fetch_current_user(session).await?.ok_or_else(|| {
        PairingError::Protocol("device accepted the pairing but reports no user".to_string())
    })?;
    let index = bookmark_session(session, store, options, user).await?;
    info!(index, "pairing complete");
    Ok(PairingOutcome::Paired { index })
}

/// Assemble the identity of the device behind `session` and write it into
/// the trust store: a fresh bookmark for a new fingerprint, an in-place
/// update when the fingerprint is already bookmarked.
async fn bookmark_session<S: Session + ?Sized>(
    session: &S,
    store: &TrustStore,
    options: &PairingOptions,
    user: UserInfo,
) -> Result<u32, PairingError> {
    let offer = fetch_pairing_offer(session).await?;
    let fingerprint = session.device_fingerprint().ok_or_else(|| {
        PairingError::Protocol("the device did not present a fingerprint".to_string())
    })?;

    let mut identity = DeviceIdentity::new(
        offer.product_id,
        offer.device_id,
        fingerprint.clone(),
        user.server_connect_token,
    );
    if let Some(host) = &options.direct_address {
        identity = identity.with_direct_address(host);
    }
    if !offer.friendly_name.is_empty() {
        identity = identity.with_friendly_name(&offer.friendly_name);
    }

    match store.get_by_fingerprint(&fingerprint) {
        Some(existing) => {
            store.update(existing.index, identity)?;
            info!("refreshed bookmark {}", existing.label());
            Ok(existing.index)
        }
        None => {
            let index = store.add(identity)?;
            Ok(index)
        }
    }
}
