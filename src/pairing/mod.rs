//! Device pairing
//!
//! Establishing trust with a device takes one of four mutually-exclusive
//! handshakes, chosen from whatever the device currently offers:
//!
//! 1. **Offer**: ask the connected device for its identity and modes
//! 2. **Negotiate**: pick exactly one mode, via an injected chooser when
//!    the device offers several
//! 3. **Handshake**: drive the per-mode exchange to a pass/fail outcome
//! 4. **Bookmark**: persist the resulting identity in the trust store
//!
//! On every later reconnect the stored identity is re-verified before any
//! privileged operation (see [`crate::verify`]).

pub mod flow;
pub mod info;
pub mod invite;
pub mod negotiator;
pub mod strategy;

pub use flow::{pair_device, PairingOptions, PairingOutcome};
pub use info::{fetch_current_user, fetch_pairing_offer, PairingOffer, UserInfo};
pub use invite::PairingInvite;
pub use negotiator::{select_mode, FirstOffered, ModeChooser, RequireSingle};
pub use strategy::{PairingCredentials, PairingStrategy};
