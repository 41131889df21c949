//! Pairing mode negotiation
//!
//! A device may offer several mutually-exclusive pairing modes. Picking
//! one is the only point in the flow that may need user interaction, so
//! the choice is an injected [`ModeChooser`] capability: interactive
//! front ends prompt, non-interactive ones plug in a policy like
//! [`FirstOffered`] or [`RequireSingle`].

use tracing::debug;

use crate::error::PairingError;
use crate::identity::PairingMode;

/// Picks one mode out of several offered ones.
///
/// Returns the zero-based index into `modes`, or `None` to cancel the
/// pairing attempt. Implemented for plain closures.
pub trait ModeChooser: Send + Sync {
    fn choose(&self, modes: &[PairingMode]) -> Option<usize>;
}

impl<F> ModeChooser for F
where
    F: Fn(&[PairingMode]) -> Option<usize> + Send + Sync,
{
    fn choose(&self, modes: &[PairingMode]) -> Option<usize> {
        self(modes)
    }
}

/// Always picks the first mode the device offered.
pub struct FirstOffered;

impl ModeChooser for FirstOffered {
    fn choose(&self, _modes: &[PairingMode]) -> Option<usize> {
        Some(0)
    }
}

/// Cancels whenever the device offers more than one mode. For callers
/// that must not guess on the user's behalf.
pub struct RequireSingle;

impl ModeChooser for RequireSingle {
    fn choose(&self, modes: &[PairingMode]) -> Option<usize> {
        if modes.len() == 1 {
            Some(0)
        } else {
            None
        }
    }
}

/// Select exactly one mode from the offered set.
///
/// A single offered mode is returned directly without consulting the
/// chooser. With several, the chooser decides; a cancelled choice maps to
/// [`PairingError::Cancelled`] and an out-of-range index to
/// [`PairingError::InvalidSelection`] — the selection is never clamped,
/// and a mode not present in `offered` can never be produced.
pub fn select_mode(
    offered: &[PairingMode],
    chooser: &dyn ModeChooser,
) -> Result<PairingMode, PairingError> {
    match offered {
        [] => Err(PairingError::NoSupportedMode),
        [only] => {
            debug!(mode = %only, "device offers a single pairing mode");
            Ok(*only)
        }
        several => {
            let chosen = chooser.choose(several).ok_or(PairingError::Cancelled)?;
            several
                .get(chosen)
                .copied()
                .ok_or(PairingError::InvalidSelection {
                    chosen,
                    available: several.len(),
                })
        }
    }
}
