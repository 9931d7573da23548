//! Backend selection module.
//!
//! This module defines the available execution paths for the convolutions
//! and provides functions to set and get the current one.
//!
//! # Supported Backends
//!
//! - `Cpu`: Sequential reference loops (default).
//! - `Parallel`: `rayon` accelerated loops. Only the separable convolution
//!   has one; requesting it for the dense convolution is an error.
//!
//! The backend is stored globally using an `AtomicU8`, so switching is
//! cheap and visible to every layer at once.

use core::convert::TryFrom;
use core::sync::atomic::{AtomicU8, Ordering};

/// Enumeration of supported execution paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Backend {
    /// Sequential CPU loops (default).
    #[default]
    Cpu = 0,
    /// Multi-threaded CPU loops using `rayon`.
    Parallel,
}

impl TryFrom<u8> for Backend {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Cpu),
            1 => Ok(Self::Parallel),
            _ => Err(()),
        }
    }
}

/// Internal global state for the active backend.
///
/// The backend is expected to change rarely, between graph executions.
static GLOBAL_DEFAULT_BACKEND: AtomicU8 = AtomicU8::new(Backend::Cpu as u8);

/// Sets the active backend used by [`crate::ops::dispatch`].
///
/// # Example
///
/// ```
/// use briny_pac::backend::{get_backend, set_backend, Backend};
/// set_backend(Backend::Parallel);
/// assert_eq!(get_backend(), Backend::Parallel);
/// set_backend(Backend::Cpu);
/// ```
pub fn set_backend(b: Backend) {
    log::trace!("switching backend to {b:?}");
    GLOBAL_DEFAULT_BACKEND.store(b as u8, Ordering::Release);
}

/// Returns the currently active backend.
///
/// If the stored value is invalid, defaults to [`Backend::Cpu`].
pub fn get_backend() -> Backend {
    Backend::try_from(GLOBAL_DEFAULT_BACKEND.load(Ordering::Acquire)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_discriminant_is_rejected() {
        assert_eq!(Backend::try_from(0), Ok(Backend::Cpu));
        assert_eq!(Backend::try_from(1), Ok(Backend::Parallel));
        assert!(Backend::try_from(7).is_err());
    }
}
