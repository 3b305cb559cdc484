//! Soft outcomes of capability operations.
//!
//! Creating something that already exists, removing something that is
//! already gone, or starting an output that is already running are expected
//! conditions, not failures.  Capability modules report them as an
//! [`Outcome`] and return normally; only genuine failures become `Err`.

use std::fmt;

use obs_core::RemoteErrorKind;

use crate::error::ObsError;

/// Why an operation was refused locally without contacting the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// At least one scene must always exist.
    LastScene,
}

/// What a mutating capability operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The change was made.
    Applied,
    /// The thing to create was already there.
    AlreadyExists,
    /// The thing to change or remove was not there.
    NotFound,
    /// The output or mode was already in the requested state.
    Unchanged,
    /// The change was refused locally.
    Refused(Refusal),
}

impl Outcome {
    /// `true` only for [`Outcome::Applied`].
    pub fn is_applied(self) -> bool {
        self == Outcome::Applied
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied => f.write_str("done"),
            Outcome::AlreadyExists => f.write_str("already exists"),
            Outcome::NotFound => f.write_str("not found"),
            Outcome::Unchanged => f.write_str("already in that state"),
            Outcome::Refused(Refusal::LastScene) => f.write_str("refused: the last scene cannot be removed"),
        }
    }
}

/// The one soft condition a capability call accepts as a no-op.
///
/// Only creates, removes, and output/mode toggles tolerate anything; every
/// other failure propagates as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tolerate {
    /// A create whose target is already there.
    AlreadyExists,
    /// A remove whose target is already gone.
    NotFound,
    /// A start/stop of something already in that state.
    AlreadyInState,
}

impl Tolerate {
    pub(crate) fn kind(self) -> RemoteErrorKind {
        match self {
            Tolerate::AlreadyExists => RemoteErrorKind::AlreadyExists,
            Tolerate::NotFound => RemoteErrorKind::NotFound,
            Tolerate::AlreadyInState => RemoteErrorKind::AlreadyInState,
        }
    }

    fn outcome(self) -> Outcome {
        match self {
            Tolerate::AlreadyExists => Outcome::AlreadyExists,
            Tolerate::NotFound => Outcome::NotFound,
            Tolerate::AlreadyInState => Outcome::Unchanged,
        }
    }
}

/// Maps the result of a mutating call to an [`Outcome`].  A remote failure
/// of exactly the `tolerate` kind becomes the matching soft outcome; any
/// other error is returned unchanged.
pub(crate) fn absorb<T>(tolerate: Tolerate, result: Result<T, ObsError>) -> Result<Outcome, ObsError> {
    match result {
        Ok(_) => Ok(Outcome::Applied),
        Err(e) if e.remote_kind() == Some(tolerate.kind()) => Ok(tolerate.outcome()),
        Err(e) => Err(e),
    }
}

/// [`Outcome::Applied`] on success; every error propagates.
pub(crate) fn applied<T>(result: Result<T, ObsError>) -> Result<Outcome, ObsError> {
    result.map(|_| Outcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(kind: RemoteErrorKind) -> ObsError {
        ObsError::RemoteCall {
            method: "X".to_string(),
            code: None,
            kind,
            message: String::new(),
        }
    }

    #[test]
    fn test_absorb_maps_only_the_tolerated_kind() {
        assert_eq!(
            absorb::<()>(Tolerate::AlreadyExists, Err(remote(RemoteErrorKind::AlreadyExists))),
            Ok(Outcome::AlreadyExists)
        );
        assert_eq!(
            absorb::<()>(Tolerate::NotFound, Err(remote(RemoteErrorKind::NotFound))),
            Ok(Outcome::NotFound)
        );
        assert_eq!(
            absorb::<()>(Tolerate::AlreadyInState, Err(remote(RemoteErrorKind::AlreadyInState))),
            Ok(Outcome::Unchanged)
        );
        assert_eq!(absorb(Tolerate::NotFound, Ok(())), Ok(Outcome::Applied));
    }

    #[test]
    fn test_absorb_propagates_other_soft_kinds() {
        // A create that hits "not found" (e.g. a missing scene) is a failure.
        assert_eq!(
            absorb::<()>(Tolerate::AlreadyExists, Err(remote(RemoteErrorKind::NotFound))),
            Err(remote(RemoteErrorKind::NotFound))
        );
        assert_eq!(
            absorb::<()>(Tolerate::NotFound, Err(remote(RemoteErrorKind::AlreadyInState))),
            Err(remote(RemoteErrorKind::AlreadyInState))
        );
    }

    #[test]
    fn test_absorb_propagates_hard_errors() {
        assert_eq!(
            absorb::<()>(Tolerate::NotFound, Err(remote(RemoteErrorKind::Other))),
            Err(remote(RemoteErrorKind::Other))
        );
        assert_eq!(
            absorb::<()>(Tolerate::AlreadyExists, Err(ObsError::NotConnected)),
            Err(ObsError::NotConnected)
        );
    }

    #[test]
    fn test_applied_never_absorbs() {
        assert_eq!(applied(Ok(())), Ok(Outcome::Applied));
        assert_eq!(
            applied::<()>(Err(remote(RemoteErrorKind::NotFound))),
            Err(remote(RemoteErrorKind::NotFound))
        );
    }
}
