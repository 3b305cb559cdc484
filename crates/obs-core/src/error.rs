//! Classification of failures reported by the remote endpoint.
//!
//! The server reports request failures as a numeric status code plus an
//! optional free-form comment.  Callers rarely care about the exact code; they
//! need to know whether a failure is one of the handful of *expected*
//! conditions that make an operation a no-op:
//!
//! - the thing being created already exists,
//! - the thing being removed or modified does not exist,
//! - the output or mode being toggled is already in the requested state.
//!
//! All such interpretation lives in [`classify_remote_error`].  Status codes
//! are consulted first.  The comment text is only matched when no code is
//! available, since its wording is not part of the protocol contract.

use crate::protocol::messages::status_code;

/// Coarse category of a remote failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// The referenced resource already exists.
    AlreadyExists,
    /// The referenced resource does not exist.
    NotFound,
    /// The output or mode is already in the requested state.
    AlreadyInState,
    /// Anything else.  Callers should propagate it.
    Other,
}

/// Classifies a remote failure from its status code and message.
///
/// # Examples
///
/// ```rust
/// use obs_core::{classify_remote_error, RemoteErrorKind};
///
/// assert_eq!(classify_remote_error(Some(601), ""), RemoteErrorKind::AlreadyExists);
/// assert_eq!(
///     classify_remote_error(None, "No source was found by the name of `Mic`."),
///     RemoteErrorKind::Other,
/// );
/// assert_eq!(classify_remote_error(None, "Scene not found"), RemoteErrorKind::NotFound);
/// ```
pub fn classify_remote_error(code: Option<u16>, message: &str) -> RemoteErrorKind {
    if let Some(code) = code {
        match code {
            status_code::RESOURCE_ALREADY_EXISTS => return RemoteErrorKind::AlreadyExists,
            status_code::RESOURCE_NOT_FOUND => return RemoteErrorKind::NotFound,
            status_code::OUTPUT_RUNNING
            | status_code::OUTPUT_NOT_RUNNING
            | status_code::OUTPUT_PAUSED
            | status_code::OUTPUT_NOT_PAUSED
            | status_code::STUDIO_MODE_ACTIVE
            | status_code::STUDIO_MODE_NOT_ACTIVE => return RemoteErrorKind::AlreadyInState,
            _ => {}
        }
    }

    let lower = message.to_ascii_lowercase();
    if lower.contains("already exists") {
        RemoteErrorKind::AlreadyExists
    } else if lower.contains("not found") {
        RemoteErrorKind::NotFound
    } else {
        RemoteErrorKind::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_take_priority_over_message() {
        // A 600 whose comment happens to mention "already exists" is still NotFound.
        assert_eq!(
            classify_remote_error(Some(600), "already exists"),
            RemoteErrorKind::NotFound
        );
        assert_eq!(
            classify_remote_error(Some(601), ""),
            RemoteErrorKind::AlreadyExists
        );
    }

    #[test]
    fn test_output_state_codes_are_already_in_state() {
        for code in [500, 501, 502, 503, 505, 506] {
            assert_eq!(
                classify_remote_error(Some(code), "whatever"),
                RemoteErrorKind::AlreadyInState,
                "code {code}"
            );
        }
    }

    #[test]
    fn test_unknown_code_falls_back_to_message() {
        assert_eq!(
            classify_remote_error(Some(702), "The scene already exists"),
            RemoteErrorKind::AlreadyExists
        );
        assert_eq!(
            classify_remote_error(Some(702), "processing failed"),
            RemoteErrorKind::Other
        );
    }

    #[test]
    fn test_message_match_is_case_insensitive() {
        assert_eq!(
            classify_remote_error(None, "Input NOT FOUND"),
            RemoteErrorKind::NotFound
        );
    }
}
