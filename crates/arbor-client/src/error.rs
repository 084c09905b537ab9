//! Client error taxonomy.
//!
//! Every failure a caller can observe is one of the kinds below. The set is
//! closed so callers branch on variants instead of string matching, and the
//! status-code mapping is total: a code outside {200, 201} always lands in a
//! defined variant, never gets silently ignored.

use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Server answered 403.
    #[error("access denied: {url}")]
    AccessDenied {
        /// URL of the rejected request.
        url: String,
    },

    /// Server answered 404: the path or resource is absent.
    #[error("not found: {url}")]
    NotFound {
        /// URL of the missing resource.
        url: String,
    },

    /// Server answered 409: committed state moved under the caller.
    #[error("conflict: {url}")]
    Conflict {
        /// URL of the conflicting request.
        url: String,
    },

    /// Lock acquisition was denied, the lock is held elsewhere.
    ///
    /// Wraps the underlying denial instead of surfacing a bare
    /// [`AccessDenied`](Self::AccessDenied) because the caller's intent was
    /// locking, not data access.
    #[error("cannot acquire lock `{key}`")]
    CannotAcquireLock {
        /// Key the caller tried to lock with.
        key: String,
        /// The denial that came back from the lock endpoint.
        #[source]
        source: Box<ClientError>,
    },

    /// Acquire attempted while this instance already holds a lock.
    #[error("lock `{held}` already held")]
    LockAlreadyHeld {
        /// Key currently held.
        held: String,
    },

    /// Lock-scoped operation attempted with no lock held.
    #[error("lock not held")]
    LockNotHeld,

    /// Any other unexpected status code.
    #[error("bad status {code}: {url}")]
    BadStatus {
        /// The status code as received.
        code: u16,
        /// URL of the request.
        url: String,
    },

    /// Connection, I/O, or URL failure before a server answer arrived.
    #[error("transport failure: {url}: {reason}")]
    Transport {
        /// URL the request was aimed at.
        url: String,
        /// Description of the underlying failure.
        reason: String,
    },

    /// A response arrived but its body is not the expected JSON.
    #[error("protocol failure: {url}: {reason}")]
    Protocol {
        /// URL of the request.
        url: String,
        /// What the decoder rejected.
        reason: String,
    },

    /// Caller-supplied argument that can never be valid on the wire.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
    },
}

impl ClientError {
    /// Classify a response status code.
    ///
    /// Total over all of `u16`: {200, 201} pass, everything else is an
    /// error. Centralized here so a newly handled code applies to every
    /// operation at once.
    pub(crate) fn check_status(code: u16, url: &str) -> Result<(), Self> {
        match code {
            200 | 201 => Ok(()),
            403 => Err(Self::AccessDenied { url: url.to_string() }),
            404 => Err(Self::NotFound { url: url.to_string() }),
            409 => Err(Self::Conflict { url: url.to_string() }),
            code => Err(Self::BadStatus { code, url: url.to_string() }),
        }
    }

    /// Returns true if retrying the operation could plausibly succeed.
    ///
    /// `Conflict` asks for a re-read first, `CannotAcquireLock` for a
    /// backoff; transport failures may be transient. Everything else needs a
    /// code or credential change before a retry is worth anything.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict { .. } | Self::CannotAcquireLock { .. } | Self::Transport { .. } => true,

            Self::AccessDenied { .. }
            | Self::NotFound { .. }
            | Self::LockAlreadyHeld { .. }
            | Self::LockNotHeld
            | Self::BadStatus { .. }
            | Self::Protocol { .. }
            | Self::InvalidArgument { .. } => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn success_codes_pass() {
        assert!(ClientError::check_status(200, "u").is_ok());
        assert!(ClientError::check_status(201, "u").is_ok());
    }

    #[test]
    fn known_codes_map_to_their_kind() {
        assert!(matches!(
            ClientError::check_status(403, "u"),
            Err(ClientError::AccessDenied { .. })
        ));
        assert!(matches!(ClientError::check_status(404, "u"), Err(ClientError::NotFound { .. })));
        assert!(matches!(ClientError::check_status(409, "u"), Err(ClientError::Conflict { .. })));
    }

    #[test]
    fn unexpected_code_keeps_the_number() {
        let err = ClientError::check_status(503, "u").unwrap_err();
        assert!(matches!(err, ClientError::BadStatus { code: 503, .. }));
    }

    #[test]
    fn cannot_acquire_lock_is_retryable() {
        let err = ClientError::CannotAcquireLock {
            key: "k".to_string(),
            source: Box::new(ClientError::AccessDenied { url: "u".to_string() }),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn precondition_errors_are_not_retryable() {
        assert!(!ClientError::LockNotHeld.is_retryable());
        assert!(!ClientError::LockAlreadyHeld { held: "k".to_string() }.is_retryable());
    }

    #[test]
    fn error_display() {
        let err = ClientError::BadStatus { code: 418, url: "http://h/state".to_string() };
        assert_eq!(err.to_string(), "bad status 418: http://h/state");
    }

    proptest! {
        #[test]
        fn mapping_is_total(code in any::<u16>()) {
            let classified = ClientError::check_status(code, "u");
            if code == 200 || code == 201 {
                prop_assert!(classified.is_ok());
            } else {
                prop_assert!(classified.is_err());
            }
        }
    }
}
