//! Exclusive-write lock session.
//!
//! # Invariants
//!
//! - At most one lock key is held per client instance.
//! - Every state transition goes through exactly one method, so the
//!   two-state machine is auditable by reading four functions.
//! - Commit and rollback clear the local key before the remote call is
//!   attempted, so a failed release never leaves the client believing it
//!   still owns a lock the server may have discarded.

use arbor_proto::path;

use crate::{error::ClientError, transport::Transport};

/// Local view of the exclusive-write lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// No key held; partial mutation is refused locally.
    Unlocked,
    /// Holding the lock under the contained caller-chosen key.
    Locked(String),
}

impl LockState {
    /// The held key, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Unlocked => None,
            Self::Locked(key) => Some(key),
        }
    }
}

/// State machine governing exclusive-write access for one client instance.
#[derive(Debug)]
pub(crate) struct LockSession {
    state: LockState,
}

impl LockSession {
    pub(crate) fn new() -> Self {
        Self { state: LockState::Unlocked }
    }

    #[cfg(test)]
    fn holding(key: &str) -> Self {
        Self { state: LockState::Locked(key.to_string()) }
    }

    pub(crate) fn key(&self) -> Option<&str> {
        self.state.key()
    }

    pub(crate) fn state(&self) -> &LockState {
        &self.state
    }

    /// Transition `Unlocked` to `Locked(key)`.
    ///
    /// The state only changes after the server accepted the key; a denied or
    /// failed acquire leaves the session `Unlocked`.
    pub(crate) fn acquire(&mut self, transport: &Transport, key: &str) -> Result<(), ClientError> {
        if key.is_empty() {
            // The release endpoints embed the key in the URL, so a lock
            // taken with an empty key could never be committed or rolled
            // back.
            return Err(ClientError::InvalidArgument {
                reason: "lock key must not be empty".to_string(),
            });
        }
        if let LockState::Locked(held) = &self.state {
            return Err(ClientError::LockAlreadyHeld { held: held.clone() });
        }
        send_acquire(transport, key)?;
        self.state = LockState::Locked(key.to_string());
        Ok(())
    }

    /// Re-issue the acquire for the held key.
    ///
    /// Acquiring the same key again is idempotent on the server and renews
    /// any lock TTL. The state stays `Locked` even when the refresh fails;
    /// the server may still honor the key.
    pub(crate) fn refresh(&mut self, transport: &Transport) -> Result<(), ClientError> {
        let LockState::Locked(key) = &self.state else {
            return Err(ClientError::LockNotHeld);
        };
        send_acquire(transport, key)
    }

    /// Release the lock, asking the server to persist pending changes.
    pub(crate) fn commit(&mut self, transport: &Transport) -> Result<(), ClientError> {
        let key = self.take_key()?;
        transport.put_text(&path::join(["lock", &key]), "")
    }

    /// Release the lock, asking the server to discard pending changes.
    pub(crate) fn rollback(&mut self, transport: &Transport) -> Result<(), ClientError> {
        let key = self.take_key()?;
        transport.delete(&path::join(["lock", &key]))
    }

    /// Take the held key, leaving the session `Unlocked`.
    ///
    /// Runs before the release request goes out, which is what makes the
    /// local release unconditional.
    fn take_key(&mut self) -> Result<String, ClientError> {
        match std::mem::replace(&mut self.state, LockState::Unlocked) {
            LockState::Locked(key) => Ok(key),
            LockState::Unlocked => Err(ClientError::LockNotHeld),
        }
    }
}

/// PUT the raw key to the lock endpoint.
///
/// A 403 comes back as `CannotAcquireLock` carrying the denial, because the
/// caller's intent was locking rather than data access.
fn send_acquire(transport: &Transport, key: &str) -> Result<(), ClientError> {
    match transport.put_text("lock", key) {
        Ok(()) => Ok(()),
        Err(denied @ ClientError::AccessDenied { .. }) => Err(ClientError::CannotAcquireLock {
            key: key.to_string(),
            source: Box::new(denied),
        }),
        Err(other) => Err(other),
    }
}
