//! Store client facade.
//!
//! Composes the transport, the lock session, and the wire entities into the
//! public operation set. Every operation that mutates a subtree checks the
//! local lock state first, then builds the wire path, then issues exactly
//! one request.

use arbor_proto::{Snapshot, State, path};
use serde_json::Value;

use crate::{
    config::ClientConfig,
    error::ClientError,
    lock::{LockSession, LockState},
    transport::Transport,
};

/// Client for a remote Arbor tree store.
///
/// Operations are synchronous and blocking; each performs one HTTP round
/// trip. Partial mutation (`write`, `read_uncommitted`, `remove`) requires
/// holding the lock. Full-tree replacement (`copy_in`) does not: it is its
/// own concurrency primitive, independent of the partial-update lock.
///
/// The lock transitions take `&mut self`, so one instance cannot be driven
/// into overlapping transitions from safe code. Cross-client exclusion is
/// the server's job via the lock itself.
pub struct StoreClient {
    transport: Transport,
    lock: LockSession,
}

impl StoreClient {
    /// Create a client for the configured server.
    ///
    /// No request is issued until the first operation.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        Ok(Self { transport: Transport::new(config)?, lock: LockSession::new() })
    }

    /// Fetch the server's current version pointer.
    pub fn state(&self) -> Result<State, ClientError> {
        let body = self.transport.get_json("state")?;
        State::decode(body).map_err(|e| self.protocol_error("state", &e))
    }

    /// Read the value at `path` in the committed tree.
    ///
    /// The path may carry one leading slash; an empty path reads the whole
    /// tree. Fails with [`ClientError::NotFound`] if the path is absent.
    pub fn read(&self, path: &str) -> Result<Value, ClientError> {
        self.transport.get_json(&path::join(["data", path::normalize(path)]))
    }

    /// Fetch a full snapshot of the committed tree.
    ///
    /// `None` means the store has nothing to offer yet, which is not an
    /// error.
    pub fn copy_out(&self) -> Result<Option<Snapshot>, ClientError> {
        let body = self.transport.get_json("copy")?;
        Snapshot::decode(body).map_err(|e| self.protocol_error("copy", &e))
    }

    /// Replace the entire remote tree with `snapshot`.
    pub fn copy_in(&self, snapshot: &Snapshot) -> Result<(), ClientError> {
        self.transport.put_json("copy", &snapshot.encode())
    }

    /// Write `value` at `path` in the pending working copy.
    ///
    /// Requires the lock. The write lands in the working copy and becomes
    /// visible to plain reads only after [`commit`](Self::commit).
    pub fn write(&self, path: &str, value: &Value) -> Result<(), ClientError> {
        self.transport.put_json(&self.update_path(path)?, value)
    }

    /// Read the value at `path` from the pending working copy.
    ///
    /// Requires the lock. Sees writes that have not been committed yet.
    pub fn read_uncommitted(&self, path: &str) -> Result<Value, ClientError> {
        self.transport.get_json(&self.update_path(path)?)
    }

    /// Remove the subtree at `path` from the pending working copy.
    ///
    /// Requires the lock. A failed removal (absent path) leaves the lock
    /// held; the caller decides whether to keep going or roll back.
    pub fn remove(&self, path: &str) -> Result<(), ClientError> {
        self.transport.delete(&self.update_path(path)?)
    }

    /// Acquire the exclusive-write lock under a caller-chosen key.
    ///
    /// # Errors
    ///
    /// [`ClientError::LockAlreadyHeld`] if this instance already holds a
    /// lock, [`ClientError::CannotAcquireLock`] if the server refused the
    /// key because someone else holds the lock.
    pub fn acquire_lock(&mut self, key: &str) -> Result<(), ClientError> {
        self.lock.acquire(&self.transport, key)
    }

    /// Re-acquire the held key, renewing any server-side lock TTL.
    pub fn refresh_lock(&mut self) -> Result<(), ClientError> {
        self.lock.refresh(&self.transport)
    }

    /// The key this instance holds, if any.
    pub fn lock_key(&self) -> Option<&str> {
        self.lock.key()
    }

    /// The lock state machine's current state.
    pub fn lock_state(&self) -> &LockState {
        self.lock.state()
    }

    /// Persist the pending working copy and release the lock.
    ///
    /// The local key is cleared whatever the remote outcome; see
    /// [`LockState`](crate::LockState) for the release policy.
    pub fn commit(&mut self) -> Result<(), ClientError> {
        self.lock.commit(&self.transport)
    }

    /// Discard the pending working copy and release the lock.
    ///
    /// Clears the local key unconditionally, like [`commit`](Self::commit).
    pub fn rollback(&mut self) -> Result<(), ClientError> {
        self.lock.rollback(&self.transport)
    }

    /// Ask the server which key currently holds the lock.
    ///
    /// This observes the server, not this instance: another client's key
    /// shows up here too. `None` means the lock is free.
    pub fn lock_holder(&self) -> Result<Option<String>, ClientError> {
        match self.transport.get_text("lock") {
            Ok(key) => Ok(Some(key)),
            Err(ClientError::NotFound { .. }) => Ok(None),
            Err(other) => Err(other),
        }
    }

    fn update_path(&self, path: &str) -> Result<String, ClientError> {
        let key = self.lock.key().ok_or(ClientError::LockNotHeld)?;
        Ok(path::join(["update", key, path::normalize(path)]))
    }

    fn protocol_error(&self, path: &str, reason: &impl std::fmt::Display) -> ClientError {
        ClientError::Protocol { url: self.transport.url(path), reason: reason.to_string() }
    }
}
