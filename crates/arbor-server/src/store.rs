//! In-memory versioned tree store.
//!
//! Two trees live here: the committed tree, immutable between commits, and a
//! pending working copy created when the lock is acquired. Partial writes
//! and removals touch only the pending tree; commit swaps it in, bumps the
//! sequence number, and recomputes the checksum.
//!
//! # Invariants
//!
//! - At most one lock key is valid at a time.
//! - A lock not renewed within the TTL expires, and its pending tree is
//!   dropped with it.
//! - The committed tree only changes through `commit` or `install`.

use std::time::{Duration, Instant};

use arbor_proto::{Snapshot, State, Version};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Checksum of the canonical encoding of a tree.
///
/// Object keys are kept sorted by `serde_json`, so equal trees always
/// produce equal checksums.
pub fn checksum(tree: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tree.to_string());
    format!("{:x}", hasher.finalize())
}

fn empty_tree() -> Value {
    Value::Object(Map::new())
}

struct LockGrant {
    key: String,
    renewed_at: Instant,
}

/// The store: committed tree, pending working copy, version, lock.
pub struct TreeStore {
    committed: Value,
    version: Version,
    pending: Value,
    lock: Option<LockGrant>,
    lock_ttl: Duration,
}

impl TreeStore {
    /// Empty store at sequence 0 with the given lock TTL.
    pub fn new(lock_ttl: Duration) -> Self {
        let committed = empty_tree();
        let version = Version::new(0, checksum(&committed));
        Self { committed, version, pending: empty_tree(), lock: None, lock_ttl }
    }

    /// The key currently holding the lock, if any.
    ///
    /// Expires a stale lock as a side effect, dropping its pending tree.
    pub fn lock_holder(&mut self) -> Option<String> {
        self.expire_stale();
        self.lock.as_ref().map(|grant| grant.key.clone())
    }

    /// Try to acquire or renew the lock.
    ///
    /// Re-acquiring with the held key is idempotent: the TTL restarts and
    /// the pending tree is kept. A fresh acquire snapshots the committed
    /// tree into the working copy.
    pub fn try_acquire(&mut self, key: &str) -> bool {
        self.expire_stale();
        match &mut self.lock {
            Some(grant) if grant.key != key => false,
            Some(grant) => {
                grant.renewed_at = Instant::now();
                true
            },
            None => {
                self.pending = self.committed.clone();
                self.lock = Some(LockGrant { key: key.to_string(), renewed_at: Instant::now() });
                true
            },
        }
    }

    /// Promote the pending tree to committed and release the lock.
    ///
    /// Returns false when no lock is held (including a lock that just
    /// expired).
    pub fn commit(&mut self) -> bool {
        if self.lock_holder().is_none() {
            return false;
        }
        self.committed = std::mem::replace(&mut self.pending, empty_tree());
        // Saturating: an installed snapshot may carry any sequence, including
        // the maximum.
        let sequence = self.version.sequence.saturating_add(1);
        self.version = Version::new(sequence, checksum(&self.committed));
        self.lock = None;
        true
    }

    /// Discard the pending tree and release the lock.
    pub fn rollback(&mut self) -> bool {
        if self.lock_holder().is_none() {
            return false;
        }
        self.pending = empty_tree();
        self.lock = None;
        true
    }

    /// Value at `path` in the committed tree. An empty path is the root.
    pub fn read(&self, path: &[&str]) -> Option<&Value> {
        traverse(&self.committed, path)
    }

    /// Value at `path` in the pending working copy.
    pub fn read_pending(&self, path: &[&str]) -> Option<&Value> {
        traverse(&self.pending, path)
    }

    /// Write `value` at `path` in the pending working copy.
    ///
    /// Missing map nodes along the way are created; descending through an
    /// existing scalar leaf or a bad list index fails. An empty path
    /// replaces the whole working copy.
    pub fn write_pending(&mut self, path: &[&str], value: Value) -> bool {
        write_at(&mut self.pending, path, value)
    }

    /// Remove the subtree at `path` from the pending working copy.
    ///
    /// An empty path clears the working copy to an empty tree.
    pub fn remove_pending(&mut self, path: &[&str]) -> bool {
        remove_at(&mut self.pending, path)
    }

    /// Replace the committed tree and version wholesale (copy-in).
    pub fn install(&mut self, version: Version, data: Value) {
        self.committed = data;
        self.version = version;
    }

    /// The current version pointer.
    pub fn state(&self) -> State {
        State::new(self.version.clone())
    }

    /// Full snapshot of the committed tree.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.version.clone(), self.committed.clone())
    }

    fn expire_stale(&mut self) {
        let stale = self.lock.as_ref().is_some_and(|g| g.renewed_at.elapsed() > self.lock_ttl);
        if stale {
            self.lock = None;
            self.pending = empty_tree();
        }
    }
}

/// Walk `path` down from `root`: maps by key, lists by integer index.
fn traverse<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut node = root;
    for part in path {
        node = match node {
            Value::Object(map) => map.get(*part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

fn write_at(root: &mut Value, path: &[&str], value: Value) -> bool {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return true;
    };
    let mut node = root;
    for part in parents {
        node = match node {
            Value::Object(map) => {
                map.entry((*part).to_string()).or_insert_with(|| Value::Object(Map::new()))
            },
            Value::Array(items) => match part.parse::<usize>().ok().and_then(|i| items.get_mut(i))
            {
                Some(slot) => slot,
                None => return false,
            },
            _ => return false,
        };
    }
    match node {
        Value::Object(map) => {
            map.insert((*last).to_string(), value);
            true
        },
        Value::Array(items) => match last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            Some(slot) => {
                *slot = value;
                true
            },
            None => false,
        },
        _ => false,
    }
}

fn remove_at(root: &mut Value, path: &[&str]) -> bool {
    let Some((last, parents)) = path.split_last() else {
        *root = Value::Object(Map::new());
        return true;
    };
    let mut node = root;
    for part in parents {
        node = match node {
            Value::Object(map) => match map.get_mut(*part) {
                Some(child) => child,
                None => return false,
            },
            Value::Array(items) => match part.parse::<usize>().ok().and_then(|i| items.get_mut(i))
            {
                Some(child) => child,
                None => return false,
            },
            _ => return false,
        };
    }
    match node {
        Value::Object(map) => map.remove(*last).is_some(),
        Value::Array(items) => match last.parse::<usize>() {
            Ok(index) if index < items.len() => {
                items.remove(index);
                true
            },
            _ => false,
        },
        _ => false,
    }
}
