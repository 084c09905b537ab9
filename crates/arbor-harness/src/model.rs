//! Reference model for model-based testing.
//!
//! The model is a simplified implementation of the store semantics as a
//! client observes them, without HTTP in the way. It serves as the oracle
//! against which the real client and server are verified.
//!
//! # Design Principles
//!
//! - Simplicity: the model should be obviously correct
//! - Specification not implementation: captures WHAT, not HOW
//! - No clocks: lock expiry is out of scope, tests use long TTLs

use arbitrary::Arbitrary;
use serde_json::{Map, Value, json};

/// Session identifier (0-indexed).
pub type SessionId = u8;

/// Candidate lock keys, small so sessions collide on them.
const KEYS: &[&str] = &["alpha", "beta", "gamma"];

/// Candidate paths, chosen so operations nest, collide, and miss.
const PATHS: &[&str] = &[
    "app",
    "app/name",
    "app/port",
    "app/port/extra",
    "tags",
    "tags/0",
    "tags/5",
    "limits/cpu/max",
];

/// Expand a key selector to a concrete lock key.
#[must_use]
pub fn pick_key(key_id: u8) -> &'static str {
    KEYS[key_id as usize % KEYS.len()]
}

/// Expand a path selector to a concrete tree path.
#[must_use]
pub fn pick_path(path_id: u8) -> &'static str {
    PATHS[path_id as usize % PATHS.len()]
}

/// Expand a value seed to a concrete JSON value.
///
/// The shapes cycle through scalar, string, list, and map so paths with
/// list indices and nested writes all get exercised.
#[must_use]
pub fn pick_value(seed: u8) -> Value {
    match seed % 4 {
        0 => json!(i64::from(seed)),
        1 => json!(format!("v{seed}")),
        2 => json!([seed, 0]),
        _ => json!({ "n": seed }),
    }
}

/// Operations that can be applied to the system.
///
/// Selectors are raw bytes expanded through [`pick_key`], [`pick_path`],
/// and [`pick_value`], keeping the operation space small enough for
/// proptest to explore collisions.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Session acquires (or renews) the lock under a key.
    Acquire {
        /// Session performing the operation.
        session: SessionId,
        /// Key selector.
        key_id: u8,
    },
    /// Session renews the lock it believes it holds.
    Refresh {
        /// Session performing the operation.
        session: SessionId,
    },
    /// Session writes a value into its working copy.
    Write {
        /// Session performing the operation.
        session: SessionId,
        /// Path selector.
        path_id: u8,
        /// Value seed.
        value_seed: u8,
    },
    /// Session removes a subtree from its working copy.
    Remove {
        /// Session performing the operation.
        session: SessionId,
        /// Path selector.
        path_id: u8,
    },
    /// Read from the committed tree. Needs no lock.
    ReadCommitted {
        /// Path selector.
        path_id: u8,
    },
    /// Session reads from the pending working copy.
    ReadPending {
        /// Session performing the operation.
        session: SessionId,
        /// Path selector.
        path_id: u8,
    },
    /// Session publishes its working copy.
    Commit {
        /// Session performing the operation.
        session: SessionId,
    },
    /// Session discards its working copy.
    Rollback {
        /// Session performing the operation.
        session: SessionId,
    },
    /// Observe the committed sequence number.
    CheckSequence,
    /// Observe which key holds the lock.
    CheckHolder,
}

/// Client-observable outcome of one operation.
///
/// Both the model and the real stack reduce their results to this type;
/// a mismatch is a divergence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Operation succeeded with nothing to return.
    Ok,
    /// Operation succeeded and returned a value.
    Fetched(Value),
    /// The addressed thing does not exist.
    NotFound,
    /// The server refused the operation for lack of a valid lock.
    Denied,
    /// The lock is held under a different key.
    LockRefused,
    /// The session already holds a lock.
    AlreadyHeld,
    /// The session holds no lock.
    NoLock,
    /// Outcome outside the modeled space, always a divergence.
    Other,
}

impl Outcome {
    /// Whether the operation succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok | Self::Fetched(_))
    }
}

/// The reference model: one store, many sessions.
///
/// Tracks the server's committed and pending trees, the lock holder key,
/// and what each session believes about its own lock.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    committed: Value,
    pending: Value,
    sequence: u64,
    holder: Option<String>,
    sessions: Vec<Option<String>>,
}

impl ModelWorld {
    /// Fresh world with an empty store and `num_sessions` idle sessions.
    #[must_use]
    pub fn new(num_sessions: usize) -> Self {
        Self {
            committed: Value::Object(Map::new()),
            pending: Value::Object(Map::new()),
            sequence: 0,
            holder: None,
            sessions: vec![None; num_sessions],
        }
    }

    /// Committed sequence number.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Key currently holding the lock, if any.
    #[must_use]
    pub fn holder(&self) -> Option<&str> {
        self.holder.as_deref()
    }

    /// The committed tree.
    #[must_use]
    pub fn committed(&self) -> &Value {
        &self.committed
    }

    /// Key a session believes it holds.
    #[must_use]
    pub fn session_key(&self, session: SessionId) -> Option<&str> {
        self.sessions.get(session as usize).and_then(|slot| slot.as_deref())
    }

    /// Apply an operation and return the outcome the client would see.
    pub fn apply(&mut self, op: &Operation) -> Outcome {
        match op {
            Operation::Acquire { session, key_id } => self.acquire(*session, pick_key(*key_id)),
            Operation::Refresh { session } => self.refresh(*session),
            Operation::Write { session, path_id, value_seed } => {
                self.write(*session, pick_path(*path_id), pick_value(*value_seed))
            },
            Operation::Remove { session, path_id } => self.remove(*session, pick_path(*path_id)),
            Operation::ReadCommitted { path_id } => {
                match node_at(&self.committed, &split(pick_path(*path_id))) {
                    Some(value) => Outcome::Fetched(value.clone()),
                    None => Outcome::NotFound,
                }
            },
            Operation::ReadPending { session, path_id } => {
                self.read_pending(*session, pick_path(*path_id))
            },
            Operation::Commit { session } => self.release(*session, true),
            Operation::Rollback { session } => self.release(*session, false),
            Operation::CheckSequence => Outcome::Fetched(json!(self.sequence)),
            Operation::CheckHolder => match &self.holder {
                Some(key) => Outcome::Fetched(json!(key)),
                None => Outcome::NotFound,
            },
        }
    }

    fn acquire(&mut self, session: SessionId, key: &str) -> Outcome {
        let Some(slot) = self.sessions.get(session as usize) else {
            return Outcome::Other;
        };
        if slot.is_some() {
            return Outcome::AlreadyHeld;
        }
        let outcome = self.server_acquire(key);
        if outcome == Outcome::Ok {
            self.sessions[session as usize] = Some(key.to_string());
        }
        outcome
    }

    fn refresh(&mut self, session: SessionId) -> Outcome {
        let Some(key) = self.session_key(session).map(str::to_string) else {
            return Outcome::NoLock;
        };
        // The session keeps believing in its key whatever the server says.
        self.server_acquire(&key)
    }

    /// Server-side acquire: fresh acquire snapshots committed into pending,
    /// a same-key acquire just renews.
    fn server_acquire(&mut self, key: &str) -> Outcome {
        match &self.holder {
            Some(holder) if holder != key => Outcome::LockRefused,
            Some(_) => Outcome::Ok,
            None => {
                self.pending = self.committed.clone();
                self.holder = Some(key.to_string());
                Outcome::Ok
            },
        }
    }

    fn gate(&self, session: SessionId) -> Result<(), Outcome> {
        let Some(key) = self.session_key(session) else {
            return Err(Outcome::NoLock);
        };
        match &self.holder {
            Some(holder) if holder == key => Ok(()),
            _ => Err(Outcome::Denied),
        }
    }

    fn write(&mut self, session: SessionId, path: &str, value: Value) -> Outcome {
        if let Err(outcome) = self.gate(session) {
            return outcome;
        }
        if write_at(&mut self.pending, &split(path), value) { Outcome::Ok } else { Outcome::NotFound }
    }

    fn remove(&mut self, session: SessionId, path: &str) -> Outcome {
        if let Err(outcome) = self.gate(session) {
            return outcome;
        }
        if remove_at(&mut self.pending, &split(path)) { Outcome::Ok } else { Outcome::NotFound }
    }

    fn read_pending(&self, session: SessionId, path: &str) -> Outcome {
        if let Err(outcome) = self.gate(session) {
            return outcome;
        }
        match node_at(&self.pending, &split(path)) {
            Some(value) => Outcome::Fetched(value.clone()),
            None => Outcome::NotFound,
        }
    }

    /// Commit or rollback. The session forgets its key before the server
    /// answers, which is exactly what the client does.
    fn release(&mut self, session: SessionId, publish: bool) -> Outcome {
        let Some(slot) = self.sessions.get_mut(session as usize) else {
            return Outcome::Other;
        };
        let Some(key) = slot.take() else {
            return Outcome::NoLock;
        };
        if self.holder.as_deref() != Some(key.as_str()) {
            return Outcome::NotFound;
        }
        if publish {
            self.committed = std::mem::replace(&mut self.pending, Value::Object(Map::new()));
            self.sequence += 1;
        } else {
            self.pending = Value::Object(Map::new());
        }
        self.holder = None;
        Outcome::Ok
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|part| !part.is_empty()).collect()
}

fn index(part: &str) -> Option<usize> {
    part.parse().ok()
}

fn node_at<'a>(node: &'a Value, path: &[&str]) -> Option<&'a Value> {
    match path {
        [] => Some(node),
        [head, rest @ ..] => match node {
            Value::Object(map) => node_at(map.get(*head)?, rest),
            Value::Array(items) => node_at(items.get(index(head)?)?, rest),
            _ => None,
        },
    }
}

fn write_at(node: &mut Value, path: &[&str], value: Value) -> bool {
    match path {
        [] => {
            *node = value;
            true
        },
        [last] => match node {
            Value::Object(map) => {
                map.insert((*last).to_string(), value);
                true
            },
            Value::Array(items) => match index(last).and_then(|i| items.get_mut(i)) {
                Some(slot) => {
                    *slot = value;
                    true
                },
                None => false,
            },
            _ => false,
        },
        [head, rest @ ..] => {
            let child = match node {
                Value::Object(map) => {
                    map.entry((*head).to_string()).or_insert_with(|| Value::Object(Map::new()))
                },
                Value::Array(items) => match index(head).and_then(|i| items.get_mut(i)) {
                    Some(child) => child,
                    None => return false,
                },
                _ => return false,
            };
            write_at(child, rest, value)
        },
    }
}

fn remove_at(node: &mut Value, path: &[&str]) -> bool {
    match path {
        [] => {
            *node = Value::Object(Map::new());
            true
        },
        [last] => match node {
            Value::Object(map) => map.remove(*last).is_some(),
            Value::Array(items) => match index(last) {
                Some(i) if i < items.len() => {
                    items.remove(i);
                    true
                },
                _ => false,
            },
            _ => false,
        },
        [head, rest @ ..] => {
            let child = match node {
                Value::Object(map) => match map.get_mut(*head) {
                    Some(child) => child,
                    None => return false,
                },
                Value::Array(items) => match index(head).and_then(|i| items.get_mut(i)) {
                    Some(child) => child,
                    None => return false,
                },
                _ => return false,
            };
            remove_at(child, rest)
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn acquire_write_commit_publishes() {
        let mut world = ModelWorld::new(1);
        assert_eq!(world.apply(&Operation::Acquire { session: 0, key_id: 0 }), Outcome::Ok);
        assert_eq!(
            world.apply(&Operation::Write { session: 0, path_id: 1, value_seed: 0 }),
            Outcome::Ok
        );
        assert_eq!(world.apply(&Operation::Commit { session: 0 }), Outcome::Ok);
        assert_eq!(world.sequence(), 1);
        assert_eq!(
            world.apply(&Operation::ReadCommitted { path_id: 1 }),
            Outcome::Fetched(pick_value(0))
        );
    }

    #[test]
    fn second_session_with_other_key_is_refused() {
        let mut world = ModelWorld::new(2);
        assert_eq!(world.apply(&Operation::Acquire { session: 0, key_id: 0 }), Outcome::Ok);
        assert_eq!(
            world.apply(&Operation::Acquire { session: 1, key_id: 1 }),
            Outcome::LockRefused
        );
        assert_eq!(world.holder(), Some(pick_key(0)));
    }

    #[test]
    fn sessions_sharing_a_key_share_the_lock() {
        let mut world = ModelWorld::new(2);
        assert_eq!(world.apply(&Operation::Acquire { session: 0, key_id: 0 }), Outcome::Ok);
        assert_eq!(world.apply(&Operation::Acquire { session: 1, key_id: 0 }), Outcome::Ok);
        assert_eq!(
            world.apply(&Operation::Write { session: 1, path_id: 0, value_seed: 3 }),
            Outcome::Ok
        );
    }

    #[test]
    fn commit_forgets_the_session_key_even_when_refused() {
        let mut world = ModelWorld::new(2);
        assert_eq!(world.apply(&Operation::Acquire { session: 0, key_id: 0 }), Outcome::Ok);
        assert_eq!(world.apply(&Operation::Commit { session: 0 }), Outcome::Ok);
        // Session 0 believes nothing anymore; a second commit has no lock.
        assert_eq!(world.apply(&Operation::Commit { session: 0 }), Outcome::NoLock);
    }

    #[test]
    fn stale_session_is_denied_after_peer_commit() {
        let mut world = ModelWorld::new(2);
        assert_eq!(world.apply(&Operation::Acquire { session: 0, key_id: 0 }), Outcome::Ok);
        assert_eq!(world.apply(&Operation::Acquire { session: 1, key_id: 0 }), Outcome::Ok);
        assert_eq!(world.apply(&Operation::Commit { session: 0 }), Outcome::Ok);
        assert_eq!(
            world.apply(&Operation::Write { session: 1, path_id: 0, value_seed: 0 }),
            Outcome::Denied
        );
        // Refresh silently re-acquires now that the lock is free.
        assert_eq!(world.apply(&Operation::Refresh { session: 1 }), Outcome::Ok);
        assert_eq!(
            world.apply(&Operation::Write { session: 1, path_id: 0, value_seed: 0 }),
            Outcome::Ok
        );
    }

    #[test]
    fn write_without_lock_never_reaches_the_server() {
        let mut world = ModelWorld::new(1);
        assert_eq!(
            world.apply(&Operation::Write { session: 0, path_id: 0, value_seed: 0 }),
            Outcome::NoLock
        );
    }

    #[test]
    fn committed_reads_ignore_pending_writes() {
        let mut world = ModelWorld::new(1);
        assert_eq!(world.apply(&Operation::Acquire { session: 0, key_id: 2 }), Outcome::Ok);
        assert_eq!(
            world.apply(&Operation::Write { session: 0, path_id: 0, value_seed: 1 }),
            Outcome::Ok
        );
        assert_eq!(world.apply(&Operation::ReadCommitted { path_id: 0 }), Outcome::NotFound);
        assert_eq!(
            world.apply(&Operation::ReadPending { session: 0, path_id: 0 }),
            Outcome::Fetched(pick_value(1))
        );
    }

    #[test]
    fn rollback_discards_and_frees() {
        let mut world = ModelWorld::new(2);
        assert_eq!(world.apply(&Operation::Acquire { session: 0, key_id: 0 }), Outcome::Ok);
        assert_eq!(
            world.apply(&Operation::Write { session: 0, path_id: 0, value_seed: 0 }),
            Outcome::Ok
        );
        assert_eq!(world.apply(&Operation::Rollback { session: 0 }), Outcome::Ok);
        assert_eq!(world.sequence(), 0);
        assert_eq!(world.apply(&Operation::Acquire { session: 1, key_id: 1 }), Outcome::Ok);
        assert_eq!(
            world.apply(&Operation::ReadPending { session: 1, path_id: 0 }),
            Outcome::NotFound
        );
    }

    #[test]
    fn deep_writes_create_missing_map_nodes() {
        let mut world = ModelWorld::new(1);
        assert_eq!(world.apply(&Operation::Acquire { session: 0, key_id: 0 }), Outcome::Ok);
        // "limits/cpu/max" has no parents yet.
        assert_eq!(
            world.apply(&Operation::Write { session: 0, path_id: 7, value_seed: 0 }),
            Outcome::Ok
        );
        assert_eq!(
            world.apply(&Operation::ReadPending { session: 0, path_id: 7 }),
            Outcome::Fetched(pick_value(0))
        );
    }
}
