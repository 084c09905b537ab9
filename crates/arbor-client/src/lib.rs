//! Arbor client.
//!
//! Synchronous client for the Arbor versioned tree store. The store holds a
//! JSON tree addressed by slash-separated paths; every committed state
//! carries a `(sequence, checksum)` version, and partial mutation is
//! serialized through a single advisory lock held by one client at a time.
//!
//! # Architecture
//!
//! - [`StoreClient`]: public facade; every operation is one blocking HTTP
//!   round trip
//! - [`LockState`]: the client's two-state lock machine (`Unlocked` or
//!   `Locked` with a caller-chosen key)
//! - [`ClientError`]: closed failure taxonomy callers can branch on
//! - [`ClientConfig`]: host, port, and timeouts
//!
//! Mutating a subtree follows acquire, write, commit:
//!
//! ```rust,ignore
//! let mut client = StoreClient::new(&ClientConfig::new("127.0.0.1", 8001))?;
//! client.acquire_lock("deploy-42")?;
//! client.write("jobs/active", &serde_json::json!(3))?;
//! client.commit()?;
//! ```
//!
//! # Invariants
//!
//! - At most one lock key is held per client instance.
//! - Commit and rollback always clear the local key, even when the remote
//!   call fails.
//! - Every status code outside {200, 201} maps to a defined error.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod config;
mod error;
mod lock;
mod transport;

pub use arbor_proto::{EntityError, Info, Snapshot, State, Version};
pub use client::StoreClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use lock::LockState;
