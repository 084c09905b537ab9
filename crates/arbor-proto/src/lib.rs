//! Arbor protocol entities.
//!
//! Wire-level value types for the Arbor versioned tree store: the
//! `(sequence, checksum)` version pointer, the server state envelope, full
//! tree snapshots, and slash-path handling for URL construction.
//!
//! # Architecture
//!
//! Every entity carries a symmetric decode/encode pair over fixed key names
//! (`"sequence"`, `"checksum"`, `"version"`, `"data"`). Decoding is strict:
//! a missing or mistyped field fails with [`EntityError`] instead of
//! substituting a default, and a negative sequence number is rejected at the
//! decode boundary because [`Version`] stores it unsigned. The one documented
//! exception is [`Snapshot`], whose decode accepts a JSON null as "store is
//! empty".

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
pub mod path;
mod snapshot;
mod state;
mod version;

pub use error::EntityError;
pub use snapshot::Snapshot;
pub use state::{Info, State};
pub use version::Version;
