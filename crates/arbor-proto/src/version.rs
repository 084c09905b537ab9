//! Version pointer for committed tree states.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::EntityError;

/// A committed state of the tree: a monotonically increasing sequence number
/// plus a checksum of the tree content at that state.
///
/// Two versions are equal iff sequence and checksum both match. The sequence
/// is unsigned at the type level, so an in-process `Version` can never carry
/// a negative number; a negative value in server JSON fails [`Version::decode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Commit counter, bumped by one on every successful commit.
    pub sequence: u64,
    /// Checksum of the canonical encoding of the tree at this version.
    pub checksum: String,
}

impl Version {
    /// Create a version from its parts.
    pub fn new(sequence: u64, checksum: impl Into<String>) -> Self {
        Self { sequence, checksum: checksum.into() }
    }

    /// Decode from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::Malformed`] if either field is missing,
    /// mistyped, or the sequence is negative.
    pub fn decode(value: Value) -> Result<Self, EntityError> {
        serde_json::from_value(value).map_err(|e| EntityError::malformed("version", &e))
    }

    /// Encode to a JSON value using the fixed wire key names.
    pub fn encode(&self) -> Value {
        json!({ "sequence": self.sequence, "checksum": self.checksum })
    }
}
