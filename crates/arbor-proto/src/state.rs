//! Server state envelopes.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{error::EntityError, version::Version};

/// The server's current version pointer.
///
/// Decoded from the state endpoint. Servers may attach extra top-level keys
/// (cluster membership, node metadata); decoding ignores anything outside
/// `"version"` so the envelope stays extensible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Version of the currently committed tree.
    pub version: Version,
}

impl State {
    /// Create a state wrapping the given version.
    pub fn new(version: Version) -> Self {
        Self { version }
    }

    /// Decode from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::Malformed`] if the `"version"` key is missing
    /// or does not decode as a [`Version`].
    pub fn decode(value: Value) -> Result<Self, EntityError> {
        serde_json::from_value(value).map_err(|e| EntityError::malformed("state", &e))
    }

    /// Encode to a JSON value.
    pub fn encode(&self) -> Value {
        json!({ "version": self.version.encode() })
    }
}

/// Superseded flat form of the server's version pointer.
///
/// Early servers reported `sequence` and `checksum` at the top level of the
/// document instead of nested under `"version"`. Kept so callers can still
/// decode documents produced by those servers, e.g. persisted store dumps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    /// Commit counter, same meaning as [`Version::sequence`].
    pub sequence: u64,
    /// Checksum of the tree, same meaning as [`Version::checksum`].
    pub checksum: String,
}

impl Info {
    /// Create an info from its parts.
    pub fn new(sequence: u64, checksum: impl Into<String>) -> Self {
        Self { sequence, checksum: checksum.into() }
    }

    /// Upgrade to the current nested form.
    pub fn version(&self) -> Version {
        Version::new(self.sequence, self.checksum.clone())
    }

    /// Decode from a JSON value.
    ///
    /// Extra keys (such as a trailing `"data"` tree in persisted dumps) are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::Malformed`] if either field is missing or
    /// mistyped.
    pub fn decode(value: Value) -> Result<Self, EntityError> {
        serde_json::from_value(value).map_err(|e| EntityError::malformed("info", &e))
    }

    /// Encode to a JSON value using the flat legacy key names.
    pub fn encode(&self) -> Value {
        json!({ "sequence": self.sequence, "checksum": self.checksum })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn state_decodes_nested_version() {
        let state =
            State::decode(json!({ "version": { "sequence": 4, "checksum": "abc" } })).unwrap();
        assert_eq!(state.version, Version::new(4, "abc"));
    }

    #[test]
    fn state_ignores_server_metadata() {
        let doc = json!({
            "version": { "sequence": 0, "checksum": "00" },
            "cluster": { "nodes": ["10.0.0.1:8001"] },
        });
        let state = State::decode(doc).unwrap();
        assert_eq!(state.version.sequence, 0);
    }

    #[test]
    fn state_without_version_fails() {
        let result = State::decode(json!({ "cluster": {} }));
        assert!(matches!(result, Err(EntityError::Malformed { entity: "state", .. })));
    }

    #[test]
    fn state_round_trip() {
        let state = State::new(Version::new(12, "ff00"));
        assert_eq!(State::decode(state.encode()).unwrap(), state);
    }

    #[test]
    fn info_decodes_flat_document() {
        let doc = json!({ "sequence": 9, "checksum": "0a", "data": { "k": 1 } });
        let info = Info::decode(doc).unwrap();
        assert_eq!(info, Info::new(9, "0a"));
    }

    #[test]
    fn info_upgrades_to_version() {
        let info = Info::new(3, "beef");
        assert_eq!(info.version(), Version::new(3, "beef"));
    }
}
