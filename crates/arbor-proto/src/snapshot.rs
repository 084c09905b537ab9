//! Full-tree snapshots.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{error::EntityError, version::Version};

/// A full copy of the tree at a given version.
///
/// Exchanged wholesale: read with copy-out, written with copy-in (which
/// replaces the entire remote tree). The data is an arbitrary JSON tree; the
/// client enforces no schema on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Version the tree content corresponds to.
    pub version: Version,
    /// The whole tree.
    pub data: Value,
}

impl Snapshot {
    /// Create a snapshot from its parts.
    pub fn new(version: Version, data: Value) -> Self {
        Self { version, data }
    }

    /// Decode from a JSON value.
    ///
    /// A JSON null decodes to `None`: an empty store has no snapshot to
    /// offer and that is not a protocol failure. Anything else must carry
    /// both `"version"` and `"data"`.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::Malformed`] for any non-null value that does
    /// not match the snapshot shape.
    pub fn decode(value: Value) -> Result<Option<Self>, EntityError> {
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value).map(Some).map_err(|e| EntityError::malformed("snapshot", &e))
    }

    /// Encode to a JSON value using the fixed wire key names.
    pub fn encode(&self) -> Value {
        json!({ "version": self.version.encode(), "data": self.data })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    #[test]
    fn null_decodes_to_absent() {
        assert_eq!(Snapshot::decode(Value::Null).unwrap(), None);
    }

    #[test]
    fn object_decodes_to_snapshot() {
        let doc = json!({
            "version": { "sequence": 0, "checksum": "edcba" },
            "data": { "XXX": 256, "X": "bye" },
        });
        let snapshot = Snapshot::decode(doc).unwrap().unwrap();
        assert_eq!(snapshot.version, Version::new(0, "edcba"));
        assert_eq!(snapshot.data["XXX"], json!(256));
    }

    #[test]
    fn missing_data_fails() {
        let result = Snapshot::decode(json!({ "version": { "sequence": 0, "checksum": "c" } }));
        assert!(matches!(result, Err(EntityError::Malformed { entity: "snapshot", .. })));
    }

    #[test]
    fn scalar_document_fails() {
        assert!(Snapshot::decode(json!(42)).is_err());
    }

    fn tree_strategy() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<i64>().prop_map(|n| json!(n)),
            any::<bool>().prop_map(|b| json!(b)),
            "[a-z]{0,8}".prop_map(|s| json!(s)),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect()))
        })
    }

    proptest! {
        #[test]
        fn round_trip(sequence in any::<u64>(), data in tree_strategy()) {
            let snapshot = Snapshot::new(Version::new(sequence, "cs"), data);
            let decoded = Snapshot::decode(snapshot.encode()).unwrap().unwrap();
            prop_assert_eq!(snapshot, decoded);
        }
    }
}
