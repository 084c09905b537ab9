//! Fuzz target for wire entity decoding
//!
//! Decoders face server-controlled JSON and must reject without panicking
//!
//! # Strategy
//!
//! - Raw bytes: Arbitrary byte strings through the JSON parser into every
//!   decoder
//! - Shaped documents: Version-shaped documents built from arbitrary field
//!   values, where acceptance is predictable
//! - Path text: Arbitrary strings through normalize and join
//!
//! # Invariants
//!
//! - Decoders NEVER panic, whatever the document shape
//! - Whatever decodes re-encodes to a document that decodes equal
//! - A version-shaped document is accepted iff its sequence is non-negative
//! - `normalize` strips exactly one leading slash and nothing else
//! - `join` of two parts is fully determined by which parts are empty

#![no_main]

use arbitrary::Arbitrary;
use arbor_proto::{Info, Snapshot, State, Version, path};
use libfuzzer_sys::fuzz_target;
use serde_json::{Value, json};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    /// Raw document bytes for the unshaped probe.
    raw: Vec<u8>,
    /// Field values for the shaped probes.
    sequence: i64,
    checksum: String,
    /// Inputs for the path probes.
    path_a: String,
    path_b: String,
}

fuzz_target!(|input: FuzzInput| {
    // Unshaped probe: any parseable JSON goes through every decoder.
    if let Ok(value) = serde_json::from_slice::<Value>(&input.raw) {
        if let Ok(version) = Version::decode(value.clone()) {
            let again = Version::decode(version.encode()).expect("re-encoded version must decode");
            assert_eq!(again, version);
        }
        if let Ok(state) = State::decode(value.clone()) {
            let again = State::decode(state.encode()).expect("re-encoded state must decode");
            assert_eq!(again, state);
        }
        if let Ok(info) = Info::decode(value.clone()) {
            let again = Info::decode(info.encode()).expect("re-encoded info must decode");
            assert_eq!(again, info);
            assert_eq!(info.version().sequence, info.sequence);
        }
        if let Ok(Some(snapshot)) = Snapshot::decode(value) {
            let again = Snapshot::decode(snapshot.encode())
                .expect("re-encoded snapshot must decode")
                .expect("re-encoded snapshot is not null");
            assert_eq!(again, snapshot);
        }
    }

    // Shaped probe: acceptance depends only on the sequence sign.
    let shaped = json!({ "sequence": input.sequence, "checksum": input.checksum });
    assert_eq!(Version::decode(shaped.clone()).is_ok(), input.sequence >= 0);
    assert_eq!(Info::decode(shaped.clone()).is_ok(), input.sequence >= 0);
    assert_eq!(State::decode(json!({ "version": shaped })).is_ok(), input.sequence >= 0);

    // Null is the documented empty-store snapshot.
    assert_eq!(Snapshot::decode(Value::Null).expect("null must decode"), None);

    // Path probes.
    let a = input.path_a.as_str();
    let b = input.path_b.as_str();

    let normalized = path::normalize(a);
    if let Some(stripped) = a.strip_prefix('/') {
        assert_eq!(normalized, stripped);
    } else {
        assert_eq!(normalized, a);
    }

    let joined = path::join([a, b]);
    let expected = match (a.is_empty(), b.is_empty()) {
        (true, true) => String::new(),
        (false, true) => a.to_string(),
        (true, false) => b.to_string(),
        (false, false) => format!("{a}/{b}"),
    };
    assert_eq!(joined, expected);
});
