//! Fuzz target for the tree store
//!
//! Drive the store through arbitrary operation sequences and check its
//! version and lock invariants after every step
//!
//! # Strategy
//!
//! - Operation sequences: Arbitrary interleavings of acquire, write,
//!   remove, read, commit, rollback, and verbatim installs
//! - Hostile paths: Arbitrary segment strings, including numeric lookalikes
//!   and empty segments
//! - Hostile versions: Installed sequences up to the maximum
//!
//! # Invariants
//!
//! - NEVER panic, whatever the path or value shape
//! - The sequence number moves only on commit or install, commits by one
//! - A commit leaves the checksum matching the committed content
//! - Commit and rollback succeed iff the lock is held, and always free it
//! - A contending key is refused and the holder is unchanged
//! - Pending writes and removals never touch the committed tree
//! - The committed root always reads

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use arbor_proto::Version;
use arbor_server::{TreeStore, store::checksum};
use libfuzzer_sys::fuzz_target;
use serde_json::{Value, json};

#[derive(Debug, Arbitrary)]
enum FuzzValue {
    Null,
    Flag(bool),
    Number(i64),
    Text(String),
    List(Vec<i64>),
    Table(Vec<(String, i64)>),
}

impl FuzzValue {
    fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Flag(flag) => json!(flag),
            Self::Number(number) => json!(number),
            Self::Text(text) => json!(text),
            Self::List(items) => json!(items),
            Self::Table(pairs) => {
                Value::Object(pairs.iter().map(|(key, n)| (key.clone(), json!(n))).collect())
            },
        }
    }
}

#[derive(Debug, Arbitrary)]
enum StoreOp {
    Acquire { key_id: u8 },
    Commit,
    Rollback,
    Read { path: Vec<String> },
    ReadPending { path: Vec<String> },
    Write { path: Vec<String>, value: FuzzValue },
    Remove { path: Vec<String> },
    Install { sequence: u64, data: FuzzValue },
    Holder,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    ops: Vec<StoreOp>,
}

fn key_for(key_id: u8) -> &'static str {
    ["alpha", "beta", "gamma"][key_id as usize % 3]
}

fn borrow(path: &[String]) -> Vec<&str> {
    path.iter().map(String::as_str).collect()
}

fuzz_target!(|input: FuzzInput| {
    // TTL long enough that expiry never fires within one run.
    let mut store = TreeStore::new(Duration::from_secs(3600));
    let mut expected_sequence: u64 = 0;

    for op in &input.ops {
        match op {
            StoreOp::Acquire { key_id } => {
                let key = key_for(*key_id);
                let holder_before = store.lock_holder();
                let granted = store.try_acquire(key);
                match holder_before {
                    None => assert!(granted, "free lock must be granted"),
                    Some(held) if held == key => assert!(granted, "same key must renew"),
                    Some(held) => {
                        assert!(!granted, "contending key must be refused");
                        assert_eq!(store.lock_holder().as_deref(), Some(held.as_str()));
                    },
                }
                if granted {
                    assert_eq!(store.lock_holder().as_deref(), Some(key));
                }
            },
            StoreOp::Commit => {
                let held = store.lock_holder().is_some();
                let committed = store.commit();
                assert_eq!(committed, held, "commit succeeds iff the lock is held");
                if committed {
                    expected_sequence = expected_sequence.saturating_add(1);
                    assert_eq!(store.lock_holder(), None, "commit must free the lock");
                    assert_eq!(
                        store.state().version.checksum,
                        checksum(&store.snapshot().data),
                        "checksum must match the committed content"
                    );
                }
            },
            StoreOp::Rollback => {
                let held = store.lock_holder().is_some();
                let rolled = store.rollback();
                assert_eq!(rolled, held, "rollback succeeds iff the lock is held");
                if rolled {
                    assert_eq!(store.lock_holder(), None, "rollback must free the lock");
                }
            },
            StoreOp::Read { path } => {
                let _ = store.read(&borrow(path));
            },
            StoreOp::ReadPending { path } => {
                let _ = store.read_pending(&borrow(path));
            },
            StoreOp::Write { path, value } => {
                let before = store.snapshot().data;
                let _ = store.write_pending(&borrow(path), value.to_value());
                assert_eq!(store.snapshot().data, before, "writes never touch the committed tree");
            },
            StoreOp::Remove { path } => {
                let before = store.snapshot().data;
                let _ = store.remove_pending(&borrow(path));
                assert_eq!(
                    store.snapshot().data,
                    before,
                    "removals never touch the committed tree"
                );
            },
            StoreOp::Install { sequence, data } => {
                store.install(Version::new(*sequence, "installed"), data.to_value());
                expected_sequence = *sequence;
            },
            StoreOp::Holder => {
                let _ = store.lock_holder();
            },
        }

        assert_eq!(store.state().version.sequence, expected_sequence, "sequence tracks commits");
        assert!(store.read(&[]).is_some(), "the committed root always reads");
    }
});
