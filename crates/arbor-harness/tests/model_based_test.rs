//! Model-based property tests.
//!
//! These tests generate random operation sequences and verify that the real
//! client and server behave identically to the reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!      ModelWorld      RealWorld      Compare
//!      (reference)   (HTTP loopback)  Outcomes
//! ```

use arbor_client::{ClientConfig, ClientError, StoreClient};
use arbor_harness::{
    ModelWorld, Operation, Outcome, SessionId, TestServer, pick_key, pick_path, pick_value,
};
use proptest::prelude::*;
use serde_json::{Value, json};

/// Real system wrapper that mirrors ModelWorld's interface.
///
/// One server, one client per session. Outcomes are reduced through the
/// same [`Outcome`] type the model produces, so a plain equality check
/// catches divergence.
struct RealWorld {
    clients: Vec<StoreClient>,
    // Dropping the server tears the stack down, so it rides along.
    _server: TestServer,
}

impl RealWorld {
    fn new(num_sessions: usize) -> Self {
        let server = TestServer::start().expect("server start failed");
        let clients = (0..num_sessions)
            .map(|_| {
                StoreClient::new(&ClientConfig::new("127.0.0.1", server.port()))
                    .expect("client build failed")
            })
            .collect();
        Self { clients, _server: server }
    }

    fn apply(&mut self, op: &Operation) -> Outcome {
        match op {
            Operation::Acquire { session, key_id } => {
                let key = pick_key(*key_id);
                unit_outcome(self.client(*session).acquire_lock(key))
            },
            Operation::Refresh { session } => unit_outcome(self.client(*session).refresh_lock()),
            Operation::Write { session, path_id, value_seed } => {
                let value = pick_value(*value_seed);
                unit_outcome(self.client(*session).write(pick_path(*path_id), &value))
            },
            Operation::Remove { session, path_id } => {
                unit_outcome(self.client(*session).remove(pick_path(*path_id)))
            },
            Operation::ReadCommitted { path_id } => {
                value_outcome(self.clients[0].read(pick_path(*path_id)))
            },
            Operation::ReadPending { session, path_id } => {
                value_outcome(self.client(*session).read_uncommitted(pick_path(*path_id)))
            },
            Operation::Commit { session } => unit_outcome(self.client(*session).commit()),
            Operation::Rollback { session } => unit_outcome(self.client(*session).rollback()),
            Operation::CheckSequence => match self.clients[0].state() {
                Ok(state) => Outcome::Fetched(json!(state.version.sequence)),
                Err(err) => error_outcome(&err),
            },
            Operation::CheckHolder => match self.clients[0].lock_holder() {
                Ok(Some(key)) => Outcome::Fetched(json!(key)),
                Ok(None) => Outcome::NotFound,
                Err(err) => error_outcome(&err),
            },
        }
    }

    fn client(&mut self, session: SessionId) -> &mut StoreClient {
        &mut self.clients[session as usize]
    }
}

fn unit_outcome(result: Result<(), ClientError>) -> Outcome {
    match result {
        Ok(()) => Outcome::Ok,
        Err(err) => error_outcome(&err),
    }
}

fn value_outcome(result: Result<Value, ClientError>) -> Outcome {
    match result {
        Ok(value) => Outcome::Fetched(value),
        Err(err) => error_outcome(&err),
    }
}

fn error_outcome(err: &ClientError) -> Outcome {
    match err {
        ClientError::NotFound { .. } => Outcome::NotFound,
        ClientError::AccessDenied { .. } => Outcome::Denied,
        ClientError::CannotAcquireLock { .. } => Outcome::LockRefused,
        ClientError::LockAlreadyHeld { .. } => Outcome::AlreadyHeld,
        ClientError::LockNotHeld => Outcome::NoLock,
        _ => Outcome::Other,
    }
}

/// Strategy for generating operations over a few sessions.
fn operation_strategy(num_sessions: usize) -> impl Strategy<Value = Operation> {
    let session = 0..num_sessions as u8;
    let selector = any::<u8>();

    prop_oneof![
        // Weight towards writes and lock traffic
        3 => (session.clone(), selector.clone())
            .prop_map(|(session, key_id)| Operation::Acquire { session, key_id }),
        2 => session.clone().prop_map(|session| Operation::Refresh { session }),
        5 => (session.clone(), selector.clone(), selector.clone()).prop_map(
            |(session, path_id, value_seed)| Operation::Write { session, path_id, value_seed }
        ),
        2 => (session.clone(), selector.clone())
            .prop_map(|(session, path_id)| Operation::Remove { session, path_id }),
        2 => selector.clone().prop_map(|path_id| Operation::ReadCommitted { path_id }),
        3 => (session.clone(), selector.clone())
            .prop_map(|(session, path_id)| Operation::ReadPending { session, path_id }),
        3 => session.clone().prop_map(|session| Operation::Commit { session }),
        1 => session.clone().prop_map(|session| Operation::Rollback { session }),
        1 => Just(Operation::CheckSequence),
        1 => Just(Operation::CheckHolder),
    ]
}

/// Clamp the session to the valid range for the given session count.
fn clamp_session(op: Operation, num_sessions: usize) -> Operation {
    let clamp = |session: SessionId| session % num_sessions as u8;
    match op {
        Operation::Acquire { session, key_id } => {
            Operation::Acquire { session: clamp(session), key_id }
        },
        Operation::Refresh { session } => Operation::Refresh { session: clamp(session) },
        Operation::Write { session, path_id, value_seed } => {
            Operation::Write { session: clamp(session), path_id, value_seed }
        },
        Operation::Remove { session, path_id } => {
            Operation::Remove { session: clamp(session), path_id }
        },
        Operation::ReadPending { session, path_id } => {
            Operation::ReadPending { session: clamp(session), path_id }
        },
        Operation::Commit { session } => Operation::Commit { session: clamp(session) },
        Operation::Rollback { session } => Operation::Rollback { session: clamp(session) },
        other => other,
    }
}

proptest! {
    // Every case boots a real server, so the case count stays modest.
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Verify that operation outcomes match between model and real stack.
    ///
    /// This is the core model-based test. It generates random operation
    /// sequences and asserts that both worlds produce identical outcomes,
    /// fetched values included.
    #[test]
    fn prop_real_matches_model(
        num_sessions in 1..4usize,
        ops in prop::collection::vec(operation_strategy(3), 0..40)
    ) {
        let mut model = ModelWorld::new(num_sessions);
        let mut real = RealWorld::new(num_sessions);

        for (i, op) in ops.iter().enumerate() {
            let op = clamp_session(op.clone(), num_sessions);

            let model_outcome = model.apply(&op);
            let real_outcome = real.apply(&op);

            prop_assert_eq!(
                &model_outcome,
                &real_outcome,
                "Divergence at operation {}: {:?}\nModel: {:?}\nReal: {:?}",
                i, op, model_outcome, real_outcome
            );
        }
    }
}

proptest! {
    /// Verify the sequence number moves only on successful commits, and
    /// then by exactly one.
    #[test]
    fn prop_sequence_advances_only_on_commit(
        num_sessions in 1..4usize,
        ops in prop::collection::vec(operation_strategy(3), 0..100)
    ) {
        let mut model = ModelWorld::new(num_sessions);

        for op in ops {
            let op = clamp_session(op, num_sessions);
            let before = model.sequence();
            let outcome = model.apply(&op);
            let after = model.sequence();

            if matches!(op, Operation::Commit { .. }) && outcome == Outcome::Ok {
                prop_assert_eq!(after, before + 1, "commit must bump the sequence: {:?}", op);
            } else {
                prop_assert_eq!(after, before, "only a commit may move the sequence: {:?}", op);
            }
        }
    }

    /// Verify a successful release always frees the lock.
    #[test]
    fn prop_release_frees_the_lock(
        num_sessions in 1..4usize,
        ops in prop::collection::vec(operation_strategy(3), 0..100)
    ) {
        let mut model = ModelWorld::new(num_sessions);

        for op in ops {
            let op = clamp_session(op, num_sessions);
            let outcome = model.apply(&op);

            if matches!(op, Operation::Commit { .. } | Operation::Rollback { .. })
                && outcome == Outcome::Ok
            {
                prop_assert_eq!(model.holder(), None, "lock must be free after release");
            }
        }
    }

    /// Verify the committed tree never changes without a successful commit.
    #[test]
    fn prop_committed_tree_needs_a_commit(
        num_sessions in 1..4usize,
        ops in prop::collection::vec(operation_strategy(3), 0..100)
    ) {
        let mut model = ModelWorld::new(num_sessions);
        let mut committed_once = false;

        for op in ops {
            let op = clamp_session(op, num_sessions);
            let outcome = model.apply(&op);
            if matches!(op, Operation::Commit { .. }) && outcome == Outcome::Ok {
                committed_once = true;
            }
        }

        if !committed_once {
            prop_assert_eq!(model.committed(), &json!({}), "no commit, no visible writes");
        }
    }
}

#[cfg(test)]
mod smoke_tests {
    use super::*;

    /// Fixed scenario through both worlds, no generation involved.
    #[test]
    fn real_and_model_agree_on_a_fixed_scenario() {
        let ops = [
            Operation::CheckSequence,
            Operation::Acquire { session: 0, key_id: 0 },
            Operation::Write { session: 0, path_id: 1, value_seed: 4 },
            Operation::ReadPending { session: 0, path_id: 1 },
            Operation::ReadCommitted { path_id: 1 },
            Operation::Acquire { session: 1, key_id: 1 },
            Operation::CheckHolder,
            Operation::Commit { session: 0 },
            Operation::ReadCommitted { path_id: 1 },
            Operation::CheckSequence,
            Operation::Commit { session: 0 },
        ];

        let mut model = ModelWorld::new(2);
        let mut real = RealWorld::new(2);

        for (i, op) in ops.iter().enumerate() {
            let model_outcome = model.apply(op);
            let real_outcome = real.apply(op);
            assert_eq!(model_outcome, real_outcome, "divergence at operation {i}: {op:?}");
        }
    }
}
