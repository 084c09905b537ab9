//! Test harness for the Arbor client and protocol.
//!
//! [`TestServer`] runs the reference server on a background thread with a
//! runtime of its own; the blocking client cannot run inside a runtime, so
//! tests drive it from plain test threads against that server.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and the real stack,
//! and their observable outcomes are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;

pub use model::{ModelWorld, Operation, Outcome, SessionId, pick_key, pick_path, pick_value};

use std::io;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use arbor_server::{AppState, Server, ServerConfig};

type Ready = io::Result<(u16, AppState)>;

/// Reference server running on its own thread, shut down on drop.
pub struct TestServer {
    port: u16,
    state: AppState,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    /// Start on a free port with the default 30 second lock TTL.
    pub fn start() -> io::Result<Self> {
        Self::with_lock_ttl(Duration::from_secs(30))
    }

    /// Start with a custom lock TTL, for lease expiry tests.
    pub fn with_lock_ttl(lock_ttl: Duration) -> io::Result<Self> {
        let config = ServerConfig { bind_address: "127.0.0.1:0".to_string(), lock_ttl };
        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let thread = thread::spawn(move || serve(config, &ready_tx, shutdown_rx));
        let (port, state) = ready_rx
            .recv()
            .map_err(|_| io::Error::other("server thread exited before binding"))??;
        Ok(Self { port, state, shutdown: Some(shutdown_tx), thread: Some(thread) })
    }

    /// Port the server is listening on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Arm a one-shot fault: the next request fails with `status_code`.
    pub fn fail_next(&self, status_code: u16) {
        self.state.fail_next(status_code);
    }

    /// Handler state of the running server.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Thread body: bind, report the port back, serve until shutdown.
fn serve(
    config: ServerConfig,
    ready: &mpsc::Sender<Ready>,
    shutdown: tokio::sync::oneshot::Receiver<()>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        },
    };
    runtime.block_on(async move {
        let server = match Server::bind(config).await {
            Ok(server) => server,
            Err(err) => {
                let _ = ready.send(Err(err));
                return;
            },
        };
        let port = match server.local_addr() {
            Ok(addr) => addr.port(),
            Err(err) => {
                let _ = ready.send(Err(err));
                return;
            },
        };
        let _ = ready.send(Ok((port, server.state().clone())));
        let _ = server
            .run_until(async move {
                let _ = shutdown.await;
            })
            .await;
    });
}
