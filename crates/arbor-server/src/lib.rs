//! Arbor reference server.
//!
//! In-memory implementation of the Arbor wire contract, built for the test
//! harness and for poking at the protocol by hand. Data lives in process
//! memory and dies with it; persistence and cluster replication are out of
//! scope.
//!
//! # Architecture
//!
//! - [`TreeStore`]: committed tree, pending working copy, and the advisory
//!   lock with its TTL
//! - [`service`]: axum router translating store outcomes into the status
//!   codes the protocol defines
//! - [`AppState`]: shared store handle, also carrying the fault-injection
//!   hook the harness uses
//! - [`Server`]: bound listener ready to serve the router

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

pub mod service;
pub mod store;

pub use service::{AppState, router};
pub use store::TreeStore;

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to, e.g. "127.0.0.1:8001".
    pub bind_address: String,
    /// Lock lease: a lock not renewed for this long expires and its pending
    /// changes are dropped.
    pub lock_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_address: "127.0.0.1:8001".to_string(), lock_ttl: Duration::from_secs(30) }
    }
}

/// A bound Arbor server, ready to serve requests.
pub struct Server {
    listener: tokio::net::TcpListener,
    state: AppState,
}

impl Server {
    /// Create and bind a new server.
    ///
    /// Binding to port 0 picks a free port; read it back through
    /// [`Server::local_addr`].
    pub async fn bind(config: ServerConfig) -> io::Result<Self> {
        let state = AppState::new(config.lock_ttl);
        let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
        Ok(Self { listener, state })
    }

    /// The local address the server is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handler state, exposed for test seeding and fault injection.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until an accept error occurs.
    pub async fn run(self) -> io::Result<()> {
        tracing::info!("Server starting on {}", self.listener.local_addr()?);
        axum::serve(self.listener, router(self.state)).await
    }

    /// Run the server until `shutdown` resolves, then stop accepting.
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> io::Result<()> {
        axum::serve(self.listener, router(self.state)).with_graceful_shutdown(shutdown).await
    }
}
