//! HTTP surface over the tree store.
//!
//! Routes mirror the wire contract the client speaks: `state`, `data`,
//! `copy`, `lock`, and `update`. Outcomes are plain-text bodies with the
//! status code carrying the meaning; only `state`, `data`, `copy`, and
//! `update` reads answer with JSON.

// Handlers are async for axum even where the body never awaits.
#![allow(clippy::unused_async)]

use std::sync::Arc;
use std::time::Duration;

use arbor_proto::Snapshot;
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::Value;

use crate::store::TreeStore;

const ACQUIRED: &str = "Acquired";
const LOCKED: &str = "Locked";
const RELEASED: &str = "Released";
const NOT_LOCKED: &str = "Not Locked";
const INVALID_LOCK_CODE: &str = "Invalid Lock Code";
const CREATED: &str = "Created";
const REMOVED: &str = "Removed";
const NOT_FOUND: &str = "Not Found";
const BAD_REQUEST: &str = "Bad Request";

/// Shared handler state: the store plus a one-shot fault slot.
///
/// Arming a fault makes the next request answer with the armed status
/// before it reaches the store. Tests use this to exercise client error
/// mapping against statuses the store never produces on its own.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<TreeStore>>,
    fault: Arc<Mutex<Option<u16>>>,
}

impl AppState {
    /// Fresh state around an empty store with the given lock TTL.
    #[must_use]
    pub fn new(lock_ttl: Duration) -> Self {
        Self {
            store: Arc::new(Mutex::new(TreeStore::new(lock_ttl))),
            fault: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle to the shared store, for test seeding and inspection.
    #[must_use]
    pub fn store(&self) -> Arc<Mutex<TreeStore>> {
        Arc::clone(&self.store)
    }

    /// Arm a one-shot fault: the next request fails with `status_code`.
    pub fn fail_next(&self, status_code: u16) {
        *self.fault.lock() = Some(status_code);
    }

    fn take_fault(&self) -> Option<StatusCode> {
        self.fault.lock().take().and_then(|code| StatusCode::from_u16(code).ok())
    }
}

/// The full route table wired to `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/data", get(read_root))
        .route("/data/*path", get(read_committed))
        .route("/copy", get(copy_out).put(copy_in))
        .route("/lock", get(lock_holder).put(acquire))
        .route("/lock/:key", put(commit).delete(rollback))
        .route("/update/:key", get(read_pending_root).put(write_root).delete(remove_root))
        .route(
            "/update/:key/*path",
            get(read_pending).put(write_pending).delete(remove_pending),
        )
        .layer(middleware::from_fn_with_state(state.clone(), intercept))
        .with_state(state)
}

/// Answers armed faults before routing and traces every outcome.
async fn intercept(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    if let Some(status) = state.take_fault() {
        tracing::warn!("{} {} -> {} (injected)", method, uri, status);
        return (status, "injected fault").into_response();
    }
    let response = next.run(req).await;
    tracing::debug!("{} {} -> {}", method, uri, response.status());
    response
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|part| !part.is_empty()).collect()
}

async fn get_state(State(state): State<AppState>) -> Json<Value> {
    Json(state.store.lock().state().encode())
}

async fn read_root(State(state): State<AppState>) -> Json<Value> {
    Json(state.store.lock().snapshot().data)
}

async fn read_committed(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    match state.store.lock().read(&segments(&path)) {
        Some(value) => Json(value.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, NOT_FOUND).into_response(),
    }
}

async fn copy_out(State(state): State<AppState>) -> Json<Value> {
    Json(state.store.lock().snapshot().encode())
}

async fn copy_in(State(state): State<AppState>, body: String) -> Response {
    let parsed = serde_json::from_str::<Value>(&body).map(Snapshot::decode);
    match parsed {
        Ok(Ok(Some(snapshot))) => {
            state.store.lock().install(snapshot.version, snapshot.data);
            (StatusCode::CREATED, CREATED).into_response()
        },
        _ => (StatusCode::BAD_REQUEST, BAD_REQUEST).into_response(),
    }
}

async fn lock_holder(State(state): State<AppState>) -> Response {
    match state.store.lock().lock_holder() {
        Some(key) => (StatusCode::OK, key).into_response(),
        None => (StatusCode::NOT_FOUND, NOT_LOCKED).into_response(),
    }
}

/// The request body carries the lock key. An empty body names no lock
/// and cannot acquire anything.
async fn acquire(State(state): State<AppState>, key: String) -> Response {
    if key.is_empty() {
        return (StatusCode::NOT_FOUND, NOT_FOUND).into_response();
    }
    if state.store.lock().try_acquire(&key) {
        (StatusCode::OK, ACQUIRED).into_response()
    } else {
        (StatusCode::FORBIDDEN, LOCKED).into_response()
    }
}

/// The lock key must match the holder. Failures use `status` so the
/// lock endpoints can answer 404 where the update endpoints answer 403.
fn holder_gate(store: &mut TreeStore, key: &str, status: StatusCode) -> Result<(), Response> {
    match store.lock_holder() {
        None => Err((status, NOT_LOCKED).into_response()),
        Some(holder) if holder != key => Err((status, INVALID_LOCK_CODE).into_response()),
        Some(_) => Ok(()),
    }
}

async fn commit(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let mut store = state.store.lock();
    if let Err(response) = holder_gate(&mut store, &key, StatusCode::NOT_FOUND) {
        return response;
    }
    store.commit();
    (StatusCode::OK, RELEASED).into_response()
}

async fn rollback(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    let mut store = state.store.lock();
    if let Err(response) = holder_gate(&mut store, &key, StatusCode::NOT_FOUND) {
        return response;
    }
    store.rollback();
    (StatusCode::OK, RELEASED).into_response()
}

async fn read_pending_root(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    read_pending_at(&state, &key, "")
}

async fn read_pending(
    State(state): State<AppState>,
    Path((key, path)): Path<(String, String)>,
) -> Response {
    read_pending_at(&state, &key, &path)
}

fn read_pending_at(state: &AppState, key: &str, path: &str) -> Response {
    let mut store = state.store.lock();
    if let Err(response) = holder_gate(&mut store, key, StatusCode::FORBIDDEN) {
        return response;
    }
    match store.read_pending(&segments(path)) {
        Some(value) => Json(value.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, NOT_FOUND).into_response(),
    }
}

async fn write_root(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: String,
) -> Response {
    write_pending_at(&state, &key, "", &body)
}

async fn write_pending(
    State(state): State<AppState>,
    Path((key, path)): Path<(String, String)>,
    body: String,
) -> Response {
    write_pending_at(&state, &key, &path, &body)
}

fn write_pending_at(state: &AppState, key: &str, path: &str, body: &str) -> Response {
    let mut store = state.store.lock();
    if let Err(response) = holder_gate(&mut store, key, StatusCode::FORBIDDEN) {
        return response;
    }
    let Ok(content) = serde_json::from_str::<Value>(body) else {
        return (StatusCode::BAD_REQUEST, BAD_REQUEST).into_response();
    };
    if store.write_pending(&segments(path), content) {
        (StatusCode::CREATED, CREATED).into_response()
    } else {
        (StatusCode::NOT_FOUND, NOT_FOUND).into_response()
    }
}

async fn remove_root(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    remove_pending_at(&state, &key, "")
}

async fn remove_pending(
    State(state): State<AppState>,
    Path((key, path)): Path<(String, String)>,
) -> Response {
    remove_pending_at(&state, &key, &path)
}

fn remove_pending_at(state: &AppState, key: &str, path: &str) -> Response {
    let mut store = state.store.lock();
    if let Err(response) = holder_gate(&mut store, key, StatusCode::FORBIDDEN) {
        return response;
    }
    if store.remove_pending(&segments(path)) {
        (StatusCode::OK, REMOVED).into_response()
    } else {
        (StatusCode::NOT_FOUND, NOT_FOUND).into_response()
    }
}
