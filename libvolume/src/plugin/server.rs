//! Plugin HTTP server on a Unix socket.
//!
//! Each request is served on its own Tokio task and dispatched to a
//! [`VolumeDriver`]. Driver errors never close the connection; they become
//! an HTTP 500 with the message in `Err`.

use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::UnixListener;
use tracing::{debug, info, instrument, warn};

use super::protocol::*;
use crate::driver::VolumeDriver;
use crate::error::VolumeError;

/// Build the router serving the volume plugin endpoints for `driver`.
pub fn router<T>(driver: Arc<T>) -> Router
where
    T: VolumeDriver + 'static,
{
    Router::new()
        .route("/Plugin.Activate", post(activate))
        .route("/VolumeDriver.Create", post(create::<T>))
        .route("/VolumeDriver.Remove", post(remove::<T>))
        .route("/VolumeDriver.Mount", post(mount::<T>))
        .route("/VolumeDriver.Unmount", post(unmount::<T>))
        .route("/VolumeDriver.Path", post(path::<T>))
        .route("/VolumeDriver.Get", post(get::<T>))
        .route("/VolumeDriver.List", post(list::<T>))
        .route("/VolumeDriver.Capabilities", post(capabilities::<T>))
        .with_state(driver)
}

/// Bind the plugin socket at `path`, replacing a stale socket left behind by
/// a previous run.
pub fn bind_socket(path: &Path) -> io::Result<UnixListener> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed stale plugin socket"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    UnixListener::bind(path)
}

/// Serve plugin requests from `listener` until `shutdown` resolves.
pub async fn serve<T, F>(listener: UnixListener, driver: Arc<T>, shutdown: F) -> io::Result<()>
where
    T: VolumeDriver + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = ?addr, "volume plugin listening");
    }
    axum::serve(listener, router(driver))
        .with_graceful_shutdown(shutdown)
        .await
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

fn reply<S: Serialize>(status: StatusCode, body: &S) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (status, [(CONTENT_TYPE, PLUGIN_CONTENT_TYPE)], bytes).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

fn ok<S: Serialize>(body: &S) -> Response {
    reply(StatusCode::OK, body)
}

fn fail(err: VolumeError) -> Response {
    let status = match err {
        VolumeError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(error = %err, "volume request failed");
    reply(status, &ErrResponse {
        err: err.to_string(),
    })
}

/// Decode a request body. An empty body is read as `{}`.
fn decode<R: DeserializeOwned>(body: &[u8]) -> Result<R, VolumeError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body)
        .map_err(|e| VolumeError::InvalidArgument(format!("malformed request: {e}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn activate() -> Response {
    ok(&ActivateResponse::default())
}

#[instrument(skip_all)]
async fn create<T: VolumeDriver>(State(driver): State<Arc<T>>, body: Bytes) -> Response {
    let req: CreateRequest = match decode(&body) {
        Ok(req) => req,
        Err(e) => return fail(e),
    };
    let options = req.opts.unwrap_or_default();
    match driver.create(&req.name, &options).await {
        Ok(()) => ok(&ErrResponse::default()),
        Err(e) => fail(e),
    }
}

#[instrument(skip_all)]
async fn remove<T: VolumeDriver>(State(driver): State<Arc<T>>, body: Bytes) -> Response {
    let req: NameRequest = match decode(&body) {
        Ok(req) => req,
        Err(e) => return fail(e),
    };
    match driver.remove(&req.name).await {
        Ok(()) => ok(&ErrResponse::default()),
        Err(e) => fail(e),
    }
}

#[instrument(skip_all)]
async fn mount<T: VolumeDriver>(State(driver): State<Arc<T>>, body: Bytes) -> Response {
    let req: MountRequest = match decode(&body) {
        Ok(req) => req,
        Err(e) => return fail(e),
    };
    debug!(name = %req.name, id = %req.id, "mount request");
    match driver.mount(&req.name).await {
        Ok(mountpoint) => ok(&MountpointResponse {
            mountpoint,
            err: String::new(),
        }),
        Err(e) => fail(e),
    }
}

#[instrument(skip_all)]
async fn unmount<T: VolumeDriver>(State(driver): State<Arc<T>>, body: Bytes) -> Response {
    let req: MountRequest = match decode(&body) {
        Ok(req) => req,
        Err(e) => return fail(e),
    };
    debug!(name = %req.name, id = %req.id, "unmount request");
    match driver.unmount(&req.name).await {
        Ok(()) => ok(&ErrResponse::default()),
        Err(e) => fail(e),
    }
}

async fn path<T: VolumeDriver>(State(driver): State<Arc<T>>, body: Bytes) -> Response {
    match decode::<NameRequest>(&body).and_then(|req| driver.path(&req.name)) {
        Ok(mountpoint) => ok(&MountpointResponse {
            mountpoint,
            err: String::new(),
        }),
        Err(e) => fail(e),
    }
}

#[instrument(skip_all)]
async fn get<T: VolumeDriver>(State(driver): State<Arc<T>>, body: Bytes) -> Response {
    let req: NameRequest = match decode(&body) {
        Ok(req) => req,
        Err(e) => return fail(e),
    };
    match driver.get(&req.name).await {
        Ok(volume) => ok(&GetResponse {
            volume,
            err: String::new(),
        }),
        Err(e) => fail(e),
    }
}

#[instrument(skip_all)]
async fn list<T: VolumeDriver>(State(driver): State<Arc<T>>) -> Response {
    match driver.list().await {
        Ok(volumes) => ok(&ListResponse {
            volumes,
            err: String::new(),
        }),
        Err(e) => fail(e),
    }
}

async fn capabilities<T: VolumeDriver>(State(driver): State<Arc<T>>) -> Response {
    ok(&CapabilitiesResponse {
        capabilities: driver.capabilities(),
    })
}
