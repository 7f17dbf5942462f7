//! In-process subject used by unit tests

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone, Default)]
struct Store {
    resources: Arc<Mutex<HashMap<String, (String, Bytes)>>>,
    deleted: Arc<Mutex<Vec<String>>>,
    last_authorization: Arc<Mutex<Option<String>>>,
    rejected: Arc<Mutex<Vec<String>>>,
    stop_marker: Arc<Mutex<Option<PathBuf>>>,
}

/// Minimal PUT/GET/DELETE resource store bound to an ephemeral port.
///
/// Paths under `/forbidden` refuse writes with 403. `GET /health` answers 200.
/// Once the stop marker exists on disk every request is refused with 503.
pub(crate) struct StoreServer {
    addr: SocketAddr,
    store: Store,
}

impl StoreServer {
    pub(crate) async fn spawn() -> Self {
        let store = Store::default();
        let app = Router::new().fallback(handle).with_state(store.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, store }
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn resource_count(&self) -> usize {
        self.store.resources.lock().len()
    }

    pub(crate) fn deleted(&self) -> Vec<String> {
        self.store.deleted.lock().clone()
    }

    pub(crate) fn last_authorization(&self) -> Option<String> {
        self.store.last_authorization.lock().clone()
    }

    /// Stop serving as soon as `marker` appears
    pub(crate) fn stop_serving_when(&self, marker: PathBuf) {
        *self.store.stop_marker.lock() = Some(marker);
    }

    /// Requests that arrived after the stop marker appeared
    pub(crate) fn rejected(&self) -> Vec<String> {
        self.store.rejected.lock().clone()
    }
}

async fn handle(
    State(store): State<Store>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    *store.last_authorization.lock() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let stopped = store
        .stop_marker
        .lock()
        .as_ref()
        .map(|marker| marker.exists())
        .unwrap_or(false);
    if stopped {
        store.rejected.lock().push(format!("{} {}", method, path));
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    match method {
        Method::GET if path == "/health" => StatusCode::OK.into_response(),
        Method::PUT => {
            if path.starts_with("/forbidden") {
                return StatusCode::FORBIDDEN.into_response();
            }
            let content_type = headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/octet-stream")
                .to_string();
            let previous = store.resources.lock().insert(path, (content_type, body));
            match previous {
                Some(_) => StatusCode::NO_CONTENT.into_response(),
                None => StatusCode::CREATED.into_response(),
            }
        }
        Method::GET => match store.resources.lock().get(&path) {
            Some((content_type, body)) => (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type.clone()),
                    (header::ETAG, format!("\"{}\"", body.len())),
                ],
                body.clone(),
            )
                .into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
        Method::DELETE => {
            let removed = store.resources.lock().remove(&path);
            match removed {
                Some(_) => {
                    store.deleted.lock().push(path);
                    StatusCode::NO_CONTENT.into_response()
                }
                None => StatusCode::NOT_FOUND.into_response(),
            }
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}
