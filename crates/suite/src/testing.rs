//! A small LWS-compliant server for exercising the assertions

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use lws_harness::{RunContext, TestClient};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

const ALLOWED: &str = "GET, HEAD, PUT, POST, DELETE, OPTIONS";
const LDP_RESOURCE: &str = "<http://www.w3.org/ns/ldp#Resource>; rel=\"type\"";
const LDP_CONTAINER: &str = "<http://www.w3.org/ns/ldp#Container>; rel=\"type\", \
                             <http://www.w3.org/ns/ldp#BasicContainer>; rel=\"type\"";

struct Stored {
    content_type: String,
    body: Bytes,
    etag: String,
}

#[derive(Default)]
struct Behaviour {
    not_found_status: Option<u16>,
    ignore_preconditions: bool,
    no_cors: bool,
}

#[derive(Clone)]
struct Shared {
    base_url: String,
    resources: Arc<Mutex<BTreeMap<String, Stored>>>,
    versions: Arc<Mutex<u64>>,
    behaviour: Arc<Mutex<Behaviour>>,
}

pub(crate) struct LwsServer {
    addr: SocketAddr,
    shared: Shared,
}

impl LwsServer {
    pub(crate) async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared = Shared {
            base_url: format!("http://{}", addr),
            resources: Arc::default(),
            versions: Arc::default(),
            behaviour: Arc::default(),
        };

        let app = Router::new().fallback(handle).with_state(shared.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, shared }
    }

    pub(crate) fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn resource_count(&self) -> usize {
        self.shared.resources.lock().len()
    }

    /// Answer this status instead of 404 for missing resources
    pub(crate) fn set_not_found_status(&self, status: u16) {
        self.shared.behaviour.lock().not_found_status = Some(status);
    }

    pub(crate) fn ignore_preconditions(&self) {
        self.shared.behaviour.lock().ignore_preconditions = true;
    }

    pub(crate) fn disable_cors(&self) {
        self.shared.behaviour.lock().no_cors = true;
    }
}

pub(crate) fn client_for(server: &LwsServer) -> TestClient {
    TestClient::new(&server.base_url(), None, RunContext::default())
}

async fn handle(
    State(shared): State<Shared>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let mut response = match method {
        Method::GET | Method::HEAD if path == "/" => listing(&shared, method == Method::HEAD),
        Method::GET | Method::HEAD => read(&shared, &path, method == Method::HEAD),
        Method::PUT => write(&shared, path, &headers, body),
        Method::POST => post(&shared, &path, &headers, body),
        Method::DELETE => delete(&shared, &path),
        Method::OPTIONS => (
            StatusCode::NO_CONTENT,
            [
                (header::ALLOW, ALLOWED),
                (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOWED),
            ],
        )
            .into_response(),
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    };

    if !shared.behaviour.lock().no_cors {
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
    response
}

fn listing(shared: &Shared, head: bool) -> Response {
    let contains: Vec<_> = shared
        .resources
        .lock()
        .keys()
        .map(|path| json!({ "@id": path }))
        .collect();
    let body = json!({
        "@context": { "@vocab": "https://www.w3.org/ns/lws#" },
        "@id": "/",
        "@type": "Container",
        "contains": contains,
    })
    .to_string();

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/ld+json"),
            (header::LINK, LDP_CONTAINER),
        ],
        if head { String::new() } else { body },
    )
        .into_response()
}

fn read(shared: &Shared, path: &str, head: bool) -> Response {
    let resources = shared.resources.lock();
    let Some(stored) = resources.get(path) else {
        let status = shared.behaviour.lock().not_found_status.unwrap_or(404);
        return StatusCode::from_u16(status)
            .unwrap_or(StatusCode::NOT_FOUND)
            .into_response();
    };

    let link = if path.ends_with('/') { LDP_CONTAINER } else { LDP_RESOURCE };
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, stored.content_type.clone()),
            (header::ETAG, stored.etag.clone()),
            (header::LINK, link.to_string()),
        ],
        if head { Bytes::new() } else { stored.body.clone() },
    )
        .into_response()
}

fn write(shared: &Shared, path: String, headers: &HeaderMap, body: Bytes) -> Response {
    let ignore = shared.behaviour.lock().ignore_preconditions;
    let mut resources = shared.resources.lock();
    let current = resources.get(&path).map(|s| s.etag.clone());

    if !ignore {
        let if_none_match = headers.get(header::IF_NONE_MATCH).and_then(|v| v.to_str().ok());
        if if_none_match == Some("*") && current.is_some() {
            return StatusCode::PRECONDITION_FAILED.into_response();
        }
        if let Some(expected) = headers.get(header::IF_MATCH).and_then(|v| v.to_str().ok()) {
            if current.as_deref() != Some(expected) {
                return StatusCode::PRECONDITION_FAILED.into_response();
            }
        }
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let etag = next_etag(shared);
    let location = format!("{}{}", shared.base_url, path);
    resources.insert(
        path,
        Stored {
            content_type,
            body,
            etag: etag.clone(),
        },
    );

    match current {
        Some(_) => (StatusCode::NO_CONTENT, [(header::ETAG, etag)]).into_response(),
        None => (
            StatusCode::CREATED,
            [(header::ETAG, etag), (header::LOCATION, location)],
        )
            .into_response(),
    }
}

fn post(shared: &Shared, container: &str, headers: &HeaderMap, body: Bytes) -> Response {
    let slug = headers
        .get("Slug")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("resource")
        .trim_matches('/')
        .to_string();
    let is_container = headers
        .get(header::LINK)
        .and_then(|v| v.to_str().ok())
        .map(|link| link.contains("BasicContainer"))
        .unwrap_or(false);

    let mut path = format!("{}/{}", container.trim_end_matches('/'), slug);
    if is_container {
        path.push('/');
    }

    let etag = next_etag(shared);
    let location = format!("{}{}", shared.base_url, path);
    shared.resources.lock().insert(
        path,
        Stored {
            content_type: if is_container { "application/ld+json" } else { "application/json" }
                .to_string(),
            body,
            etag,
        },
    );

    (StatusCode::CREATED, [(header::LOCATION, location)]).into_response()
}

fn delete(shared: &Shared, path: &str) -> Response {
    match shared.resources.lock().remove(path) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn next_etag(shared: &Shared) -> String {
    let mut versions = shared.versions.lock();
    *versions += 1;
    format!("\"v{}\"", *versions)
}
