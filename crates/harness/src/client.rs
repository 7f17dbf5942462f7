//! HTTP test client handed to every assertion body
//!
//! Resources created through [`TestClient::create_resource`] are tracked so
//! the cleanup coordinator can delete them after the run.

use parking_lot::Mutex;
use reqwest::header::{HeaderMap, CONTENT_TYPE, COOKIE, LOCATION};
use std::time::Duration;
use tracing::debug;

pub use reqwest::Method;

use crate::config::Authentication;
use crate::context::RunContext;
use crate::error::{HarnessError, HarnessResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Ordered set of resource paths created on the subject during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatedResourceSet {
    paths: Vec<String>,
}

impl CreatedResourceSet {
    /// Track a path; re-creating a tracked path keeps its first position
    pub fn insert(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Empty the set, handing back its paths in creation order
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.paths)
    }
}

/// Fully buffered response from the subject
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    /// Header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn json(&self) -> HarnessResult<serde_json::Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Client bound to the subject's base URL
pub struct TestClient {
    base_url: String,
    auth: Option<Authentication>,
    http: reqwest::Client,
    created: Mutex<CreatedResourceSet>,
    context: RunContext,
}

impl TestClient {
    pub fn new(base_url: &str, auth: Option<Authentication>, context: RunContext) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            http,
            created: Mutex::new(CreatedResourceSet::default()),
            context,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a subject path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn request(&self, method: Method, path: &str) -> Request<'_> {
        Request {
            client: self,
            method,
            path: path.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(&self, path: &str) -> Request<'_> {
        self.request(Method::GET, path)
    }

    pub fn head(&self, path: &str) -> Request<'_> {
        self.request(Method::HEAD, path)
    }

    pub fn put(&self, path: &str, body: impl Into<String>) -> Request<'_> {
        self.request(Method::PUT, path).body(body)
    }

    pub fn post(&self, path: &str, body: impl Into<String>) -> Request<'_> {
        self.request(Method::POST, path).body(body)
    }

    /// PUT with a JSON body and `Content-Type: application/json`
    pub fn put_json(&self, path: &str, value: &serde_json::Value) -> Request<'_> {
        self.request(Method::PUT, path).json(value)
    }

    /// POST with a JSON body and `Content-Type: application/json`
    pub fn post_json(&self, path: &str, value: &serde_json::Value) -> Request<'_> {
        self.request(Method::POST, path).json(value)
    }

    pub fn delete(&self, path: &str) -> Request<'_> {
        self.request(Method::DELETE, path)
    }

    pub fn options(&self, path: &str) -> Request<'_> {
        self.request(Method::OPTIONS, path)
    }

    /// PUT a fixture and track it for cleanup.
    ///
    /// Fails unless the subject answers 201 or 204. Returns the `Location`
    /// header, falling back to the resource URL.
    pub async fn create_resource(
        &self,
        path: &str,
        content: impl Into<String>,
        content_type: &str,
    ) -> HarnessResult<String> {
        let response = self
            .put(path, content)
            .header(CONTENT_TYPE.as_str(), content_type)
            .send()
            .await?;

        if response.status != 201 && response.status != 204 {
            return Err(HarnessError::ResourceCreation {
                path: path.to_string(),
                status: response.status,
            });
        }

        let location = response
            .header(LOCATION.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| self.url(path));

        self.track(path);
        Ok(location)
    }

    /// Track a resource created by a raw request so cleanup deletes it
    pub fn track(&self, path: impl Into<String>) {
        self.created.lock().insert(path);
    }

    /// Subject path for a `Location` value, absolute or relative
    pub fn path_of(&self, location: &str) -> String {
        match location.strip_prefix(&self.base_url) {
            Some(path) if path.starts_with('/') => path.to_string(),
            Some("") => "/".to_string(),
            _ if location.starts_with('/') => location.to_string(),
            _ => match reqwest::Url::parse(location) {
                Ok(url) => url.path().to_string(),
                Err(_) => format!("/{}", location),
            },
        }
    }

    /// [`create_resource`](Self::create_resource) with a JSON body
    pub async fn create_json(
        &self,
        path: &str,
        content: &serde_json::Value,
    ) -> HarnessResult<String> {
        self.create_resource(path, content.to_string(), "application/json").await
    }

    /// Snapshot of the fixtures created so far
    pub fn created_resources(&self) -> CreatedResourceSet {
        self.created.lock().clone()
    }

    /// Delete every tracked fixture, ignoring individual failures.
    ///
    /// Returns the number of deletions attempted; the set is empty afterwards.
    pub async fn cleanup(&self) -> usize {
        let paths = self.created.lock().drain();

        for path in &paths {
            match self.delete(path).send().await {
                Ok(response) => debug!("Cleanup DELETE {} -> {}", path, response.status),
                Err(e) => debug!("Cleanup DELETE {} failed: {}", path, e),
            }
        }

        paths.len()
    }
}

/// Request under construction against the subject
pub struct Request<'a> {
    client: &'a TestClient,
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Option<String>,
}

impl Request<'_> {
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// JSON body; sets `Content-Type` unless one was given
    pub fn json(mut self, value: &serde_json::Value) -> Self {
        let has_type = self
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
        if !has_type {
            self.headers
                .push((CONTENT_TYPE.to_string(), "application/json".to_string()));
        }
        self.body = Some(value.to_string());
        self
    }

    pub async fn send(self) -> HarnessResult<HttpResponse> {
        let client = self.client;
        let url = client.url(&self.path);
        let mut req = client.http.request(self.method.clone(), &url);

        for (name, value) in &self.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        match &client.auth {
            Some(Authentication::Bearer { token }) => req = req.bearer_auth(token),
            Some(Authentication::Cookie { cookie: Some(cookie) }) => {
                req = req.header(COOKIE, cookie.as_str())
            }
            _ => {}
        }

        if let Some(body) = self.body {
            req = req.body(body);
        }

        if client.context.verbose {
            debug!("{} {}", self.method, url);
            if !self.headers.is_empty() {
                debug!("Headers: {:?}", self.headers);
            }
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.text().await?;

        if client.context.verbose {
            debug!("Response: {}", status);
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
