//! HTTP negotiation endpoint.

use super::{ClientError, ClientResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use url::Url;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Status and body of a negotiation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Issues the GET requests used to create and join sessions.
pub trait SessionApi {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ClientResult<HttpResponse>>;
}

/// [`SessionApi`] over a `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpSessionApi {
    client: reqwest::Client,
}

impl HttpSessionApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl SessionApi for HttpSessionApi {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ClientResult<HttpResponse>> {
        Box::pin(async move {
            log::debug!("GET {url}");
            let response = self.client.get(url).send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok(HttpResponse { status, body })
        })
    }
}

/// Canned responses keyed by path and query, for testing and offline use.
///
/// Unknown paths answer 404.
#[derive(Debug, Default)]
pub struct MemorySessionApi {
    responses: HashMap<String, HttpResponse>,
    failures: HashMap<String, String>,
    requests: RefCell<Vec<String>>,
}

impl MemorySessionApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests for `path` (e.g. `/session/new?name=demo`).
    pub fn respond(mut self, path: &str, status: u16, body: impl Into<String>) -> Self {
        self.responses
            .insert(path.to_string(), HttpResponse::new(status, body));
        self
    }

    /// Fail requests for `path` as if the server were unreachable.
    pub fn unreachable(mut self, path: &str, message: impl Into<String>) -> Self {
        self.failures.insert(path.to_string(), message.into());
        self
    }

    /// Full URLs requested so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl SessionApi for MemorySessionApi {
    fn get<'a>(&'a self, url: &'a str) -> BoxFuture<'a, ClientResult<HttpResponse>> {
        Box::pin(async move {
            self.requests.borrow_mut().push(url.to_string());
            let parsed = Url::parse(url).map_err(ClientError::InvalidUrl)?;
            let key = match parsed.query() {
                Some(query) => format!("{}?{query}", parsed.path()),
                None => parsed.path().to_string(),
            };
            if let Some(message) = self.failures.get(&key) {
                return Err(ClientError::Unreachable(message.clone()));
            }
            Ok(self
                .responses
                .get(&key)
                .cloned()
                .unwrap_or_else(|| HttpResponse::new(404, "Not Found")))
        })
    }
}
