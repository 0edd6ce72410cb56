//! Fetch adapters and normalized responses
//!
//! The engine never talks to the network or a browser itself. It hands a
//! [`Request`] to a [`FetchAdapter`], gets a normalized [`Response`] back,
//! and asks a [`ResponseFactory`] to wrap it in a [`ResponseDocument`] that
//! assertion phases can query.

pub mod document;
pub mod http;
pub mod mock;

use async_trait::async_trait;
use serde::Serialize;

use crate::common::Result;
use crate::scenario::Request;

pub use document::{DefaultResponseFactory, JsonDocument, ResponseDocument, ResponseFactory, TextDocument};
pub use http::HttpAdapter;
pub use mock::MockAdapter;

/// Ordered header list with case-insensitive lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `name`, ignoring case
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replace every value for `name` with a single one
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.0.retain(|(key, _)| !key.eq_ignore_ascii_case(&name));
        self.0.push((name, value.into()));
    }

    /// Add a value, keeping existing ones (e.g. `set-cookie`)
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (key, value) in iter {
            headers.append(key, value);
        }
        headers
    }
}

/// A normalized fetch result
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Reason phrase, when the adapter knows it
    pub status_text: Option<String>,
    pub headers: Headers,
    pub body: String,
    /// URL after following redirects
    pub url: String,
    /// Every URL redirected through, in order, excluding the final one
    pub redirects: Vec<String>,
}

impl Response {
    /// A 200 response with the given body, used by mocks and pipe hooks
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            status_text: Some("OK".to_string()),
            headers: Headers::new(),
            body: body.into(),
            url: url.into(),
            redirects: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self.status_text = None;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_redirects(mut self, redirects: Vec<String>) -> Self {
        self.redirects = redirects;
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }
}

/// Performs the actual request for a scenario
#[async_trait]
pub trait FetchAdapter: Send + Sync {
    /// Adapter name for logs
    fn name(&self) -> &str;

    /// Fetch the resource; failures carry a human-readable message
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_case_insensitive() {
        let mut headers: Headers = [("Content-Type", "text/html")].into_iter().collect();
        assert_eq!(headers.get("content-type"), Some("text/html"));
        assert!(headers.contains("CONTENT-TYPE"));

        headers.insert("content-type", "application/json");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_headers_keep_order() {
        let mut headers = Headers::new();
        headers.append("set-cookie", "a=1");
        headers.append("x-trace", "abc");
        headers.append("set-cookie", "b=2");
        let keys: Vec<&str> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["set-cookie", "x-trace", "set-cookie"]);
        assert_eq!(headers.get("set-cookie"), Some("a=1"));
    }
}
