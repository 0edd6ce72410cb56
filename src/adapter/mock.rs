//! Canned-response adapter
//!
//! Serves preconfigured responses keyed by URL without touching the
//! network. Used by the test suite and by `flagrun run --dry-run`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{FetchAdapter, Response};
use crate::common::{Error, Result};
use crate::scenario::Request;

enum Route {
    Respond(Response),
    Fail(String),
    Redirect(String),
}

/// Adapter returning canned responses
#[derive(Default)]
pub struct MockAdapter {
    routes: Mutex<HashMap<String, Route>>,
    fallback: Option<Response>,
    delay: Option<Duration>,
    requests: Mutex<Vec<String>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for `url`
    pub fn route(self, url: &str, response: Response) -> Self {
        self.lock_routes().insert(url.to_string(), Route::Respond(response));
        self
    }

    /// Fail requests to `url` with `message`
    pub fn fail(self, url: &str, message: &str) -> Self {
        self.lock_routes().insert(url.to_string(), Route::Fail(message.to_string()));
        self
    }

    /// Redirect `from` to `to`, recording the hop on the response
    pub fn redirect(self, from: &str, to: &str) -> Self {
        self.lock_routes().insert(from.to_string(), Route::Redirect(to.to_string()));
        self
    }

    /// Serve an empty 200 for any URL without a route
    pub fn with_fallback(mut self) -> Self {
        self.fallback = Some(Response::new("", ""));
        self
    }

    /// Delay every response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// URLs fetched so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn fetch_count(&self) -> usize {
        self.requests().len()
    }

    fn lock_routes(&self) -> std::sync::MutexGuard<'_, HashMap<String, Route>> {
        self.routes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl FetchAdapter for MockAdapter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, request: &Request) -> Result<Response> {
        let url = request
            .url
            .clone()
            .ok_or_else(|| Error::fetch("<none>", "request has no URL"))?;

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.clone());
        }
        tracing::debug!(url = %url, "Mock fetch");

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut current = url;
        let mut redirects = Vec::new();
        loop {
            let routed = match self.lock_routes().get(&current) {
                Some(Route::Respond(response)) => Ok(response.clone()),
                Some(Route::Fail(message)) => Err(Error::fetch(&current, message)),
                Some(Route::Redirect(to)) => {
                    if redirects.len() >= request.max_redirects {
                        return Err(Error::fetch(&current, "too many redirects"));
                    }
                    redirects.push(std::mem::replace(&mut current, to.clone()));
                    continue;
                }
                None => match &self.fallback {
                    Some(response) => Ok(response.clone()),
                    None => Err(Error::fetch(&current, "404 no mock route")),
                },
            };

            return routed.map(|mut response| {
                if response.url.is_empty() {
                    response.url = current;
                }
                if !redirects.is_empty() {
                    response.redirects = redirects;
                }
                response
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> Request {
        let mut request = Request::default();
        request.url = Some(url.to_string());
        request
    }

    #[tokio::test]
    async fn test_routes_and_failures() {
        let adapter = MockAdapter::new()
            .route("https://a.test/", Response::new("https://a.test/", "home"))
            .fail("https://a.test/down", "connection refused");

        let ok = adapter.fetch(&request("https://a.test/")).await.unwrap();
        assert_eq!(ok.body, "home");

        let err = adapter.fetch(&request("https://a.test/down")).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));

        assert!(adapter.fetch(&request("https://a.test/other")).await.is_err());
        assert_eq!(adapter.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_redirect_chain() {
        let adapter = MockAdapter::new()
            .redirect("https://a.test/old", "https://a.test/moved")
            .redirect("https://a.test/moved", "https://a.test/new")
            .route("https://a.test/new", Response::new("https://a.test/new", "new"));

        let response = adapter.fetch(&request("https://a.test/old")).await.unwrap();
        assert_eq!(response.url, "https://a.test/new");
        assert_eq!(response.redirects, vec!["https://a.test/old", "https://a.test/moved"]);

        let mut limited = request("https://a.test/old");
        limited.max_redirects = 1;
        let err = adapter.fetch(&limited).await.unwrap_err();
        assert!(err.to_string().contains("too many redirects"));
    }

    #[tokio::test]
    async fn test_fallback_fills_url() {
        let adapter = MockAdapter::new().with_fallback();
        let response = adapter.fetch(&request("https://b.test/x")).await.unwrap();
        assert_eq!(response.url, "https://b.test/x");
        assert_eq!(response.status, 200);
    }
}
