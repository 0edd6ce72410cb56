//! Default network adapter backed by reqwest

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::redirect;

use super::{FetchAdapter, Headers, Response};
use crate::common::{Error, Result};
use crate::scenario::{Method, Request, RequestBody};

/// Plain HTTP(S) adapter
///
/// A client is built per request because proxy, timeout and redirect policy
/// are per-scenario settings.
#[derive(Debug, Default, Clone)]
pub struct HttpAdapter {
    user_agent: Option<String>,
}

impl HttpAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn client(&self, request: &Request, chain: Arc<Mutex<Vec<String>>>) -> Result<reqwest::Client> {
        let max_redirects = request.max_redirects;
        let policy = redirect::Policy::custom(move |attempt| {
            if attempt.previous().len() > max_redirects {
                return attempt.error(format!("too many redirects (limit {max_redirects})"));
            }
            if let Ok(mut chain) = chain.lock() {
                if let Some(from) = attempt.previous().last() {
                    chain.push(from.to_string());
                }
            }
            attempt.follow()
        });

        let mut builder = reqwest::Client::builder()
            .redirect(policy)
            .timeout(request.timeout);

        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent.clone());
        }

        if let Some(proxy) = &request.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("Invalid proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

#[async_trait]
impl FetchAdapter for HttpAdapter {
    fn name(&self) -> &str {
        "http"
    }

    #[tracing::instrument(skip_all, fields(method = %request.method, url = ?request.url))]
    async fn fetch(&self, request: &Request) -> Result<Response> {
        let url = request
            .url
            .as_deref()
            .ok_or_else(|| Error::fetch("<none>", "request has no URL"))?;

        let chain = Arc::new(Mutex::new(Vec::new()));
        let client = self.client(request, chain.clone())?;

        let mut builder = client.request(to_reqwest_method(request.method), url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(auth) = &request.auth {
            builder = builder.basic_auth(&auth.username, Some(&auth.password));
        }
        builder = match &request.body {
            Some(RequestBody::Text(text)) => builder.body(text.clone()),
            Some(RequestBody::Json(json)) => builder.json(json),
            Some(RequestBody::Form(fields)) => builder.form(fields),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| Error::fetch(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers: Headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await.map_err(|e| Error::fetch(url, e))?;

        let redirects = chain.lock().map(|c| c.clone()).unwrap_or_default();
        tracing::debug!(status = status.as_u16(), redirects = redirects.len(), "HTTP response");

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().map(str::to_string),
            headers,
            body,
            url: final_url,
            redirects,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_mapping() {
        assert_eq!(to_reqwest_method(Method::Get), reqwest::Method::GET);
        assert_eq!(to_reqwest_method(Method::Delete), reqwest::Method::DELETE);
    }

    #[tokio::test]
    async fn test_missing_url_is_fetch_error() {
        let adapter = HttpAdapter::new();
        let err = adapter.fetch(&Request::default()).await.unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }
}
