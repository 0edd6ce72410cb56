//! Response documents
//!
//! A [`ResponseDocument`] is what an assertion phase sees: the normalized
//! response plus whatever selection the backend supports. Format-specific
//! parsers (HTML, XML, images) live outside this crate and plug in through
//! [`ResponseFactory`]; the defaults here cover JSON and plain text.

use std::sync::Arc;

use async_trait::async_trait;

use super::Response;
use crate::common::{Error, Result};
use crate::scenario::ResponseType;
use crate::value::{Data, Value};

/// Capability surface of a loaded response
#[async_trait]
pub trait ResponseDocument: Send + Sync {
    fn response(&self) -> &Response;

    fn response_type(&self) -> ResponseType;

    /// Source text shared by every value taken from this document
    fn source(&self) -> Arc<str>;

    fn status(&self) -> Value {
        Value::new(self.response().status, "HTTP Status")
    }

    fn status_text(&self) -> Value {
        Value::new(self.response().status_text.clone(), "HTTP Status Text")
    }

    fn header(&self, key: &str) -> Value {
        let value = self.response().headers.get(key).map(str::to_string);
        Value::new(value, format!("HTTP Headers[{key}]"))
    }

    fn headers(&self) -> Value {
        let map = self
            .response()
            .headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), Data::String(v.to_string())))
            .collect();
        Value::new(Data::Object(map), "HTTP Headers")
    }

    fn body(&self) -> Value {
        Value::new(self.response().body.clone(), "Response Body").with_source(self.source())
    }

    fn url(&self) -> Value {
        Value::new(self.response().url.clone(), "Final URL")
    }

    /// Body parsed as JSON
    fn json(&self) -> Result<Value> {
        let parsed: serde_json::Value = serde_json::from_str(&self.response().body)?;
        Ok(Value::new(parsed, "JSON Response").with_source(self.source()))
    }

    /// First match for `selector`; `null` when nothing matches
    async fn find(&self, selector: &str) -> Result<Value> {
        let _ = selector;
        Err(Error::unsupported("find", &format!("{} response", self.response_type())))
    }

    /// Every match for `selector`, as an array
    async fn find_all(&self, selector: &str) -> Result<Value> {
        let _ = selector;
        Err(Error::unsupported("find_all", &format!("{} response", self.response_type())))
    }
}

/// Wraps a normalized response in a document for its declared type
pub trait ResponseFactory: Send + Sync {
    fn create(&self, response: Response, kind: ResponseType) -> Result<Arc<dyn ResponseDocument>>;
}

/// Factory used when no format-specific backend is registered
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultResponseFactory;

impl ResponseFactory for DefaultResponseFactory {
    fn create(&self, response: Response, kind: ResponseType) -> Result<Arc<dyn ResponseDocument>> {
        match kind {
            ResponseType::Json => Ok(Arc::new(JsonDocument::parse(response)?)),
            other => Ok(Arc::new(TextDocument::new(response, other))),
        }
    }
}

/// Any response without selector support
pub struct TextDocument {
    response: Response,
    kind: ResponseType,
    source: Arc<str>,
}

impl TextDocument {
    pub fn new(response: Response, kind: ResponseType) -> Self {
        let source = Arc::from(response.body.as_str());
        Self {
            response,
            kind,
            source,
        }
    }
}

impl ResponseDocument for TextDocument {
    fn response(&self) -> &Response {
        &self.response
    }

    fn response_type(&self) -> ResponseType {
        self.kind
    }

    fn source(&self) -> Arc<str> {
        self.source.clone()
    }
}

/// JSON response with dotted-path selection (`data.items.0.id`)
pub struct JsonDocument {
    response: Response,
    root: Data,
    source: Arc<str>,
}

impl JsonDocument {
    pub fn parse(response: Response) -> Result<Self> {
        let parsed: serde_json::Value = serde_json::from_str(&response.body)?;
        let source = Arc::from(response.body.as_str());
        Ok(Self {
            response,
            root: parsed.into(),
            source,
        })
    }

    fn select(&self, path: &str) -> Value {
        let root = Value::new(self.root.clone(), "JSON Response").with_source(self.source.clone());
        let path = path.trim().trim_start_matches("$.").trim_start_matches('$');
        if path.is_empty() {
            return root;
        }
        let selected = path
            .split('.')
            .filter(|segment| !segment.is_empty())
            .fold(root, |current, segment| current.at(segment));
        selected.rename(path.to_string())
    }
}

#[async_trait]
impl ResponseDocument for JsonDocument {
    fn response(&self) -> &Response {
        &self.response
    }

    fn response_type(&self) -> ResponseType {
        ResponseType::Json
    }

    fn source(&self) -> Arc<str> {
        self.source.clone()
    }

    fn json(&self) -> Result<Value> {
        Ok(self.select(""))
    }

    async fn find(&self, selector: &str) -> Result<Value> {
        let found = self.select(selector);
        if found.is_undefined() {
            return Ok(found.derive(Data::Null, selector.to_string()));
        }
        Ok(found)
    }

    async fn find_all(&self, selector: &str) -> Result<Value> {
        let found = self.select(selector);
        let items = match found.data() {
            Data::Array(items) => items.clone(),
            Data::Undefined => Vec::new(),
            other => vec![other.clone()],
        };
        Ok(found.derive(Data::Array(items), selector.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_response(body: &str) -> Response {
        Response::new("https://api.example.com/items", body)
            .with_header("Content-Type", "application/json")
    }

    #[tokio::test]
    async fn test_json_find_by_path() {
        let doc = JsonDocument::parse(json_response(
            r#"{"data": {"items": [{"id": 7}, {"id": 9}]}}"#,
        ))
        .unwrap();

        let id = doc.find("data.items.1.id").await.unwrap();
        assert_eq!(id.to_number(), 9.0);
        assert_eq!(id.name(), "data.items.1.id");

        let missing = doc.find("data.nope").await.unwrap();
        assert!(missing.is_null());

        let all = doc.find_all("data.items").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(doc.find_all("data.nope").await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_text_document_has_no_selectors() {
        let factory = DefaultResponseFactory;
        let doc = factory
            .create(Response::new("https://example.com", "<p>hi</p>"), ResponseType::Html)
            .unwrap();
        assert!(doc.find("p").await.unwrap_err().is_unsupported());
        assert_eq!(doc.status().to_number(), 200.0);
        assert_eq!(doc.body().source(), Some("<p>hi</p>"));
    }

    #[test]
    fn test_factory_rejects_bad_json() {
        let factory = DefaultResponseFactory;
        let result = factory.create(json_response("{not json"), ResponseType::Json);
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_header_lookup_value() {
        let doc = TextDocument::new(json_response("{}"), ResponseType::Resource);
        assert_eq!(doc.header("content-type").to_text(), "application/json");
        assert!(doc.header("x-missing").is_null());
    }
}
