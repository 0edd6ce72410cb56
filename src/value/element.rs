//! Extended DOM-like capability
//!
//! Backends that can traverse or drive a document implement [`Element`] and
//! override only what they support. Everything else falls through to the
//! default methods, which fail with [`Error::Unsupported`] so callers can
//! branch on the error kind.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::Data;
use crate::common::{Error, Result};

/// Shared handle to a backend element
pub type ElementRef = Arc<dyn Element>;

/// A node from a parsed document or a live browser session
#[async_trait]
pub trait Element: fmt::Debug + Send + Sync {
    /// Name of the backend, used in unsupported-capability errors
    fn backend(&self) -> &str;

    /// Short human-readable description (e.g. `<a.nav>`)
    fn describe(&self) -> String {
        format!("<{} element>", self.backend())
    }

    async fn tag_name(&self) -> Result<String> {
        Err(Error::unsupported("tag_name", self.backend()))
    }

    /// Attribute value, `None` when the attribute is absent
    async fn attribute(&self, key: &str) -> Result<Option<String>> {
        let _ = key;
        Err(Error::unsupported("attribute", self.backend()))
    }

    async fn property(&self, key: &str) -> Result<Data> {
        let _ = key;
        Err(Error::unsupported("property", self.backend()))
    }

    async fn has_class(&self, class: &str) -> Result<bool> {
        let _ = class;
        Err(Error::unsupported("has_class", self.backend()))
    }

    async fn text(&self) -> Result<String> {
        Err(Error::unsupported("text", self.backend()))
    }

    async fn html(&self) -> Result<String> {
        Err(Error::unsupported("html", self.backend()))
    }

    /// First descendant matching `selector`
    async fn find(&self, selector: &str) -> Result<Option<ElementRef>> {
        let _ = selector;
        Err(Error::unsupported("find", self.backend()))
    }

    /// All descendants matching `selector`, in document order
    async fn find_all(&self, selector: &str) -> Result<Vec<ElementRef>> {
        let _ = selector;
        Err(Error::unsupported("find_all", self.backend()))
    }

    async fn children(&self, selector: Option<&str>) -> Result<Vec<ElementRef>> {
        let _ = selector;
        Err(Error::unsupported("children", self.backend()))
    }

    async fn siblings(&self, selector: Option<&str>) -> Result<Vec<ElementRef>> {
        let _ = selector;
        Err(Error::unsupported("siblings", self.backend()))
    }

    async fn parent(&self) -> Result<Option<ElementRef>> {
        Err(Error::unsupported("parent", self.backend()))
    }

    async fn click(&self) -> Result<()> {
        Err(Error::unsupported("click", self.backend()))
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        let _ = text;
        Err(Error::unsupported("type_text", self.backend()))
    }

    async fn focus(&self) -> Result<()> {
        Err(Error::unsupported("focus", self.backend()))
    }

    async fn blur(&self) -> Result<()> {
        Err(Error::unsupported("blur", self.backend()))
    }

    async fn clear(&self) -> Result<()> {
        Err(Error::unsupported("clear", self.backend()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Bare;

    impl Element for Bare {
        fn backend(&self) -> &str {
            "bare"
        }
    }

    #[tokio::test]
    async fn test_defaults_are_unsupported() {
        let el = Bare;
        assert!(el.click().await.unwrap_err().is_unsupported());
        assert!(el.attribute("href").await.unwrap_err().is_unsupported());
        match el.find_all("a").await {
            Err(Error::Unsupported { capability, backend }) => {
                assert_eq!(capability, "find_all");
                assert_eq!(backend, "bare");
            }
            other => panic!("Expected Unsupported, got {other:?}"),
        }
    }
}
