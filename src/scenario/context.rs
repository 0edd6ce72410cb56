//! Per-phase assertion context

use std::future::Future;
use std::sync::Arc;

use super::assertion::{Assertion, Pending, Tracker};
use super::log::{LogEntry, LogKind};
use super::Scenario;
use crate::adapter::{Response, ResponseDocument};
use crate::common::{Error, Result};
use crate::value::Value;

/// Everything one phase callback can see and do
///
/// Cheap to clone; clones share the same outstanding-work counters, so an
/// assertion started from a clone moved into a spawned task still holds the
/// phase open.
#[derive(Clone)]
pub struct AssertionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    scenario: Scenario,
    document: Arc<dyn ResponseDocument>,
    previous: Value,
    phase: String,
    tracker: Arc<Tracker>,
}

impl AssertionContext {
    pub(crate) fn new(
        scenario: Scenario,
        document: Arc<dyn ResponseDocument>,
        previous: Value,
        phase: String,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                scenario,
                document,
                previous,
                phase,
                tracker: Tracker::new(),
            }),
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.inner.scenario
    }

    pub fn document(&self) -> &Arc<dyn ResponseDocument> {
        &self.inner.document
    }

    pub fn response(&self) -> &Response {
        self.inner.document.response()
    }

    /// Name of the running phase (its label, or "Phase N")
    pub fn phase(&self) -> &str {
        &self.inner.phase
    }

    /// Value returned by the previous phase; undefined for the first one
    pub fn previous(&self) -> &Value {
        &self.inner.previous
    }

    // === Response shortcuts ===

    pub fn status(&self) -> Value {
        self.inner.document.status()
    }

    pub fn header(&self, key: &str) -> Value {
        self.inner.document.header(key)
    }

    pub fn headers(&self) -> Value {
        self.inner.document.headers()
    }

    pub fn body(&self) -> Value {
        self.inner.document.body()
    }

    pub fn url(&self) -> Value {
        self.inner.document.url()
    }

    pub fn json(&self) -> Result<Value> {
        self.inner.document.json()
    }

    pub async fn find(&self, selector: &str) -> Result<Value> {
        self.inner.document.find(selector).await
    }

    pub async fn find_all(&self, selector: &str) -> Result<Value> {
        self.inner.document.find_all(selector).await
    }

    // === Logging ===

    pub fn comment(&self, message: impl Into<String>) {
        self.inner
            .scenario
            .record(LogEntry::new(LogKind::Comment, message));
    }

    pub fn heading(&self, message: impl Into<String>) {
        self.inner
            .scenario
            .record(LogEntry::new(LogKind::Heading, message));
    }

    pub fn subheading(&self, message: impl Into<String>) {
        self.inner
            .scenario
            .record(LogEntry::new(LogKind::Subheading, message));
    }

    // === Assertions ===

    /// Start an assertion about `value`
    pub fn assert(&self, value: Value) -> Assertion {
        Assertion::new(
            self.inner.scenario.clone(),
            self.inner.tracker.clone(),
            value,
        )
    }

    /// Run an asynchronous assertion in the background
    ///
    /// The phase does not end until `check` completes. An error from
    /// `check` is recorded as a failing entry.
    pub fn spawn_assertion<Fut>(&self, check: Fut)
    where
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let tracker = self.inner.tracker.clone();
        let scenario = self.inner.scenario.clone();
        tracker.start_assertion();
        tokio::spawn(async move {
            if let Err(e) = check.await {
                scenario.record(LogEntry::new(LogKind::Fail, format!("Assertion error: {e:#}")));
            }
            tracker.finish_assertion();
        });
    }

    // === Sub-scenarios ===

    /// Load a linked resource as its own scenario in the same suite
    ///
    /// `link` is either a URL string or an element whose `href` (or `src`)
    /// holds one; relative links resolve against this response's URL. The
    /// phase stays open until the sub-scenario finishes.
    pub async fn visit<F, Fut>(&self, link: &Value, title: &str, phase: F) -> Result<Scenario>
    where
        F: Fn(AssertionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let href = if link.is_element() {
            let href = link.attribute("href").await?;
            if href.is_null_or_undefined() {
                link.attribute("src").await?
            } else {
                href
            }
        } else {
            link.clone()
        };
        if href.is_null_or_undefined() || href.to_text().is_empty() {
            return Err(Error::InvalidUrl {
                url: link.name().to_string(),
                reason: "link has no target".to_string(),
            });
        }

        let target = resolve_link(&self.response().url, &href.to_text())?;
        let parent = &self.inner.scenario;
        let suite = parent
            .suite()
            .ok_or_else(|| Error::Internal("scenario is not attached to a suite".to_string()))?;

        let child = suite.scenario(title, parent.response_type());
        child.open(&target)?.next(phase)?;
        // A suite-wide wait must not hold a sub-scenario the phase is waiting on
        child.wait(false)?;

        let tracker = self.inner.tracker.clone();
        tracker.start_subscenario();
        let watched = child.clone();
        tokio::spawn(async move {
            watched.wait_for_finished().await;
            tracker.finish_subscenario();
        });

        tracing::debug!(parent = %parent.title(), child = %title, url = %target, "Spawned sub-scenario");
        Ok(child)
    }

    // === Readiness ===

    pub fn pending(&self) -> Pending {
        self.inner.tracker.snapshot()
    }

    /// Resolves once every assertion started in this phase has resolved
    pub async fn assertions_settled(&self) {
        self.inner.tracker.assertions_settled().await
    }

    /// Resolves once every sub-scenario spawned in this phase has finished
    pub async fn subscenarios_settled(&self) {
        self.inner.tracker.subscenarios_settled().await
    }

    /// Resolves once assertions and sub-scenarios are both at zero
    pub(crate) async fn settled(&self) {
        self.inner.tracker.settled().await
    }

    // === Aliases ===

    pub fn set(&self, alias: &str, value: Value) {
        self.inner.scenario.set(alias, value);
    }

    pub fn get(&self, alias: &str) -> Option<Value> {
        self.inner.scenario.get(alias)
    }
}

/// Resolve a link found in a document against the document's URL
fn resolve_link(base: &str, link: &str) -> Result<String> {
    if let Ok(absolute) = url::Url::parse(link) {
        return Ok(absolute.to_string());
    }
    let base = url::Url::parse(base).map_err(|e| Error::InvalidUrl {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    base.join(link)
        .map(|u| u.to_string())
        .map_err(|e| Error::InvalidUrl {
            url: link.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_link() {
        let base = "https://example.com/docs/intro.html";
        assert_eq!(
            resolve_link(base, "next.html").unwrap(),
            "https://example.com/docs/next.html"
        );
        assert_eq!(
            resolve_link(base, "/about").unwrap(),
            "https://example.com/about"
        );
        assert_eq!(
            resolve_link(base, "https://other.test/x").unwrap(),
            "https://other.test/x"
        );
        assert!(resolve_link("not a url", "x").is_err());
    }
}
