//! Suites: named collections of scenarios sharing a base URL
//!
//! A suite creates and owns its scenarios, resolves their relative targets
//! against its base URL, indexes them by tag, and aggregates their results.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use serde::Serialize;
use url::Url;

use crate::common::{Error, Result};
use crate::engine::Engine;
use crate::scenario::{Log, ResponseType, Scenario, ScenarioStatus};

/// Handle to one suite; clones share state
#[derive(Clone)]
pub struct Suite {
    inner: Arc<SuiteInner>,
}

pub(crate) struct SuiteInner {
    title: String,
    engine: Engine,
    created_at: SystemTime,
    state: Mutex<SuiteState>,
}

#[derive(Default)]
struct SuiteState {
    base_url: Option<Url>,
    scenarios: Vec<Scenario>,
    tags: BTreeMap<String, Vec<Scenario>>,
    wait: bool,
}

/// Per-scenario summary for reporting
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub title: String,
    pub status: ScenarioStatus,
    pub url: Option<String>,
    pub duration_ms: Option<u64>,
    pub tags: Vec<String>,
    pub log: Log,
}

/// Aggregate suite result
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub title: String,
    pub passed: bool,
    pub total: usize,
    pub failed: usize,
    pub skipped: usize,
    pub scenarios: Vec<ScenarioReport>,
}

impl Suite {
    pub fn new(title: &str, engine: Engine) -> Self {
        Self {
            inner: Arc::new(SuiteInner {
                title: title.to_string(),
                engine,
                created_at: SystemTime::now(),
                state: Mutex::new(SuiteState::default()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<SuiteInner>) -> Self {
        Self { inner }
    }

    fn state(&self) -> MutexGuard<'_, SuiteState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    pub fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    pub fn created_at(&self) -> SystemTime {
        self.inner.created_at
    }

    /// Set the base URL relative targets resolve against
    pub fn base(&self, base: &str) -> Result<&Self> {
        let parsed = Url::parse(base).map_err(|e| Error::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        self.state().base_url = Some(parsed);
        Ok(self)
    }

    pub fn base_url(&self) -> Option<String> {
        self.state().base_url.as_ref().map(Url::to_string)
    }

    /// Resolve a scenario target against the base URL
    ///
    /// Absolute URLs pass through. Protocol-relative ones take the base
    /// scheme, or `https` without a base. Other targets join the base; with
    /// no base they are returned unchanged.
    pub fn build_url(&self, target: &str) -> Result<String> {
        if is_absolute(target) {
            return Ok(target.to_string());
        }
        let base = self.state().base_url.clone();
        match base {
            Some(base) => {
                // `host:port/path` would otherwise parse as its own scheme
                let relative = if Url::parse(target).is_ok() {
                    format!("./{target}")
                } else {
                    target.to_string()
                };
                base.join(&relative)
                    .map(|u| u.to_string())
                    .map_err(|e| Error::InvalidUrl {
                        url: target.to_string(),
                        reason: e.to_string(),
                    })
            }
            None if target.starts_with("//") => Ok(format!("https:{target}")),
            None => Ok(target.to_string()),
        }
    }

    /// Create a scenario owned by this suite
    ///
    /// The scenario inherits the suite-wide wait flag.
    pub fn scenario(&self, title: &str, response_type: ResponseType) -> Scenario {
        let wait = self.state().wait;
        let scenario = Scenario::new(
            title,
            response_type,
            self.inner.engine.clone(),
            Arc::downgrade(&self.inner),
            wait,
        );
        self.state().scenarios.push(scenario.clone());
        tracing::debug!(suite = %self.inner.title, scenario = %title, %response_type, "Created scenario");
        scenario
    }

    /// Scenario of the engine's default response type
    pub fn default_scenario(&self, title: &str) -> Scenario {
        let response_type = self.inner.engine.options().default_response_type;
        self.scenario(title, response_type)
    }

    /// Hold every existing and future scenario until [`execute`]
    ///
    /// [`execute`]: Suite::execute
    pub fn wait(&self) -> Result<&Self> {
        let scenarios = {
            let mut state = self.state();
            state.wait = true;
            state.scenarios.clone()
        };
        for scenario in scenarios.iter().filter(|s| !s.is_started() && !s.is_finished()) {
            match scenario.wait(true) {
                Ok(_) => {}
                // Launched between the filter and the call
                Err(Error::InvalidState { .. }) if scenario.is_started() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(self)
    }

    /// Release the suite-wide wait and start every ready scenario
    ///
    /// Scenarios still blocked (missing phases, parameters, dependencies)
    /// stay waiting and start by themselves later.
    pub fn execute(&self) -> Result<&Self> {
        let scenarios = {
            let mut state = self.state();
            state.wait = false;
            state.scenarios.clone()
        };
        for scenario in scenarios.iter().filter(|s| s.status().is_pending()) {
            match scenario.execute() {
                Ok(_) | Err(Error::AlreadyExecuted(_)) | Err(Error::NotReady { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(self)
    }

    /// Every scenario, in creation order
    pub fn scenarios(&self) -> Vec<Scenario> {
        self.state().scenarios.clone()
    }

    pub fn get_scenario_by_title(&self, title: &str) -> Option<Scenario> {
        self.scenarios().into_iter().find(|s| s.title() == title)
    }

    /// Scenarios tagged `tag`, in creation order
    pub fn get_all_scenarios_by_tag(&self, tag: &str) -> Vec<Scenario> {
        let state = self.state();
        let Some(tagged) = state.tags.get(tag) else {
            return Vec::new();
        };
        state
            .scenarios
            .iter()
            .filter(|s| tagged.iter().any(|t| t.same_as(s)))
            .cloned()
            .collect()
    }

    pub fn tags(&self) -> Vec<String> {
        self.state().tags.keys().cloned().collect()
    }

    pub(crate) fn index_tag(&self, tag: &str, scenario: &Scenario) {
        let mut state = self.state();
        let tagged = state.tags.entry(tag.to_string()).or_default();
        if !tagged.iter().any(|s| s.same_as(scenario)) {
            tagged.push(scenario.clone());
        }
    }

    /// Every scenario reached a terminal state; vacuously true when empty
    pub fn is_done(&self) -> bool {
        self.scenarios().iter().all(Scenario::is_finished)
    }

    /// Done and no scenario failed or errored
    pub fn passed(&self) -> bool {
        let scenarios = self.scenarios();
        scenarios.iter().all(Scenario::is_finished)
            && !scenarios.iter().any(|s| s.status().is_failed())
    }

    /// Done and at least one scenario failed or errored
    pub fn failed(&self) -> bool {
        let scenarios = self.scenarios();
        scenarios.iter().all(Scenario::is_finished)
            && scenarios.iter().any(|s| s.status().is_failed())
    }

    /// Resolve once every scenario, including ones added meanwhile, finished
    pub async fn wait_for_finished(&self) {
        loop {
            let scenarios = self.scenarios();
            let count = scenarios.len();
            for scenario in &scenarios {
                scenario.wait_for_finished().await;
            }
            if self.scenarios().len() == count {
                return;
            }
        }
    }

    pub fn report(&self) -> SuiteReport {
        let scenarios: Vec<ScenarioReport> = self
            .scenarios()
            .iter()
            .map(|s| ScenarioReport {
                title: s.title(),
                status: s.status(),
                url: s.final_url().or_else(|| s.target()),
                duration_ms: s.duration().map(|d| d.as_millis() as u64),
                tags: s.tags(),
                log: s.log(),
            })
            .collect();

        SuiteReport {
            title: self.inner.title.clone(),
            passed: self.passed(),
            total: scenarios.len(),
            failed: scenarios.iter().filter(|s| s.status.is_failed()).count(),
            skipped: scenarios
                .iter()
                .filter(|s| matches!(s.status, ScenarioStatus::Skipped | ScenarioStatus::Cancelled))
                .count(),
            scenarios,
        }
    }
}

/// Schemes that never carry an authority, so `://` is not expected
const OPAQUE_SCHEMES: &[&str] = &["about", "blob", "data", "javascript", "mailto"];

/// A target carrying its own scheme
///
/// `localhost:3000/api` parses with scheme `localhost`; only `://` or a
/// known opaque scheme marks a target as absolute.
fn is_absolute(target: &str) -> bool {
    match Url::parse(target) {
        Ok(url) => target.contains("://") || OPAQUE_SCHEMES.contains(&url.scheme()),
        Err(_) => false,
    }
}

impl std::fmt::Debug for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suite")
            .field("title", &self.inner.title)
            .field("scenarios", &self.state().scenarios.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let suite = Suite::new("urls", Engine::default());
        assert_eq!(suite.build_url("/a").unwrap(), "/a");
        assert_eq!(suite.build_url("//cdn.test/x.js").unwrap(), "https://cdn.test/x.js");

        suite.base("http://site.test/app/").unwrap();
        assert_eq!(suite.build_url("search?q=a").unwrap(), "http://site.test/app/search?q=a");
        assert_eq!(suite.build_url("/root").unwrap(), "http://site.test/root");
        assert_eq!(suite.build_url("//cdn.test/x.js").unwrap(), "http://cdn.test/x.js");
        assert_eq!(suite.build_url("https://other.test/").unwrap(), "https://other.test/");
        assert_eq!(
            suite.build_url("localhost:3000/api").unwrap(),
            "http://site.test/app/localhost:3000/api"
        );
        assert_eq!(suite.build_url("data:text/plain,hi").unwrap(), "data:text/plain,hi");
    }

    #[test]
    fn test_invalid_base() {
        let suite = Suite::new("bad", Engine::default());
        assert!(matches!(suite.base("not a url"), Err(Error::InvalidUrl { .. })));
    }

    #[test]
    fn test_empty_suite_is_done() {
        let suite = Suite::new("empty", Engine::default());
        assert!(suite.is_done());
        assert!(suite.passed());
        assert!(!suite.failed());
        assert_eq!(suite.report().total, 0);
    }

    #[test]
    fn test_tags_and_titles() {
        let suite = Suite::new("tags", Engine::default());
        let a = suite.scenario("a", ResponseType::Json);
        let b = suite.scenario("b", ResponseType::Json);
        b.tag("smoke").unwrap();
        a.tag("smoke").unwrap();
        a.tag("smoke").unwrap();

        let smoke = suite.get_all_scenarios_by_tag("smoke");
        assert_eq!(smoke.len(), 2);
        assert!(smoke[0].same_as(&a));
        assert!(smoke[1].same_as(&b));
        assert!(suite.get_all_scenarios_by_tag("none").is_empty());
        assert!(suite.get_scenario_by_title("a").unwrap().same_as(&a));
        assert!(suite.get_scenario_by_title("zzz").is_none());
    }

    #[test]
    fn test_suite_wait_propagates() {
        let suite = Suite::new("wait", Engine::default());
        suite.wait().unwrap();
        let scenario = suite.scenario("held", ResponseType::Json);
        scenario.open("/x").unwrap();
        scenario
            .next(|_ctx| async { Ok(crate::value::Value::undefined()) })
            .unwrap();
        assert_eq!(scenario.status(), ScenarioStatus::Waiting);
    }
}
