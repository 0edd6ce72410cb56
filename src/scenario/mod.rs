//! Scenario state machine
//!
//! A [`Scenario`] is one check: a request, the assertion phases run against
//! its response, and the lifecycle hooks around them. It is configured
//! through a fluent API and starts on its own as soon as it has a resolved
//! target, at least one phase, and nothing it is waiting on.
//!
//! ```text
//! Created -> Waiting -> Executing -> ResponseReceived -> RunningPhases -> Completed
//!    |          |
//!    +----------+-> Skipped | Cancelled
//! ```

pub mod assertion;
mod context;
mod hooks;
pub mod log;
mod request;
mod status;

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use regex::Regex;
use tokio::sync::{broadcast, watch};

use crate::adapter::{Response, ResponseDocument};
use crate::common::{Error, Result};
use crate::engine::Engine;
use crate::suite::{Suite, SuiteInner};
use crate::value::Value;

pub use assertion::{Assertion, Pending};
pub use context::AssertionContext;
pub use hooks::{Hook, HookStage, Phase, Pipe};
pub use log::{Log, LogEntry, LogKind};
pub use request::{BasicAuth, BrowserOptions, Method, Request, RequestBody, ResponseType};
pub use status::{Outcome, ScenarioStatus, StatusChange, Timing};

use hooks::HookLists;

/// Capacity of the status-change broadcast channel
const EVENT_CAPACITY: usize = 32;

/// Handle to one scenario; clones share state
#[derive(Clone)]
pub struct Scenario {
    inner: Arc<ScenarioInner>,
}

struct ScenarioInner {
    engine: Engine,
    suite: Weak<SuiteInner>,
    state: Mutex<ScenarioState>,
    status_tx: watch::Sender<ScenarioStatus>,
    events: broadcast::Sender<StatusChange>,
}

struct ScenarioState {
    title: String,
    status: ScenarioStatus,
    /// Execution, skip or cancel has claimed the scenario
    started: bool,
    wait: bool,
    /// Scenarios this one waits on that have not passed yet
    dependencies: usize,
    target: Option<String>,
    params: HashMap<String, String>,
    request: Request,
    phases: Vec<Phase>,
    hooks: HookLists,
    log: Log,
    timing: Timing,
    redirects: Vec<String>,
    final_url: Option<String>,
    aliases: HashMap<String, Value>,
    tags: Vec<String>,
}

impl ScenarioState {
    /// Why the scenario cannot start yet
    fn blocker(&self) -> Option<String> {
        if self.wait {
            return Some("explicit wait".to_string());
        }
        if self.dependencies > 0 {
            return Some(format!("waiting on {} other scenario(s)", self.dependencies));
        }
        let Some(target) = &self.target else {
            return Some("no target URL".to_string());
        };
        let (_, missing) = fill_params(target, &self.params);
        if !missing.is_empty() {
            return Some(format!("unresolved path parameters: {}", missing.join(", ")));
        }
        if self.phases.is_empty() {
            return Some("no assertion phases".to_string());
        }
        None
    }

    fn set_status(&mut self, to: ScenarioStatus) -> Option<StatusChange> {
        let from = self.status;
        if from == to {
            return None;
        }
        self.status = to;
        Some(StatusChange {
            title: self.title.clone(),
            from,
            to,
        })
    }
}

fn param_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid pattern"))
}

/// Substitute `{name}` placeholders, returning the names left unresolved
fn fill_params(template: &str, params: &HashMap<String, String>) -> (String, Vec<String>) {
    let mut missing = Vec::new();
    let filled = param_pattern().replace_all(template, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match params.get(name) {
            Some(value) => value.clone(),
            None => {
                missing.push(name.to_string());
                caps[0].to_string()
            }
        }
    });
    (filled.into_owned(), missing)
}

/// Split an optional leading method from a target ("POST /login")
fn split_method(target: &str) -> (Option<Method>, &str) {
    if let Some((head, rest)) = target.trim().split_once(char::is_whitespace) {
        if let Ok(method) = head.parse::<Method>() {
            return (Some(method), rest.trim());
        }
    }
    (None, target.trim())
}

/// Run a user callback, turning a panic into an error
async fn guarded<T>(callback: BoxFuture<'static, anyhow::Result<T>>) -> anyhow::Result<T> {
    match AssertUnwindSafe(callback).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(anyhow::anyhow!("callback panicked: {message}"))
        }
    }
}

impl Scenario {
    pub(crate) fn new(
        title: &str,
        response_type: ResponseType,
        engine: Engine,
        suite: Weak<SuiteInner>,
        wait: bool,
    ) -> Self {
        let options = engine.options();
        let request = Request {
            timeout: options.request_timeout,
            response_type,
            browser: BrowserOptions {
                headless: options.headless,
                ..BrowserOptions::default()
            },
            ..Request::default()
        };

        let (status_tx, _) = watch::channel(ScenarioStatus::Created);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(ScenarioInner {
                engine,
                suite,
                state: Mutex::new(ScenarioState {
                    title: title.to_string(),
                    status: ScenarioStatus::Created,
                    started: false,
                    wait,
                    dependencies: 0,
                    target: None,
                    params: HashMap::new(),
                    request,
                    phases: Vec::new(),
                    hooks: HookLists::default(),
                    log: Log::new(),
                    timing: Timing::new(),
                    redirects: Vec::new(),
                    final_url: None,
                    aliases: HashMap::new(),
                    tags: Vec::new(),
                }),
                status_tx,
                events,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ScenarioState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, change: Option<StatusChange>) {
        let Some(change) = change else {
            return;
        };
        tracing::debug!(scenario = %change.title, from = %change.from, to = %change.to, "Status change");
        let to = change.to;
        // No subscribers is fine
        let _ = self.inner.events.send(change);
        self.inner.status_tx.send_replace(to);
    }

    fn transition(&self, to: ScenarioStatus) {
        let change = self.state().set_status(to);
        self.publish(change);
    }

    /// Whether two handles refer to the same scenario
    pub fn same_as(&self, other: &Scenario) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // === Configuration (only before execution starts) ===

    fn configure(&self, action: &str, apply: impl FnOnce(&mut ScenarioState)) -> Result<&Self> {
        {
            let mut state = self.state();
            if state.started || state.status.is_terminal() {
                return Err(Error::invalid_state(action, state.status));
            }
            apply(&mut state);
        }
        self.refresh();
        Ok(self)
    }

    /// Rename the scenario
    pub fn set_title(&self, title: &str) -> Result<&Self> {
        self.configure("change title", |s| s.title = title.to_string())
    }

    /// Set the target, optionally prefixed with a method (`"POST /login"`)
    ///
    /// Relative targets resolve against the suite base URL at execution
    /// time; `{name}` placeholders hold the scenario until [`params`]
    /// supplies them.
    ///
    /// [`params`]: Scenario::params
    pub fn open(&self, target: &str) -> Result<&Self> {
        let (method, url) = split_method(target);
        self.configure("change target", |s| {
            s.target = Some(url.to_string());
            if let Some(method) = method {
                s.request.method = method;
            }
        })
    }

    /// Supply values for `{name}` placeholders in the target
    pub fn params<I, K, V>(&self, params: I) -> Result<&Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.configure("set path parameters", |s| s.params.extend(params))
    }

    pub fn method(&self, method: Method) -> Result<&Self> {
        self.configure("change method", |s| s.request.method = method)
    }

    pub fn header(&self, name: &str, value: &str) -> Result<&Self> {
        self.configure("set header", |s| s.request.headers.insert(name, value))
    }

    pub fn headers<I, K, V>(&self, headers: I) -> Result<&Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let headers: Vec<(String, String)> = headers
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.configure("set headers", |s| {
            for (name, value) in headers {
                s.request.headers.insert(name, value);
            }
        })
    }

    pub fn timeout(&self, timeout: Duration) -> Result<&Self> {
        self.configure("set timeout", |s| s.request.timeout = timeout)
    }

    pub fn proxy(&self, proxy: &str) -> Result<&Self> {
        self.configure("set proxy", |s| s.request.proxy = Some(proxy.to_string()))
    }

    pub fn basic_auth(&self, username: &str, password: &str) -> Result<&Self> {
        self.configure("set auth", |s| {
            s.request.auth = Some(BasicAuth {
                username: username.to_string(),
                password: password.to_string(),
            })
        })
    }

    pub fn body(&self, body: RequestBody) -> Result<&Self> {
        self.configure("set body", |s| s.request.body = Some(body))
    }

    /// JSON body; also sets `Content-Type` unless already present
    pub fn json_body(&self, body: serde_json::Value) -> Result<&Self> {
        self.configure("set body", |s| {
            if !s.request.headers.contains("content-type") {
                s.request.headers.insert("Content-Type", "application/json");
            }
            s.request.body = Some(RequestBody::Json(body));
        })
    }

    pub fn max_redirects(&self, max: usize) -> Result<&Self> {
        self.configure("set redirect limit", |s| s.request.max_redirects = max)
    }

    pub fn browser(&self, options: BrowserOptions) -> Result<&Self> {
        self.configure("set browser options", |s| s.request.browser = options)
    }

    pub fn set_response_type(&self, response_type: ResponseType) -> Result<&Self> {
        self.configure("change response type", |s| {
            s.request.response_type = response_type
        })
    }

    // === Registration (any time before a terminal state) ===

    fn register(&self, action: &str, apply: impl FnOnce(&mut ScenarioState)) -> Result<&Self> {
        {
            let mut state = self.state();
            if state.status.is_terminal() {
                return Err(Error::invalid_state(action, state.status));
            }
            apply(&mut state);
        }
        self.refresh();
        Ok(self)
    }

    /// Add an assertion phase
    pub fn next<F, Fut>(&self, callback: F) -> Result<&Self>
    where
        F: Fn(AssertionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.add_phase(None, callback)
    }

    /// Add an assertion phase with a label logged as a sub-heading
    pub fn next_labeled<F, Fut>(&self, label: &str, callback: F) -> Result<&Self>
    where
        F: Fn(AssertionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        self.add_phase(Some(label.to_string()), callback)
    }

    fn add_phase<F, Fut>(&self, label: Option<String>, callback: F) -> Result<&Self>
    where
        F: Fn(AssertionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let phase = Phase {
            label,
            callback: hooks::phase_fn(callback),
        };
        self.register("add phase", |s| s.phases.push(phase))
    }

    /// Add a lifecycle hook, optionally labeled
    pub fn on<F, Fut>(&self, stage: HookStage, label: Option<&str>, callback: F) -> Result<&Self>
    where
        F: Fn(Scenario) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let hook = Hook {
            label: label.map(str::to_string),
            callback: hooks::hook_fn(callback),
        };
        self.register(&format!("add {stage} hook"), |s| {
            s.hooks.stage_mut(stage).push(hook)
        })
    }

    pub fn before<F, Fut>(&self, callback: F) -> Result<&Self>
    where
        F: Fn(Scenario) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on(HookStage::Before, None, callback)
    }

    pub fn after<F, Fut>(&self, callback: F) -> Result<&Self>
    where
        F: Fn(Scenario) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on(HookStage::After, None, callback)
    }

    pub fn success<F, Fut>(&self, callback: F) -> Result<&Self>
    where
        F: Fn(Scenario) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on(HookStage::Success, None, callback)
    }

    pub fn failure<F, Fut>(&self, callback: F) -> Result<&Self>
    where
        F: Fn(Scenario) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on(HookStage::Failure, None, callback)
    }

    pub fn finally<F, Fut>(&self, callback: F) -> Result<&Self>
    where
        F: Fn(Scenario) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.on(HookStage::Finally, None, callback)
    }

    /// Add a hook that may replace the response before phases see it
    pub fn pipe<F, Fut>(&self, callback: F) -> Result<&Self>
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Response>> + Send + 'static,
    {
        self.add_pipe(None, callback)
    }

    /// Add a pipe whose label names it in failure entries
    pub fn pipe_labeled<F, Fut>(&self, label: &str, callback: F) -> Result<&Self>
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Response>> + Send + 'static,
    {
        self.add_pipe(Some(label.to_string()), callback)
    }

    fn add_pipe<F, Fut>(&self, label: Option<String>, callback: F) -> Result<&Self>
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Response>> + Send + 'static,
    {
        let pipe = Pipe {
            label,
            callback: hooks::pipe_fn(callback),
        };
        self.register("add pipe", |s| s.hooks.pipes.push(pipe))
    }

    /// Tag the scenario; the owning suite indexes it under `tag`
    pub fn tag(&self, tag: &str) -> Result<&Self> {
        self.register("add tag", |s| {
            if !s.tags.iter().any(|t| t == tag) {
                s.tags.push(tag.to_string());
            }
        })?;
        if let Some(suite) = self.suite() {
            suite.index_tag(tag, self);
        }
        Ok(self)
    }

    // === Aliases ===

    pub fn set(&self, alias: &str, value: Value) {
        self.state().aliases.insert(alias.to_string(), value);
    }

    pub fn get(&self, alias: &str) -> Option<Value> {
        self.state().aliases.get(alias).cloned()
    }

    // === Control ===

    /// Hold (`true`) or release (`false`) automatic execution
    ///
    /// Releasing a scenario that already started is a no-op.
    pub fn wait(&self, wait: bool) -> Result<&Self> {
        {
            let mut state = self.state();
            if state.started || state.status.is_terminal() {
                if wait {
                    return Err(Error::invalid_state("wait", state.status));
                }
                return Ok(self);
            }
            state.wait = wait;
        }
        self.refresh();
        Ok(self)
    }

    /// Hold this scenario until `other` passes; cancel it if `other` does not
    pub fn wait_for(&self, other: &Scenario) -> Result<&Self> {
        if self.same_as(other) {
            return Err(Error::SelfDependency(self.title()));
        }
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::NoRuntime(self.title()))?;

        {
            let mut state = self.state();
            if state.started || state.status.is_terminal() {
                return Err(Error::invalid_state("add dependency", state.status));
            }
            state.dependencies += 1;
        }
        self.refresh();

        let me = self.clone();
        let dependency = other.clone();
        handle.spawn(async move {
            let outcome = dependency.wait_for_finished().await;
            if outcome.is_passed() {
                {
                    let mut state = me.state();
                    state.dependencies = state.dependencies.saturating_sub(1);
                }
                me.refresh();
            } else {
                tracing::info!(
                    scenario = %me.title(),
                    dependency = %dependency.title(),
                    %outcome,
                    "Dependency did not pass, cancelling"
                );
                // Already claimed elsewhere means there is nothing to cancel
                let _ = me.cancel().await;
            }
        });
        Ok(self)
    }

    /// Release any explicit wait and start now
    ///
    /// Fails with a configuration error if the scenario already started, or
    /// with [`Error::NotReady`] if it still lacks a target, phases, path
    /// parameters or a dependency; in that case it starts by itself once
    /// the blocker clears.
    pub fn execute(&self) -> Result<&Self> {
        {
            let mut state = self.state();
            if state.started {
                return Err(Error::AlreadyExecuted(state.title.clone()));
            }
            if state.status.is_terminal() {
                return Err(Error::invalid_state("execute", state.status));
            }
            state.wait = false;
        }
        self.refresh();

        let state = self.state();
        if state.started {
            return Ok(self);
        }
        match state.blocker() {
            Some(reason) => Err(Error::NotReady {
                title: state.title.clone(),
                reason,
            }),
            None => Err(Error::NoRuntime(state.title.clone())),
        }
    }

    /// Start execution if nothing blocks it any more
    fn refresh(&self) {
        let (change, launch) = {
            let mut state = self.state();
            if state.started || !state.status.is_pending() {
                return;
            }
            match state.blocker() {
                Some(reason) => {
                    tracing::trace!(scenario = %state.title, %reason, "Scenario not ready");
                    (state.set_status(ScenarioStatus::Waiting), None)
                }
                None => match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        state.started = true;
                        (None, Some(handle))
                    }
                    Err(_) => {
                        tracing::warn!(scenario = %state.title, "Ready but no runtime to execute on");
                        (state.set_status(ScenarioStatus::Waiting), None)
                    }
                },
            }
        };
        self.publish(change);

        if let Some(handle) = launch {
            let scenario = self.clone();
            handle.spawn(async move { scenario.run().await });
        }
    }

    /// Skip before execution: before, after and finally hooks run; no fetch
    pub async fn skip(&self, reason: Option<&str>) -> Result<()> {
        let comment = match reason {
            Some(reason) => format!("Skipped: {reason}"),
            None => "Skipped".to_string(),
        };
        self.abandon("skip", Some(comment), ScenarioStatus::Skipped)
            .await
    }

    /// Cancel before execution; same hooks as skip, no skip comment
    pub async fn cancel(&self) -> Result<()> {
        self.abandon("cancel", None, ScenarioStatus::Cancelled).await
    }

    async fn abandon(
        &self,
        action: &str,
        comment: Option<String>,
        terminal: ScenarioStatus,
    ) -> Result<()> {
        {
            let mut state = self.state();
            if state.started || state.status.is_terminal() {
                return Err(Error::invalid_state(action, state.status));
            }
            state.started = true;
        }

        self.run_hooks(HookStage::Before).await;
        self.run_hooks(HookStage::After).await;
        if let Some(comment) = comment {
            self.comment(comment);
        }
        self.state().timing.finished = Some(Instant::now());
        self.run_hooks(HookStage::Finally).await;
        self.transition(terminal);
        Ok(())
    }

    // === Execution ===

    #[tracing::instrument(skip(self), fields(scenario = %self.title()))]
    async fn run(self) {
        self.state().timing.execution_started = Some(Instant::now());
        self.transition(ScenarioStatus::Executing);

        let outcome = if self.run_hooks(HookStage::Before).await {
            self.fetch_and_assert().await
        } else {
            Outcome::Errored
        };
        self.finish(outcome).await;
    }

    /// Fetch, pipe, and run every phase; `Errored` on any execution error
    async fn fetch_and_assert(&self) -> Outcome {
        let (title, request) = match self.build_request() {
            Ok(built) => built,
            Err(e) => return self.execution_error("Invalid target", e.to_string()),
        };
        let url = request.url.clone().unwrap_or_default();
        let response_type = request.response_type;
        self.record(LogEntry::new(LogKind::Heading, title));

        let adapter = match self.inner.engine.adapter_for(response_type) {
            Ok(adapter) => adapter,
            Err(e) => return self.execution_error(&format!("Failed to load {url}"), e.to_string()),
        };

        self.state().timing.request_started = Some(Instant::now());
        tracing::info!(adapter = adapter.name(), method = %request.method, %url, "Dispatching request");

        let response = match adapter.fetch(&request).await {
            Ok(response) => response,
            Err(e) => return self.execution_error(&format!("Failed to load {url}"), e.to_string()),
        };

        {
            let mut state = self.state();
            state.timing.response_loaded = Some(Instant::now());
            state.redirects = response.redirects.clone();
            state.final_url = Some(response.url.clone());
        }
        self.transition(ScenarioStatus::ResponseReceived);

        let response = match self.run_pipes(response).await {
            Ok(response) => response,
            Err(outcome) => return outcome,
        };

        let document = match self.inner.engine.factory().create(response, response_type) {
            Ok(document) => document,
            Err(e) => {
                return self.execution_error(&format!("Failed to parse {response_type} response"), e.to_string())
            }
        };
        self.record(LogEntry::new(LogKind::Pass, format!("Loaded {response_type} {url}")));
        self.transition(ScenarioStatus::RunningPhases);

        self.run_phases(document).await
    }

    fn build_request(&self) -> Result<(String, Request)> {
        let (title, target, params, mut request) = {
            let state = self.state();
            (
                state.title.clone(),
                state.target.clone(),
                state.params.clone(),
                state.request.clone(),
            )
        };
        let target = target.ok_or_else(|| Error::InvalidUrl {
            url: String::new(),
            reason: "no target".to_string(),
        })?;
        let (filled, _) = fill_params(&target, &params);
        let url = match self.suite() {
            Some(suite) => suite.build_url(&filled)?,
            None => filled,
        };
        request.url = Some(url);
        Ok((title, request))
    }

    /// Thread the response through every pipe; the first failure errors the run
    async fn run_pipes(&self, mut response: Response) -> std::result::Result<Response, Outcome> {
        let mut index = 0;
        loop {
            let pipe = self.state().hooks.pipes.get(index).cloned();
            let Some(pipe) = pipe else {
                return Ok(response);
            };
            response = match guarded((pipe.callback)(response)).await {
                Ok(response) => response,
                Err(e) => {
                    let name = match &pipe.label {
                        Some(label) => format!("Pipe hook '{label}'"),
                        None => "Pipe hook".to_string(),
                    };
                    return Err(self.execution_error(&format!("{name} failed"), format!("{e:#}")));
                }
            };
            index += 1;
        }
    }

    async fn run_phases(&self, document: Arc<dyn ResponseDocument>) -> Outcome {
        let phase_timeout = self.inner.engine.options().phase_timeout;
        let mut previous = Value::undefined();
        let mut index = 0;

        // Phases added while running still execute, in order
        loop {
            let phase = self.state().phases.get(index).cloned();
            let Some(phase) = phase else {
                return Outcome::Passed;
            };
            let name = phase
                .label
                .clone()
                .unwrap_or_else(|| format!("Phase {}", index + 1));
            if let Some(label) = &phase.label {
                self.record(LogEntry::new(LogKind::Subheading, label.clone()));
            }

            let ctx = AssertionContext::new(self.clone(), document.clone(), previous, name.clone());
            let settled = tokio::time::timeout(phase_timeout, async {
                let result = guarded((phase.callback)(ctx.clone())).await;
                if result.is_ok() {
                    ctx.settled().await;
                }
                result
            })
            .await;

            match settled {
                Ok(Ok(value)) => previous = value,
                Ok(Err(e)) => return self.execution_error(&format!("{name} failed"), format!("{e:#}")),
                Err(_) => {
                    let err = Error::PhaseTimeout {
                        phase: name,
                        millis: phase_timeout.as_millis() as u64,
                    };
                    tracing::warn!(error = %err, "Phase abandoned");
                    return self.execution_error(&err.to_string(), "Outstanding work was abandoned".to_string());
                }
            }
            index += 1;
        }
    }

    fn execution_error(&self, summary: &str, detail: String) -> Outcome {
        tracing::warn!(summary, %detail, "Execution error");
        self.record(LogEntry::new(LogKind::Fail, summary));
        self.record(LogEntry::new(LogKind::Comment, detail));
        Outcome::Errored
    }

    /// Run one hook list in order; stops at and logs the first failure
    async fn run_hooks(&self, stage: HookStage) -> bool {
        let mut index = 0;
        loop {
            let hook = self.state().hooks.stage(stage).get(index).cloned();
            let Some(hook) = hook else {
                return true;
            };
            if let Err(e) = guarded((hook.callback)(self.clone())).await {
                let name = match &hook.label {
                    Some(label) => format!("{stage} hook '{label}'"),
                    None => format!("{stage} hook"),
                };
                tracing::warn!(hook = %name, error = %e, "Hook failed");
                self.record(LogEntry::new(LogKind::Fail, format!("{name} failed")));
                self.record(LogEntry::new(LogKind::Comment, format!("{e:#}")));
                return false;
            }
            index += 1;
        }
    }

    async fn finish(&self, outcome: Outcome) {
        self.run_hooks(HookStage::After).await;

        let took = {
            let mut state = self.state();
            state.timing.finished = Some(Instant::now());
            state.timing.total().unwrap_or_default()
        };
        self.comment(format!("Took {}ms", took.as_millis()));

        let errored = outcome == Outcome::Errored;
        let stage = if !errored && !self.has_failed() {
            HookStage::Success
        } else {
            HookStage::Failure
        };
        self.run_hooks(stage).await;
        self.run_hooks(HookStage::Finally).await;

        let outcome = if errored {
            Outcome::Errored
        } else if self.has_failed() {
            Outcome::Failed
        } else {
            Outcome::Passed
        };
        tracing::info!(scenario = %self.title(), ?outcome, took_ms = took.as_millis() as u64, "Scenario finished");
        self.transition(ScenarioStatus::Completed(outcome));
    }

    // === Observation ===

    pub(crate) fn record(&self, entry: LogEntry) {
        self.state().log.push(entry);
    }

    /// Append a comment to the log
    pub fn comment(&self, message: impl Into<String>) {
        self.record(LogEntry::new(LogKind::Comment, message));
    }

    pub fn title(&self) -> String {
        self.state().title.clone()
    }

    pub fn status(&self) -> ScenarioStatus {
        self.state().status
    }

    pub fn response_type(&self) -> ResponseType {
        self.state().request.response_type
    }

    /// Snapshot of the request descriptor as configured so far
    pub fn request(&self) -> Request {
        self.state().request.clone()
    }

    /// Target as given, before parameter substitution and base resolution
    pub fn target(&self) -> Option<String> {
        self.state().target.clone()
    }

    pub fn final_url(&self) -> Option<String> {
        self.state().final_url.clone()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.state().redirects.clone()
    }

    pub fn tags(&self) -> Vec<String> {
        self.state().tags.clone()
    }

    pub fn timing(&self) -> Timing {
        self.state().timing
    }

    pub fn duration(&self) -> Option<Duration> {
        self.state().timing.total()
    }

    /// Copy of the log
    pub fn log(&self) -> Log {
        self.state().log.clone()
    }

    pub fn has_failed(&self) -> bool {
        self.state().log.has_failed()
    }

    /// Finished and no failing entries
    pub fn has_passed(&self) -> bool {
        self.status().is_passed()
    }

    /// Execution was launched, whether or not the status caught up yet
    pub fn is_started(&self) -> bool {
        self.state().started
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    /// Receive every status transition from now on
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.inner.events.subscribe()
    }

    /// Watch the current status
    pub fn watch(&self) -> watch::Receiver<ScenarioStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Resolve once the scenario reaches a terminal state
    pub async fn wait_for_finished(&self) -> ScenarioStatus {
        let mut rx = self.inner.status_tx.subscribe();
        let result = match rx.wait_for(ScenarioStatus::is_terminal).await {
            Ok(status) => *status,
            // The sender lives in `self`, so this is unreachable in practice
            Err(_) => self.status(),
        };
        result
    }

    pub fn suite(&self) -> Option<Suite> {
        self.inner.suite.upgrade().map(Suite::from_inner)
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Scenario")
            .field("title", &state.title)
            .field("status", &state.status)
            .field("target", &state.target)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fill_params() {
        let (url, missing) = fill_params("/users/{id}/posts/{post}", &params(&[("id", "7")]));
        assert_eq!(url, "/users/7/posts/{post}");
        assert_eq!(missing, vec!["post".to_string()]);

        let (url, missing) = fill_params("/users/{id}", &params(&[("id", "7")]));
        assert_eq!(url, "/users/7");
        assert!(missing.is_empty());
    }

    #[test]
    fn test_split_method() {
        assert_eq!(split_method("POST /login"), (Some(Method::Post), "/login"));
        assert_eq!(split_method("/plain"), (None, "/plain"));
        assert_eq!(split_method("search term"), (None, "search term"));
    }

    #[test]
    fn test_detached_scenario_waits_without_runtime() {
        let scenario = Scenario::new(
            "detached",
            ResponseType::Json,
            Engine::default(),
            Weak::new(),
            false,
        );
        scenario.open("https://example.com").unwrap();
        scenario
            .next(|_ctx| async { Ok(Value::undefined()) })
            .unwrap();
        assert_eq!(scenario.status(), ScenarioStatus::Waiting);
        assert!(matches!(scenario.execute(), Err(Error::NoRuntime(_))));
    }

    #[tokio::test]
    async fn test_guarded_catches_panics() {
        let callback = async {
            if "boom".len() == 4 {
                panic!("boom");
            }
            Ok(())
        };
        let result: anyhow::Result<()> = guarded(callback.boxed()).await;
        let message = result.unwrap_err().to_string();
        assert!(message.contains("boom"));
    }
}
