//! Assertions bound to a value
//!
//! An [`Assertion`] is outstanding from the moment it is created until one
//! matcher resolves it. Matchers consume the assertion, so each one records
//! exactly one log entry. An assertion dropped without a matcher is logged
//! as incomplete and stops counting as outstanding.

use std::sync::Arc;

use tokio::sync::watch;

use super::log::{LogEntry, LogKind};
use super::Scenario;
use crate::value::{Data, Value};

/// Outstanding work started by one phase
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Pending {
    pub assertions: usize,
    pub subscenarios: usize,
}

/// Counts outstanding assertions and sub-scenarios for a phase
pub(crate) struct Tracker {
    tx: watch::Sender<Pending>,
}

impl Tracker {
    pub fn new() -> Arc<Self> {
        let (tx, _rx) = watch::channel(Pending::default());
        Arc::new(Self { tx })
    }

    pub fn snapshot(&self) -> Pending {
        *self.tx.borrow()
    }

    pub fn start_assertion(&self) {
        self.tx.send_modify(|p| p.assertions += 1);
    }

    pub fn finish_assertion(&self) {
        self.tx.send_modify(|p| p.assertions = p.assertions.saturating_sub(1));
    }

    pub fn start_subscenario(&self) {
        self.tx.send_modify(|p| p.subscenarios += 1);
    }

    pub fn finish_subscenario(&self) {
        self.tx.send_modify(|p| p.subscenarios = p.subscenarios.saturating_sub(1));
    }

    pub async fn assertions_settled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only ends on success
        let _ = rx.wait_for(|p| p.assertions == 0).await;
    }

    pub async fn subscenarios_settled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|p| p.subscenarios == 0).await;
    }

    /// Both counts are zero at the same time
    pub async fn settled(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|p| *p == Pending::default()).await;
    }
}

/// Render expected values in messages
fn describe(data: &Data) -> String {
    match data {
        Data::String(s) => format!("'{s}'"),
        other => format!("{other:?}"),
    }
}

/// Equality that treats `"200"` and `200` as equal
fn loose_eq(a: &Data, b: &Data) -> bool {
    if a == b {
        return true;
    }
    let scalar = |d: &Data| matches!(d, Data::String(_) | Data::Number(_) | Data::Bool(_));
    scalar(a) && scalar(b) && a.to_text() == b.to_text()
}

/// A pending assertion about one value
pub struct Assertion {
    scenario: Scenario,
    tracker: Arc<Tracker>,
    value: Value,
    negate: bool,
    optional: bool,
    message: Option<String>,
    resolved: bool,
}

impl Assertion {
    pub(crate) fn new(scenario: Scenario, tracker: Arc<Tracker>, value: Value) -> Self {
        tracker.start_assertion();
        Self {
            scenario,
            tracker,
            value,
            negate: false,
            optional: false,
            message: None,
            resolved: false,
        }
    }

    /// Invert the next matcher
    pub fn not(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    /// Record a failure as a warning instead of failing the scenario
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Use `message` instead of the value name as the subject
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    fn subject(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| self.value.name().to_string())
    }

    fn resolve(mut self, ok: bool, claim: &str, negated: &str, actual: Option<String>) -> bool {
        let passed = ok != self.negate;
        let text = format!(
            "{} {}",
            self.subject(),
            if self.negate { negated } else { claim }
        );

        let kind = match (passed, self.optional) {
            (true, _) => LogKind::Pass,
            (false, true) => LogKind::Warning,
            (false, false) => LogKind::Fail,
        };
        let mut entry = LogEntry::new(kind, text);
        if !passed {
            if let Some(actual) = actual {
                entry = entry.with_detail(actual);
            }
        }
        self.scenario.record(entry);
        self.resolved = true;
        passed
    }

    fn actual(&self) -> Option<String> {
        Some(format!("Actual value: {}", describe(self.value.data())))
    }

    /// Loose equality (`"200"` equals `200`)
    pub fn equals(self, expected: impl Into<Data>) -> bool {
        let expected = expected.into();
        let ok = loose_eq(self.value.data(), &expected);
        let shown = describe(&expected);
        let actual = self.actual();
        self.resolve(
            ok,
            &format!("is equal to {shown}"),
            &format!("is not equal to {shown}"),
            actual,
        )
    }

    /// Strict equality, type included
    pub fn exactly(self, expected: impl Into<Data>) -> bool {
        let expected = expected.into();
        let ok = self.value.data() == &expected;
        let shown = describe(&expected);
        let actual = self.actual();
        self.resolve(
            ok,
            &format!("is exactly {shown}"),
            &format!("is not exactly {shown}"),
            actual,
        )
    }

    /// Substring, array item, or object key
    pub fn contains(self, needle: impl Into<Data>) -> bool {
        let needle = needle.into();
        let ok = match self.value.data() {
            Data::Array(items) => items.iter().any(|item| loose_eq(item, &needle)),
            Data::Object(map) => map.contains_key(&needle.to_text()),
            other => other.to_text().contains(&needle.to_text()),
        };
        let shown = describe(&needle);
        let actual = self.actual();
        self.resolve(
            ok,
            &format!("contains {shown}"),
            &format!("does not contain {shown}"),
            actual,
        )
    }

    pub fn starts_with(self, prefix: &str) -> bool {
        let ok = self.value.to_text().starts_with(prefix);
        let actual = self.actual();
        self.resolve(
            ok,
            &format!("starts with '{prefix}'"),
            &format!("does not start with '{prefix}'"),
            actual,
        )
    }

    pub fn ends_with(self, suffix: &str) -> bool {
        let ok = self.value.to_text().ends_with(suffix);
        let actual = self.actual();
        self.resolve(
            ok,
            &format!("ends with '{suffix}'"),
            &format!("does not end with '{suffix}'"),
            actual,
        )
    }

    /// Regular expression match; an invalid pattern always fails
    pub fn matches(self, pattern: &str) -> bool {
        let (ok, actual) = match regex::Regex::new(pattern) {
            Ok(re) => (re.is_match(&self.value.to_text()), self.actual()),
            Err(e) => (self.negate, Some(format!("Invalid pattern: {e}"))),
        };
        self.resolve(
            ok,
            &format!("matches /{pattern}/"),
            &format!("does not match /{pattern}/"),
            actual,
        )
    }

    /// Inclusive numeric range
    pub fn between(self, min: f64, max: f64) -> bool {
        let n = self.value.to_number();
        let ok = n >= min && n <= max;
        let actual = self.actual();
        self.resolve(
            ok,
            &format!("is between {min} and {max}"),
            &format!("is not between {min} and {max}"),
            actual,
        )
    }

    pub fn greater_than(self, bound: f64) -> bool {
        let ok = self.value.to_number() > bound;
        let actual = self.actual();
        self.resolve(
            ok,
            &format!("is greater than {bound}"),
            &format!("is not greater than {bound}"),
            actual,
        )
    }

    pub fn less_than(self, bound: f64) -> bool {
        let ok = self.value.to_number() < bound;
        let actual = self.actual();
        self.resolve(
            ok,
            &format!("is less than {bound}"),
            &format!("is not less than {bound}"),
            actual,
        )
    }

    /// Not null/undefined and, for lists, not empty
    pub fn exists(self) -> bool {
        let ok = match self.value.data() {
            Data::Undefined | Data::Null => false,
            Data::Array(items) => !items.is_empty(),
            _ => true,
        };
        let subject = self.subject();
        let detail = if ok {
            format!("{subject} exists")
        } else {
            format!("{subject} does not exist")
        };
        self.resolve(ok, "exists", "does not exist", Some(detail))
    }

    pub fn is_type(self, type_name: &str) -> bool {
        let actual_type = self.value.type_name();
        let ok = actual_type.eq_ignore_ascii_case(type_name);
        self.resolve(
            ok,
            &format!("is type {type_name}"),
            &format!("is not type {type_name}"),
            Some(format!("Actual type: {actual_type}")),
        )
    }

    pub fn has_length(self, length: usize) -> bool {
        let actual_len = self.value.len();
        self.resolve(
            actual_len == length,
            &format!("has length {length}"),
            &format!("does not have length {length}"),
            Some(format!("Actual length: {actual_len}")),
        )
    }

    /// Shorthand for [`has_length`](Assertion::has_length)
    pub fn length(self, length: usize) -> bool {
        self.has_length(length)
    }

    /// Array membership (loose equality)
    pub fn includes(self, item: impl Into<Data>) -> bool {
        let item = item.into();
        let ok = self
            .value
            .to_array()
            .iter()
            .any(|v| loose_eq(v.data(), &item));
        let shown = describe(&item);
        let actual = self.actual();
        self.resolve(
            ok,
            &format!("includes {shown}"),
            &format!("does not include {shown}"),
            actual,
        )
    }

    pub fn is_empty(self) -> bool {
        let ok = self.value.is_empty();
        let actual = self.actual();
        self.resolve(ok, "is empty", "is not empty", actual)
    }

    /// Every item satisfies `predicate`
    pub fn every(self, predicate: impl Fn(&Value) -> bool) -> bool {
        let ok = self.value.to_array().iter().all(|item| predicate(item));
        let actual = self.actual();
        self.resolve(ok, "all match", "do not all match", actual)
    }

    /// At least one item satisfies `predicate`
    pub fn some(self, predicate: impl Fn(&Value) -> bool) -> bool {
        let ok = self.value.to_array().iter().any(|item| predicate(item));
        let actual = self.actual();
        self.resolve(ok, "has a match", "has no match", actual)
    }

    /// No item satisfies `predicate`
    pub fn none(self, predicate: impl Fn(&Value) -> bool) -> bool {
        let ok = !self.value.to_array().iter().any(|item| predicate(item));
        let actual = self.actual();
        self.resolve(ok, "has no match", "has a match", actual)
    }
}

impl Drop for Assertion {
    fn drop(&mut self) {
        if !self.resolved {
            self.scenario.record(LogEntry::new(
                LogKind::Warning,
                format!("Incomplete assertion: {}", self.subject()),
            ));
        }
        self.tracker.finish_assertion();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&Data::from("200"), &Data::from(200)));
        assert!(!loose_eq(&Data::from("200"), &Data::Null));
        assert!(loose_eq(&Data::from(vec![1]), &Data::from(vec![1])));
    }

    #[test]
    fn test_describe_quotes_strings() {
        assert_eq!(describe(&Data::from("x")), "'x'");
        assert_eq!(describe(&Data::from(3)), "3");
    }

    #[tokio::test]
    async fn test_tracker_settles() {
        let tracker = Tracker::new();
        tracker.start_assertion();
        tracker.start_subscenario();
        assert_eq!(
            tracker.snapshot(),
            Pending {
                assertions: 1,
                subscenarios: 1
            }
        );

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.assertions_settled().await })
        };
        tracker.finish_assertion();
        waiter.await.unwrap();
        tracker.finish_subscenario();
        tracker.subscenarios_settled().await;
        assert_eq!(tracker.snapshot(), Pending::default());
    }

    #[tokio::test]
    async fn test_tracker_settles_only_when_both_counts_are_zero() {
        let tracker = Tracker::new();
        tracker.start_subscenario();

        let waiter = {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.settled().await })
        };
        // The sub-scenario starts an assertion before it finishes
        tracker.start_assertion();
        tracker.finish_subscenario();
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        tracker.finish_assertion();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("tracker did not settle")
            .unwrap();
    }
}
