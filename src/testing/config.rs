//! Suite file configuration types
//!
//! Defines the data structures for deserializing YAML suite files.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::common::{Error, Result};
use crate::scenario::{Method, ResponseType};

/// A complete suite loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct SuiteFile {
    /// Name of the suite
    pub name: String,
    /// Optional description of what the suite verifies
    pub description: Option<String>,
    /// Base URL relative scenario paths resolve against
    pub base_url: Option<String>,
    /// Response type for scenarios that don't declare one
    pub response_type: Option<ResponseType>,
    /// The scenarios, in declaration order
    pub scenarios: Vec<ScenarioSpec>,
}

/// One scenario in a suite file
#[derive(Deserialize, Debug)]
pub struct ScenarioSpec {
    pub title: String,
    /// Target path or URL; may contain `{name}` placeholders
    pub path: String,
    #[serde(default)]
    pub method: Method,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Values for `{name}` placeholders in `path`
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Raw request body
    pub body: Option<String>,
    /// JSON request body; takes precedence over `body`
    pub json: Option<serde_json::Value>,
    pub response_type: Option<ResponseType>,
    /// Request timeout override in milliseconds
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Titles of scenarios that must pass first
    #[serde(default)]
    pub wait_for: Vec<String>,
    /// Skip instead of running, with the given reason
    pub skip: Option<String>,
    /// Expectations checked against the response, in order
    pub steps: Vec<Step>,
}

/// A single expectation in a scenario
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "expect", rename_all = "snake_case")]
pub enum Step {
    /// Response status code
    Status {
        equals: Option<u16>,
        /// Inclusive range, e.g. `[200, 299]`
        between: Option<(u16, u16)>,
    },
    /// Response header
    Header {
        name: String,
        equals: Option<String>,
        contains: Option<String>,
        /// Only check that the header is present
        #[serde(default)]
        exists: bool,
    },
    /// Substring of the raw body
    BodyContains {
        text: String,
        #[serde(default)]
        not: bool,
    },
    /// Value at a dotted path in a JSON body
    Json {
        path: String,
        equals: Option<serde_json::Value>,
        contains: Option<serde_json::Value>,
        #[serde(rename = "type")]
        type_name: Option<String>,
        length: Option<usize>,
        matches: Option<String>,
    },
    /// Selector or path that must resolve to something
    Exists {
        selector: String,
        #[serde(default)]
        optional: bool,
    },
    /// Free-form comment in the log
    Comment { text: String },
}

impl SuiteFile {
    /// Read and parse a suite file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let suite: SuiteFile = serde_yaml::from_str(content)?;
        suite.validate()?;
        Ok(suite)
    }

    /// Structural checks serde can't express
    pub fn validate(&self) -> Result<()> {
        if let Some(base) = &self.base_url {
            url::Url::parse(base).map_err(|e| Error::InvalidUrl {
                url: base.clone(),
                reason: e.to_string(),
            })?;
        }

        let mut seen = std::collections::HashSet::new();
        for scenario in &self.scenarios {
            if !seen.insert(scenario.title.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate scenario title '{}'",
                    scenario.title
                )));
            }
            if scenario.steps.is_empty() {
                return Err(Error::Config(format!(
                    "Scenario '{}' has no steps",
                    scenario.title
                )));
            }
        }

        for scenario in &self.scenarios {
            for dependency in &scenario.wait_for {
                if dependency == &scenario.title {
                    return Err(Error::SelfDependency(scenario.title.clone()));
                }
                if !seen.contains(dependency.as_str()) {
                    return Err(Error::Config(format!(
                        "Scenario '{}' waits for unknown scenario '{}'",
                        scenario.title, dependency
                    )));
                }
            }
        }
        Ok(())
    }
}
