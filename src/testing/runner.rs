//! Suite runner implementation
//!
//! Turns a parsed suite file into a live [`Suite`], runs it to completion
//! and prints a colored report.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;

use crate::common::{Error, Result};
use crate::engine::Engine;
use crate::scenario::{AssertionContext, LogKind, RequestBody, Scenario, ScenarioStatus};
use crate::suite::{Suite, SuiteReport};
use crate::value::{Data, Value};

use super::config::{ScenarioSpec, Step, SuiteFile};

/// Options for one `flagrun run` invocation
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Only run scenarios carrying this tag
    pub tag: Option<String>,
    /// Override every suite's base URL
    pub base_url: Option<String>,
    /// Base URL for suites that don't set one
    pub default_base_url: Option<String>,
    /// Print the full log of every scenario
    pub verbose: bool,
}

/// Run a suite file and return its report
pub async fn run_suite(path: &Path, engine: Engine, options: &RunOptions) -> Result<SuiteReport> {
    let file = SuiteFile::load(path)?;
    tracing::info!(suite = %file.name, path = %path.display(), "Running suite file");

    let suite = build_suite(&file, engine, options).await?;
    suite.execute()?;
    suite.wait_for_finished().await;
    Ok(suite.report())
}

/// Build a held suite from a parsed file
///
/// Every scenario is fully configured before any of them runs; the caller
/// releases them with [`Suite::execute`].
pub async fn build_suite(file: &SuiteFile, engine: Engine, options: &RunOptions) -> Result<Suite> {
    let default_type = engine.options().default_response_type;
    let suite = Suite::new(&file.name, engine);
    let base = options
        .base_url
        .as_ref()
        .or(file.base_url.as_ref())
        .or(options.default_base_url.as_ref());
    if let Some(base) = base {
        suite.base(base)?;
    }
    suite.wait()?;

    let selected: Vec<&ScenarioSpec> = file
        .scenarios
        .iter()
        .filter(|spec| match &options.tag {
            Some(tag) => spec.tags.iter().any(|t| t == tag),
            None => true,
        })
        .collect();

    let mut built: HashMap<&str, Scenario> = HashMap::new();
    for spec in &selected {
        let response_type = spec
            .response_type
            .or(file.response_type)
            .unwrap_or(default_type);
        let scenario = suite.scenario(&spec.title, response_type);
        configure(&scenario, spec)?;
        built.insert(spec.title.as_str(), scenario);
    }

    for spec in &selected {
        let scenario = &built[spec.title.as_str()];
        for dependency in &spec.wait_for {
            match built.get(dependency.as_str()) {
                Some(other) => {
                    scenario.wait_for(other)?;
                }
                None => tracing::warn!(
                    scenario = %spec.title,
                    %dependency,
                    "Dependency filtered out, not waiting for it"
                ),
            }
        }
    }

    for spec in &selected {
        if let Some(reason) = &spec.skip {
            built[spec.title.as_str()]
                .skip(Some(reason.as_str()))
                .await?;
        }
    }

    Ok(suite)
}

fn configure(scenario: &Scenario, spec: &ScenarioSpec) -> Result<()> {
    scenario
        .method(spec.method)?
        .headers(spec.headers.clone())?
        .params(spec.params.clone())?;

    if let Some(json) = &spec.json {
        scenario.json_body(json.clone())?;
    } else if let Some(body) = &spec.body {
        scenario.body(RequestBody::Text(body.clone()))?;
    }
    if let Some(ms) = spec.timeout_ms {
        scenario.timeout(Duration::from_millis(ms))?;
    }
    for tag in &spec.tags {
        scenario.tag(tag)?;
    }

    let steps = Arc::new(spec.steps.clone());
    scenario.open(&spec.path)?.next(move |ctx| {
        let steps = steps.clone();
        async move {
            for step in steps.iter() {
                check_step(&ctx, step).await?;
            }
            Ok::<_, anyhow::Error>(Value::undefined())
        }
    })?;
    Ok(())
}

/// Record the assertions one step describes
async fn check_step(ctx: &AssertionContext, step: &Step) -> Result<()> {
    match step {
        Step::Status { equals, between } => {
            let status = ctx.status();
            match (equals, between) {
                (Some(code), _) => {
                    ctx.assert(status).equals(*code);
                }
                (None, Some((low, high))) => {
                    ctx.assert(status).between(f64::from(*low), f64::from(*high));
                }
                (None, None) => {
                    ctx.assert(status).between(200.0, 399.0);
                }
            }
        }

        Step::Header {
            name,
            equals,
            contains,
            exists,
        } => {
            let header = ctx.header(name);
            if *exists || (equals.is_none() && contains.is_none()) {
                ctx.assert(header.clone()).exists();
            }
            if let Some(expected) = equals {
                ctx.assert(header.clone()).equals(expected.as_str());
            }
            if let Some(needle) = contains {
                ctx.assert(header).contains(needle.as_str());
            }
        }

        Step::BodyContains { text, not } => {
            let assertion = ctx.assert(ctx.body());
            let assertion = if *not { assertion.not() } else { assertion };
            assertion.contains(text.as_str());
        }

        Step::Json {
            path,
            equals,
            contains,
            type_name,
            length,
            matches,
        } => {
            let value = ctx.find(path).await?;
            let mut checked = false;
            if let Some(expected) = equals {
                ctx.assert(value.clone()).equals(Data::from(expected.clone()));
                checked = true;
            }
            if let Some(needle) = contains {
                ctx.assert(value.clone()).contains(Data::from(needle.clone()));
                checked = true;
            }
            if let Some(type_name) = type_name {
                ctx.assert(value.clone()).is_type(type_name);
                checked = true;
            }
            if let Some(length) = length {
                ctx.assert(value.clone()).has_length(*length);
                checked = true;
            }
            if let Some(pattern) = matches {
                ctx.assert(value.clone()).matches(pattern);
                checked = true;
            }
            if !checked {
                ctx.assert(value).exists();
            }
        }

        Step::Exists { selector, optional } => {
            let value = ctx.find(selector).await?;
            let assertion = ctx.assert(value);
            let assertion = if *optional {
                assertion.optional()
            } else {
                assertion
            };
            assertion.exists();
        }

        Step::Comment { text } => ctx.comment(text.clone()),
    }
    Ok(())
}

/// Parse a suite file without running it
pub fn validate_suite(path: &Path) -> Result<SuiteFile> {
    let file = SuiteFile::load(path)?;
    if file.scenarios.is_empty() {
        return Err(Error::Config(format!(
            "Suite '{}' has no scenarios",
            file.name
        )));
    }
    Ok(file)
}

/// Print a suite report to stdout
pub fn print_report(report: &SuiteReport, verbose: bool) {
    println!(
        "\n{} {}",
        "Suite:".blue().bold(),
        report.title.white().bold()
    );

    for scenario in &report.scenarios {
        let mark = match scenario.status {
            ScenarioStatus::Completed(_) if scenario.status.is_passed() => "✓".green(),
            ScenarioStatus::Skipped | ScenarioStatus::Cancelled => "○".yellow(),
            _ => "✗".red(),
        };
        let took = scenario
            .duration_ms
            .map(|ms| format!(" ({ms}ms)"))
            .unwrap_or_default();
        println!(
            "  {} {} {}{}",
            mark,
            scenario.title,
            format!("[{}]", scenario.status).dimmed(),
            took.dimmed()
        );

        for entry in scenario.log.entries() {
            let show = verbose || entry.is_failure() || entry.kind == LogKind::Warning;
            if !show {
                continue;
            }
            let line = match entry.kind {
                LogKind::Heading => entry.message.bold().to_string(),
                LogKind::Subheading => entry.message.underline().to_string(),
                LogKind::Comment => entry.message.dimmed().to_string(),
                LogKind::Pass => format!("{} {}", "pass".green(), entry.message),
                LogKind::Fail => format!("{} {}", "fail".red(), entry.message),
                LogKind::Warning => format!("{} {}", "warn".yellow(), entry.message),
            };
            println!("      {line}");
            if let Some(detail) = &entry.detail {
                println!("        {}", detail.dimmed());
            }
        }
    }

    let summary = format!(
        "{} scenario(s), {} failed, {} skipped",
        report.total, report.failed, report.skipped
    );
    if report.passed {
        println!("\n{} {}\n", "✓".green().bold(), summary.green().bold());
    } else {
        println!("\n{} {}\n", "✗".red().bold(), summary.red().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{MockAdapter, Response};
    use crate::common::ExecutionOptions;

    const SUITE: &str = r#"
name: Catalog
base_url: http://shop.test/
response_type: json
scenarios:
  - title: list
    path: products
    tags: [smoke]
    steps:
      - expect: status
        equals: 200
      - expect: json
        path: items
        length: 2
  - title: detail
    path: products/{id}
    params:
      id: "1"
    wait_for: [list]
    steps:
      - expect: json
        path: name
        equals: Lamp
  - title: later
    path: products/99
    skip: not deployed yet
    steps:
      - expect: status
"#;

    fn engine() -> Engine {
        let adapter = MockAdapter::new()
            .route(
                "http://shop.test/products",
                Response::new("http://shop.test/products", r#"{"items":[1,2]}"#),
            )
            .route(
                "http://shop.test/products/1",
                Response::new("http://shop.test/products/1", r#"{"name":"Lamp"}"#),
            );
        Engine::new(ExecutionOptions::default()).with_network_adapter(Arc::new(adapter))
    }

    #[tokio::test]
    async fn test_build_and_run_suite() {
        let file = SuiteFile::parse(SUITE).unwrap();
        let suite = build_suite(&file, engine(), &RunOptions::default())
            .await
            .unwrap();
        assert_eq!(
            suite.get_scenario_by_title("later").unwrap().status(),
            ScenarioStatus::Skipped
        );

        suite.execute().unwrap();
        suite.wait_for_finished().await;

        let report = suite.report();
        assert!(report.passed, "{report:#?}");
        assert_eq!(report.total, 3);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_tag_filter() {
        let file = SuiteFile::parse(SUITE).unwrap();
        let options = RunOptions {
            tag: Some("smoke".to_string()),
            ..RunOptions::default()
        };
        let suite = build_suite(&file, engine(), &options).await.unwrap();
        let titles: Vec<String> = suite.scenarios().iter().map(Scenario::title).collect();
        assert_eq!(titles, vec!["list".to_string()]);
    }

    #[tokio::test]
    async fn test_failing_step_fails_suite() {
        let yaml = r#"
name: Broken
base_url: http://shop.test/
response_type: json
scenarios:
  - title: list
    path: products
    steps:
      - expect: json
        path: items
        length: 5
"#;
        let file = SuiteFile::parse(yaml).unwrap();
        let suite = build_suite(&file, engine(), &RunOptions::default())
            .await
            .unwrap();
        suite.execute().unwrap();
        suite.wait_for_finished().await;
        assert!(suite.failed());
        assert_eq!(suite.report().failed, 1);
    }
}
