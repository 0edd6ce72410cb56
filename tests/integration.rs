//! End-to-end tests for the flagrun CLI
//!
//! These tests run the built binary against the suite files in
//! `tests/fixtures`, always with `--dry-run` so nothing touches the network.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

/// Test context with an isolated working and config directory
struct TestContext {
    /// Working directory; a `flagrun.toml` here is picked up
    work_dir: TempDir,
    /// Path to fixtures directory
    fixtures_dir: PathBuf,
}

/// Captured output of one CLI invocation
struct CliOutput {
    stdout: String,
    stderr: String,
    success: bool,
    code: Option<i32>,
}

impl TestContext {
    fn new() -> Self {
        let manifest_dir = env!("CARGO_MANIFEST_DIR");
        Self {
            work_dir: TempDir::new().expect("Failed to create temp dir"),
            fixtures_dir: PathBuf::from(manifest_dir).join("tests").join("fixtures"),
        }
    }

    fn fixture(&self, name: &str) -> String {
        self.fixtures_dir.join(name).display().to_string()
    }

    /// Write a project-local config file
    fn create_config(&self, content: &str) {
        fs::write(self.work_dir.path().join("flagrun.toml"), content)
            .expect("Failed to write config");
    }

    fn run(&self, args: &[&str]) -> CliOutput {
        let config_home = self.work_dir.path().join("config");
        let output = Command::new(env!("CARGO_BIN_EXE_flagrun"))
            .args(args)
            .current_dir(self.work_dir.path())
            .env("XDG_CONFIG_HOME", &config_home)
            .env("HOME", self.work_dir.path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .output()
            .expect("Failed to run flagrun");

        CliOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

// ============== Tests ==============

#[test]
fn test_dry_run_passes() {
    let ctx = TestContext::new();
    let output = ctx.run(&["run", "--dry-run", &ctx.fixture("smoke.yaml")]);

    assert!(output.success, "stdout: {}\nstderr: {}", output.stdout, output.stderr);
    assert!(output.stdout.contains("Dry-run smoke suite"));
    assert!(output.stdout.contains("3 scenario(s), 0 failed, 1 skipped"));
}

#[test]
fn test_failing_suite_exits_nonzero() {
    let ctx = TestContext::new();
    let output = ctx.run(&["run", "--dry-run", &ctx.fixture("failing.yaml")]);

    assert_eq!(output.code, Some(1));
    assert!(output.stdout.contains("missing page"));
    assert!(output.stdout.contains("HTTP Status is equal to 404"));
    assert!(output.stderr.contains("1 suite(s) failed"));
}

#[test]
fn test_json_report() {
    let ctx = TestContext::new();
    let output = ctx.run(&["run", "--dry-run", "--json", &ctx.fixture("smoke.yaml")]);
    assert!(output.success, "stderr: {}", output.stderr);

    let reports: serde_json::Value =
        serde_json::from_str(&output.stdout).expect("report should be JSON");
    let suite = &reports[0];
    assert_eq!(suite["title"], "Dry-run smoke suite");
    assert_eq!(suite["passed"], true);
    assert_eq!(suite["scenarios"][2]["status"]["state"], "skipped");
}

#[test]
fn test_tag_filter() {
    let ctx = TestContext::new();
    let output = ctx.run(&[
        "run",
        "--dry-run",
        "--tag",
        "smoke",
        &ctx.fixture("smoke.yaml"),
    ]);

    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("1 scenario(s), 0 failed, 0 skipped"));
}

#[test]
fn test_validate() {
    let ctx = TestContext::new();
    let output = ctx.run(&["validate", &ctx.fixture("smoke.yaml")]);
    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("(3 scenario(s))"));

    let output = ctx.run(&["validate", &ctx.fixture("invalid.yaml")]);
    assert!(!output.success);
    assert!(output.stdout.contains("cannot wait for itself"));
}

#[test]
fn test_missing_file() {
    let ctx = TestContext::new();
    let output = ctx.run(&["run", "does-not-exist.yaml"]);
    assert!(!output.success);
    assert!(output.stderr.contains("Failed to read file"));
}

#[test]
fn test_config_loading() {
    let ctx = TestContext::new();
    ctx.create_config(
        r#"
[timeouts]
phase_ms = 1234

[defaults]
response_type = "json"
"#,
    );

    let output = ctx.run(&["config"]);
    assert!(output.success, "stderr: {}", output.stderr);
    assert!(output.stdout.contains("phase_ms: 1234"));
    assert!(output.stdout.contains("Json"));
}

#[test]
fn test_invalid_config_is_reported() {
    let ctx = TestContext::new();
    ctx.create_config("[timeouts]\nphase_ms = \"soon\"\n");

    let output = ctx.run(&["run", "--dry-run", &ctx.fixture("smoke.yaml")]);
    assert!(!output.success);
    assert!(output.stderr.contains("Invalid configuration file"));
}
