//! CLI command handling
//!
//! Dispatches CLI commands to the suite runner and formats output.

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;

use crate::adapter::MockAdapter;
use crate::commands::Commands;
use crate::common::{paths, Config, Error, ExecutionOptions, Result};
use crate::engine::Engine;
use crate::testing::{self, RunOptions};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            files,
            tag,
            base_url,
            phase_timeout,
            dry_run,
            json,
            verbose,
        } => {
            let config = Config::load()?;
            let mut options = ExecutionOptions::from_config(&config);
            if let Some(ms) = phase_timeout {
                options = options.with_phase_timeout(Duration::from_millis(ms));
            }

            let mut engine = Engine::new(options);
            if dry_run {
                engine = engine.with_network_adapter(Arc::new(MockAdapter::new().with_fallback()));
            }

            let run = RunOptions {
                tag,
                base_url,
                default_base_url: config.defaults.base_url.clone(),
                verbose,
            };

            let mut reports = Vec::with_capacity(files.len());
            for file in &files {
                let report = testing::run_suite(file, engine.clone(), &run).await?;
                if !json {
                    testing::print_report(&report, verbose);
                }
                reports.push(report);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            }

            let failed = reports.iter().filter(|r| !r.passed).count();
            if failed > 0 {
                return Err(Error::SuitesFailed(failed));
            }
            Ok(())
        }

        Commands::Validate { files } => {
            let mut invalid = 0;
            for file in &files {
                match testing::validate_suite(file) {
                    Ok(suite) => println!(
                        "  {} {} ({} scenario(s))",
                        "✓".green(),
                        file.display(),
                        suite.scenarios.len()
                    ),
                    Err(e) => {
                        invalid += 1;
                        println!("  {} {}: {}", "✗".red(), file.display(), e);
                    }
                }
            }
            if invalid > 0 {
                return Err(Error::Config(format!("{invalid} invalid suite file(s)")));
            }
            Ok(())
        }

        Commands::Config { path } => {
            let project = paths::project_config_path();
            let user = paths::config_path();

            println!("Project config: {}", project.display());
            match &user {
                Some(user) => println!("User config:    {}", user.display()),
                None => println!("User config:    (no config directory)"),
            }
            if path {
                return Ok(());
            }

            let config = Config::load()?;
            println!("\n{config:#?}");
            Ok(())
        }
    }
}
