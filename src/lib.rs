//! flagrun - a scenario execution engine for test automation
//!
//! A [`Suite`] owns [`Scenario`]s. Each scenario fetches one resource
//! through a [`FetchAdapter`](adapter::FetchAdapter), then runs its
//! assertion phases in order against the response, recording every outcome
//! in its log.

pub mod adapter;
pub mod cli;
pub mod commands;
pub mod common;
pub mod engine;
pub mod scenario;
pub mod suite;
pub mod testing;
pub mod value;

// Re-export commonly used types for tests
pub use common::{Error, ExecutionOptions, Result};
pub use engine::Engine;
pub use scenario::{AssertionContext, Outcome, ResponseType, Scenario, ScenarioStatus};
pub use suite::Suite;
pub use value::{Data, Value};
