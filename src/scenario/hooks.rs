//! Phase and lifecycle hook callbacks

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::{AssertionContext, Scenario};
use crate::adapter::Response;
use crate::value::Value;

pub type PhaseFn = Arc<dyn Fn(AssertionContext) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync>;
pub type HookFn = Arc<dyn Fn(Scenario) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;
pub type PipeFn = Arc<dyn Fn(Response) -> BoxFuture<'static, anyhow::Result<Response>> + Send + Sync>;

/// Lifecycle stage a hook list belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Before,
    After,
    Success,
    Failure,
    Finally,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => write!(f, "before"),
            Self::After => write!(f, "after"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Finally => write!(f, "finally"),
        }
    }
}

/// An assertion phase
#[derive(Clone)]
pub struct Phase {
    pub label: Option<String>,
    pub callback: PhaseFn,
}

/// A lifecycle hook
#[derive(Clone)]
pub struct Hook {
    pub label: Option<String>,
    pub callback: HookFn,
}

/// A response-mutation hook
#[derive(Clone)]
pub struct Pipe {
    pub label: Option<String>,
    pub callback: PipeFn,
}

/// Ordered hook lists, one per stage, plus pipes
#[derive(Clone, Default)]
pub(crate) struct HookLists {
    before: Vec<Hook>,
    after: Vec<Hook>,
    success: Vec<Hook>,
    failure: Vec<Hook>,
    finally: Vec<Hook>,
    pub pipes: Vec<Pipe>,
}

impl HookLists {
    pub fn stage(&self, stage: HookStage) -> &Vec<Hook> {
        match stage {
            HookStage::Before => &self.before,
            HookStage::After => &self.after,
            HookStage::Success => &self.success,
            HookStage::Failure => &self.failure,
            HookStage::Finally => &self.finally,
        }
    }

    pub fn stage_mut(&mut self, stage: HookStage) -> &mut Vec<Hook> {
        match stage {
            HookStage::Before => &mut self.before,
            HookStage::After => &mut self.after,
            HookStage::Success => &mut self.success,
            HookStage::Failure => &mut self.failure,
            HookStage::Finally => &mut self.finally,
        }
    }
}

pub(crate) fn phase_fn<F, Fut>(f: F) -> PhaseFn
where
    F: Fn(AssertionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

pub(crate) fn hook_fn<F, Fut>(f: F) -> HookFn
where
    F: Fn(Scenario) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |scenario| f(scenario).boxed())
}

pub(crate) fn pipe_fn<F, Fut>(f: F) -> PipeFn
where
    F: Fn(Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Response>> + Send + 'static,
{
    Arc::new(move |response| f(response).boxed())
}
