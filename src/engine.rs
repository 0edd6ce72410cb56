//! Engine wiring: execution options plus the adapters scenarios fetch with
//!
//! An [`Engine`] is built once per run and handed to every suite, which in
//! turn hands it to every scenario it creates.

use std::sync::Arc;

use crate::adapter::{DefaultResponseFactory, FetchAdapter, HttpAdapter, ResponseFactory};
use crate::common::{Error, ExecutionOptions, Result};
use crate::scenario::ResponseType;

/// Shared execution options and collaborators
#[derive(Clone)]
pub struct Engine {
    options: Arc<ExecutionOptions>,
    network: Arc<dyn FetchAdapter>,
    browser: Option<Arc<dyn FetchAdapter>>,
    factory: Arc<dyn ResponseFactory>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(ExecutionOptions::default())
    }
}

impl Engine {
    /// Engine with the reqwest network adapter and the default document factory
    pub fn new(options: ExecutionOptions) -> Self {
        Self {
            options: Arc::new(options),
            network: Arc::new(HttpAdapter::new()),
            browser: None,
            factory: Arc::new(DefaultResponseFactory),
        }
    }

    pub fn with_network_adapter(mut self, adapter: Arc<dyn FetchAdapter>) -> Self {
        self.network = adapter;
        self
    }

    /// Adapter used for response types that need a live browser
    pub fn with_browser_adapter(mut self, adapter: Arc<dyn FetchAdapter>) -> Self {
        self.browser = Some(adapter);
        self
    }

    pub fn with_response_factory(mut self, factory: Arc<dyn ResponseFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    pub fn factory(&self) -> &Arc<dyn ResponseFactory> {
        &self.factory
    }

    /// Pick the adapter for a response type
    pub fn adapter_for(&self, response_type: ResponseType) -> Result<Arc<dyn FetchAdapter>> {
        if response_type.requires_browser() {
            self.browser
                .clone()
                .ok_or_else(|| Error::AdapterMissing(response_type.to_string()))
        } else {
            Ok(self.network.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MockAdapter;

    #[test]
    fn test_browser_types_need_browser_adapter() {
        let engine = Engine::default();
        assert_eq!(engine.adapter_for(ResponseType::Html).unwrap().name(), "http");
        assert!(matches!(
            engine.adapter_for(ResponseType::Browser),
            Err(Error::AdapterMissing(_))
        ));

        let engine = engine.with_browser_adapter(Arc::new(MockAdapter::new()));
        assert_eq!(engine.adapter_for(ResponseType::Extjs).unwrap().name(), "mock");
    }
}
