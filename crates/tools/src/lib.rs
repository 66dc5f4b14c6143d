pub mod assess;
pub mod browser;
pub mod docs;
pub mod extract;
pub mod marketplace;
pub mod mcp;
pub mod pricing;
pub mod registry;
pub mod search_apis;

use async_trait::async_trait;
use rapidapi_core::{Config, Paths, Result};
use serde_json::Value;
use std::sync::Arc;

use browser::{ChromeLauncher, SessionManager};

pub use registry::ToolRegistry;

/// Everything a tool call needs: configuration and the shared browser.
#[derive(Clone)]
pub struct ToolContext {
    pub config: Config,
    pub sessions: Arc<SessionManager>,
}

impl ToolContext {
    pub fn new(config: Config, sessions: Arc<SessionManager>) -> Self {
        Self { config, sessions }
    }

    /// Context backed by a real Chrome/Chromium launcher.
    pub fn with_chrome(config: Config, paths: Paths) -> Self {
        let launcher = ChromeLauncher::new(config.browser.clone(), paths)
            .with_network_capacity(config.scraper.max_network_entries)
            .with_command_timeout(config.scraper.page_timeout());
        let sessions = SessionManager::new(Arc::new(launcher), config.browser.idle_timeout());
        Self::new(config, Arc::new(sessions))
    }
}

pub struct ToolSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;
    /// Cheap argument checks that need no configuration.
    fn validate(&self, params: &Value) -> Result<()>;
    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value>;
}

/// Context over an in-memory browser with no settle/expand delays.
#[cfg(test)]
pub(crate) fn test_context(launcher: Arc<browser::fake::FakeLauncher>) -> ToolContext {
    let mut config = Config::default();
    config.scraper.settle_ms = 0;
    config.scraper.expand_wait_ms = 0;
    config.scraper.page_timeout_secs = 2;
    ToolContext::new(config, Arc::new(SessionManager::new(launcher, None)))
}
