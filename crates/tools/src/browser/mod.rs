//! CDP-based browser automation.
//!
//! - `session`: launches Chrome with anti-detection settings and drives one page target
//! - `manager`: scoped session leases with guaranteed teardown
//! - `navigator`: load, wait for readiness, expand collapsed sections
//! - `network`: bounded capture of network traffic for payload extraction

pub mod cdp;
#[cfg(test)]
pub(crate) mod fake;
pub mod manager;
pub mod navigator;
pub mod network;
pub mod session;
pub mod stealth;

use async_trait::async_trait;
use rapidapi_core::Result;
use serde_json::Value;

pub use manager::{SessionLease, SessionManager};
pub use navigator::{load_page, NavigationOptions, PageSnapshot};
pub use network::{CapturedResponse, NetworkMonitor};
pub use session::{BrowserSession, ChromeLauncher};

/// One controllable browser page.
///
/// Implemented by [`BrowserSession`] over CDP; tests substitute in-memory pages.
#[async_trait]
pub trait PageDriver: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Evaluate a JavaScript expression (promises are awaited) and return its value.
    async fn evaluate(&mut self, expression: &str) -> Result<Value>;

    /// Start recording network requests/responses. Clears earlier captures.
    async fn start_network_capture(&mut self) -> Result<()>;

    async fn stop_network_capture(&mut self);

    /// Captured responses whose URL contains `url_filter` (case-insensitive).
    async fn captured_responses(&mut self, url_filter: Option<&str>) -> Vec<CapturedResponse>;

    async fn response_body(&mut self, request_id: &str) -> Result<Option<String>>;

    /// Graceful shutdown: close the browser and reap the process.
    async fn close(&mut self);

    /// Best-effort synchronous kill, used when a lease is dropped without release.
    fn kill(&mut self);
}

/// Starts browser processes for the session manager.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, session_name: &str) -> Result<Box<dyn PageDriver>>;
}
