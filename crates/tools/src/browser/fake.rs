//! In-memory browser used by unit tests.

use async_trait::async_trait;
use rapidapi_core::{Error, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::navigator::{LOCATION_JS, OUTER_HTML_JS, READY_STATE_JS};
use super::{BrowserLauncher, CapturedResponse, PageDriver};

#[derive(Default)]
pub struct FakeStats {
    pub launches: AtomicUsize,
    pub closes: AtomicUsize,
    pub kills: AtomicUsize,
    navigations: Mutex<Vec<String>>,
    scripts: Mutex<Vec<String>>,
}

impl FakeStats {
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    /// Expressions evaluated other than the readiness/HTML/location lookups.
    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakeLauncher {
    pages: HashMap<String, String>,
    network: Vec<(String, String)>,
    fail_launch: bool,
    fail_navigation: bool,
    fail_capture: bool,
    never_ready: bool,
    pub stats: Arc<FakeStats>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// A response the page "fetches" while network capture is on.
    pub fn with_network_response(mut self, url: &str, body: &str) -> Self {
        self.network.push((url.to_string(), body.to_string()));
        self
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    pub fn failing_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    /// Network capture cannot be enabled, as when the Network domain is refused.
    pub fn failing_capture(mut self) -> Self {
        self.fail_capture = true;
        self
    }

    pub fn never_ready(mut self) -> Self {
        self.never_ready = true;
        self
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, _session_name: &str) -> Result<Box<dyn PageDriver>> {
        if self.fail_launch {
            return Err(Error::Config("No Chrome/Chromium browser found".to_string()));
        }
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeDriver {
            pages: self.pages.clone(),
            network: self.network.clone(),
            fail_navigation: self.fail_navigation,
            fail_capture: self.fail_capture,
            never_ready: self.never_ready,
            current_url: "about:blank".to_string(),
            capturing: false,
            stats: self.stats.clone(),
        }))
    }
}

struct FakeDriver {
    pages: HashMap<String, String>,
    network: Vec<(String, String)>,
    fail_navigation: bool,
    fail_capture: bool,
    never_ready: bool,
    current_url: String,
    capturing: bool,
    stats: Arc<FakeStats>,
}

impl FakeDriver {
    fn current_html(&self) -> String {
        let without_query = self.current_url.split('?').next().unwrap_or_default();
        self.pages
            .get(&self.current_url)
            .or_else(|| self.pages.get(without_query))
            .cloned()
            .unwrap_or_else(|| "<html><head></head><body></body></html>".to_string())
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.stats.navigations.lock().unwrap().push(url.to_string());
        if self.fail_navigation {
            return Err(Error::Browser(format!(
                "Navigation to {} failed: net::ERR_CONNECTION_RESET",
                url
            )));
        }
        self.current_url = url.to_string();
        Ok(())
    }

    async fn evaluate(&mut self, expression: &str) -> Result<Value> {
        Ok(match expression {
            READY_STATE_JS if self.never_ready => json!("loading"),
            READY_STATE_JS => json!("complete"),
            OUTER_HTML_JS => json!(self.current_html()),
            LOCATION_JS => json!(self.current_url),
            other => {
                self.stats.scripts.lock().unwrap().push(other.to_string());
                json!(true)
            }
        })
    }

    async fn start_network_capture(&mut self) -> Result<()> {
        if self.fail_capture {
            return Err(Error::Browser("CDP error in Network.enable: not allowed".to_string()));
        }
        self.capturing = true;
        Ok(())
    }

    async fn stop_network_capture(&mut self) {
        self.capturing = false;
    }

    async fn captured_responses(&mut self, url_filter: Option<&str>) -> Vec<CapturedResponse> {
        if !self.capturing {
            return Vec::new();
        }
        let filter = url_filter.map(str::to_lowercase);
        self.network
            .iter()
            .enumerate()
            .filter(|(_, (url, _))| {
                filter
                    .as_deref()
                    .map_or(true, |f| url.to_lowercase().contains(f))
            })
            .map(|(i, (url, _))| CapturedResponse {
                request_id: i.to_string(),
                url: url.clone(),
                status: Some(200),
                mime_type: Some("application/json".to_string()),
                resource_type: Some("Fetch".to_string()),
            })
            .collect()
    }

    async fn response_body(&mut self, request_id: &str) -> Result<Option<String>> {
        let body = request_id
            .parse::<usize>()
            .ok()
            .and_then(|i| self.network.get(i))
            .map(|(_, body)| body.clone());
        Ok(body)
    }

    async fn close(&mut self) {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn kill(&mut self) {
        self.stats.kills.fetch_add(1, Ordering::SeqCst);
    }
}
