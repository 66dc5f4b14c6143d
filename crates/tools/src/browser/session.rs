//! Chrome process launch and the CDP-backed [`PageDriver`].
//!
//! Each session owns one Chrome process and one CDP connection to its first
//! page target.

use async_trait::async_trait;
use rapidapi_core::{BrowserConfig, Error, Paths, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::cdp::CdpClient;
use super::network::{CapturedResponse, NetworkMonitor};
use super::stealth::{build_browser_args, humanize_user_agent, ACCEPT_LANGUAGE, STEALTH_SCRIPT};
use super::{BrowserLauncher, PageDriver};

/// A single browser session with its Chrome process and CDP client.
pub struct BrowserSession {
    name: String,
    /// Remote debugging port used to discover the page WebSocket URL.
    debug_port: u16,
    chrome_process: Child,
    cdp: CdpClient,
    user_data_dir: PathBuf,
    current_url: Option<String>,
    network: Arc<Mutex<NetworkMonitor>>,
    capture_tasks: Vec<tokio::task::JoinHandle<()>>,
    closed: bool,
}

impl BrowserSession {
    /// Install anti-detection patches and size the viewport.
    async fn prepare_page(&mut self, config: &BrowserConfig) -> Result<()> {
        self.cdp.enable_domain("Page").await?;
        self.cdp.enable_domain("Runtime").await?;
        self.cdp.add_script_on_new_document(STEALTH_SCRIPT).await?;

        let user_agent = match config.user_agent.clone() {
            Some(ua) => ua,
            None => {
                let version = self.cdp.browser_version().await?;
                humanize_user_agent(version.get("userAgent").and_then(|v| v.as_str()).unwrap_or_default())
            }
        };
        if !user_agent.is_empty() {
            self.cdp.set_user_agent_override(&user_agent, ACCEPT_LANGUAGE).await?;
        }
        self.cdp.set_viewport(config.window_width, config.window_height).await?;
        Ok(())
    }
}

#[async_trait]
impl PageDriver for BrowserSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        debug!(session = %self.name, from = ?self.current_url, url, "Navigating");
        self.cdp.navigate(url).await?;
        self.current_url = Some(url.to_string());
        Ok(())
    }

    async fn evaluate(&mut self, expression: &str) -> Result<Value> {
        self.cdp.evaluate(expression).await
    }

    async fn start_network_capture(&mut self) -> Result<()> {
        self.network.lock().await.clear();
        if !self.capture_tasks.is_empty() {
            return Ok(());
        }
        self.cdp.enable_domain("Network").await?;

        let mut requests = self.cdp.subscribe_event("Network.requestWillBeSent").await;
        let monitor = self.network.clone();
        self.capture_tasks.push(tokio::spawn(async move {
            while let Some(params) = requests.recv().await {
                monitor.lock().await.record_request(&params);
            }
        }));

        let mut responses = self.cdp.subscribe_event("Network.responseReceived").await;
        let monitor = self.network.clone();
        self.capture_tasks.push(tokio::spawn(async move {
            while let Some(params) = responses.recv().await {
                monitor.lock().await.record_response(&params);
            }
        }));

        info!(session = %self.name, "Network monitoring started");
        Ok(())
    }

    async fn stop_network_capture(&mut self) {
        if self.capture_tasks.is_empty() {
            return;
        }
        for task in self.capture_tasks.drain(..) {
            task.abort();
        }
        let (requests, responses) = self.network.lock().await.counts();
        debug!(session = %self.name, requests, responses, "Network traffic captured");
        self.cdp.unsubscribe_event("Network.requestWillBeSent").await;
        self.cdp.unsubscribe_event("Network.responseReceived").await;
        if let Err(e) = self.cdp.disable_domain("Network").await {
            debug!(session = %self.name, error = %e, "Network.disable failed");
        }
        info!(session = %self.name, "Network monitoring stopped");
    }

    async fn captured_responses(&mut self, url_filter: Option<&str>) -> Vec<CapturedResponse> {
        self.network.lock().await.responses(url_filter)
    }

    async fn response_body(&mut self, request_id: &str) -> Result<Option<String>> {
        self.cdp.get_response_body(request_id).await
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        for task in self.capture_tasks.drain(..) {
            task.abort();
        }
        // Try graceful close via CDP first
        if let Err(e) = self.cdp.send_command("Browser.close", serde_json::json!({})).await {
            debug!("CDP Browser.close failed (may already be closed): {}", e);
        }
        let _ = self.chrome_process.kill().await;
        info!(
            session = %self.name,
            port = self.debug_port,
            profile = %self.user_data_dir.display(),
            "Browser session closed"
        );
    }

    fn kill(&mut self) {
        self.closed = true;
        let _ = self.chrome_process.start_kill();
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Best-effort kill on drop
        let _ = self.chrome_process.start_kill();
    }
}

/// Launches Chrome/Chromium processes configured from [`BrowserConfig`].
pub struct ChromeLauncher {
    config: BrowserConfig,
    paths: Paths,
    max_network_entries: usize,
    command_timeout: Option<Duration>,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig, paths: Paths) -> Self {
        Self {
            config,
            paths,
            max_network_entries: DEFAULT_NETWORK_ENTRIES,
            command_timeout: None,
        }
    }

    /// Capacity of each per-session network buffer.
    pub fn with_network_capacity(mut self, max_entries: usize) -> Self {
        self.max_network_entries = max_entries;
        self
    }

    /// Upper bound on each CDP command of launched sessions.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout.max(Duration::from_secs(1)));
        self
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self, session_name: &str) -> Result<Box<dyn PageDriver>> {
        let browser_path = find_browser_binary(self.config.executable_path.as_deref())?;

        let user_data_dir = self.paths.session_profile_dir(session_name);
        std::fs::create_dir_all(&user_data_dir)?;

        let debug_port = find_free_port().await?;
        let args = build_browser_args(&self.config, debug_port, &user_data_dir);

        info!(
            session = session_name,
            port = debug_port,
            headless = self.config.headless,
            browser = %browser_path,
            "Launching browser for session"
        );

        let mut child = Command::new(&browser_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Config(format!("Failed to launch {}: {}", browser_path, e)))?;

        let launch_timeout = Duration::from_secs(self.config.launch_timeout_secs.max(1));
        let mut cdp = match connect_page(&mut child, debug_port, launch_timeout).await {
            Ok(cdp) => cdp,
            Err(e) => {
                let _ = child.kill().await;
                return Err(Error::Config(format!(
                    "Browser at {} did not start: {}",
                    browser_path, e
                )));
            }
        };

        if let Some(timeout) = self.command_timeout {
            cdp.set_command_timeout(timeout);
        }

        let mut session = BrowserSession {
            name: session_name.to_string(),
            debug_port,
            chrome_process: child,
            cdp,
            user_data_dir,
            current_url: None,
            network: Arc::new(Mutex::new(NetworkMonitor::new(self.max_network_entries))),
            capture_tasks: Vec::new(),
            closed: false,
        };

        if let Err(e) = session.prepare_page(&self.config).await {
            session.close().await;
            return Err(e);
        }

        info!(session = session_name, "CDP connection established (page target)");
        Ok(Box::new(session))
    }
}

const DEFAULT_NETWORK_ENTRIES: usize = 1000;

async fn connect_page(child: &mut Child, port: u16, timeout: Duration) -> Result<CdpClient> {
    wait_for_cdp_ready(child, port, timeout).await?;
    let page_ws_url = get_page_ws_url(port).await?;
    CdpClient::connect(&page_ws_url).await
}

/// Resolve the browser executable: the configured path first, then well-known
/// Chrome/Chromium/Edge locations and `$PATH`.
pub fn find_browser_binary(configured: Option<&str>) -> Result<String> {
    if let Some(path) = configured {
        if std::path::Path::new(path).exists() || which::which(path).is_ok() {
            return Ok(path.to_string());
        }
        return Err(Error::Config(format!(
            "Configured browser executable not found: {}",
            path
        )));
    }

    let candidates: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ]
    } else if cfg!(target_os = "linux") {
        &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/snap/bin/chromium",
            "microsoft-edge",
        ]
    } else {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ]
    };

    for candidate in candidates {
        if std::path::Path::new(candidate).exists() {
            return Ok(candidate.to_string());
        }
        if !candidate.contains('/') && !candidate.contains('\\') && which::which(candidate).is_ok() {
            return Ok(candidate.to_string());
        }
    }

    Err(Error::Config(
        "No Chrome/Chromium browser found. Install one or set RAPIDAPI_MCP_CHROME_PATH".to_string(),
    ))
}

async fn find_free_port() -> Result<u16> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

/// Poll `/json/version` until the DevTools endpoint answers, the process
/// exits, or `timeout` elapses.
async fn wait_for_cdp_ready(child: &mut Child, port: u16, timeout: Duration) -> Result<String> {
    let start = std::time::Instant::now();
    let url = format!("http://127.0.0.1:{}/json/version", port);

    loop {
        if let Ok(Some(status)) = child.try_wait() {
            return Err(Error::Browser(format!("browser exited during startup ({})", status)));
        }
        if start.elapsed() > timeout {
            return Err(Error::Timeout(format!(
                "DevTools not ready after {}s on port {}",
                timeout.as_secs(),
                port
            )));
        }

        if let Ok(resp) = reqwest::get(&url).await {
            if let Ok(body) = resp.json::<Value>().await {
                if let Some(ws_url) = body.get("webSocketDebuggerUrl").and_then(|v| v.as_str()) {
                    return Ok(ws_url.to_string());
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

/// Find the first "page" target's WebSocket URL via `/json/list`.
/// Retries a few times since the page target may not appear immediately.
async fn get_page_ws_url(port: u16) -> Result<String> {
    let url = format!("http://127.0.0.1:{}/json/list", port);

    for attempt in 0..10 {
        if attempt > 0 {
            tokio::time::sleep(Duration::from_millis(300)).await;
        }

        let targets: Vec<Value> = match reqwest::get(&url).await {
            Ok(resp) => match resp.json().await {
                Ok(t) => t,
                Err(_) => continue,
            },
            Err(_) => continue,
        };

        let ws_url = targets
            .iter()
            .filter(|t| t.get("type").and_then(|v| v.as_str()) == Some("page"))
            .find_map(|t| t.get("webSocketDebuggerUrl").and_then(|v| v.as_str()));
        if let Some(ws_url) = ws_url {
            return Ok(ws_url.to_string());
        }
    }

    warn!(port, "No page target found");
    Err(Error::Browser("No page target found after retries".to_string()))
}
