use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::error::{Error, Result};
use crate::paths::Paths;

pub const ENV_CHROME_PATH: &str = "RAPIDAPI_MCP_CHROME_PATH";
pub const ENV_CHROME_PATH_FALLBACK: &str = "CHROME_PATH";
pub const ENV_TIMEOUT_SECS: &str = "RAPIDAPI_MCP_TIMEOUT_SECS";
pub const ENV_HEADLESS: &str = "RAPIDAPI_MCP_HEADLESS";
pub const ENV_IDLE_TIMEOUT_SECS: &str = "RAPIDAPI_MCP_IDLE_TIMEOUT_SECS";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    /// Explicit Chrome/Chromium executable. Discovered on the system when unset.
    #[serde(default)]
    pub executable_path: Option<String>,
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Overrides the user agent; the default is derived from the browser's own
    /// with the `HeadlessChrome` token replaced.
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default = "default_launch_timeout_secs")]
    pub launch_timeout_secs: u64,
    /// 0 closes the browser after every tool call.
    #[serde(default)]
    pub idle_timeout_secs: u64,
}

fn default_headless() -> bool {
    true
}

fn default_window_width() -> u32 {
    1366
}

fn default_window_height() -> u32 {
    900
}

fn default_launch_timeout_secs() -> u64 {
    15
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable_path: None,
            headless: default_headless(),
            user_agent: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
            extra_args: Vec::new(),
            launch_timeout_secs: default_launch_timeout_secs(),
            idle_timeout_secs: 0,
        }
    }
}

impl BrowserConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_expand_wait_ms")]
    pub expand_wait_ms: u64,
    #[serde(default = "default_max_compare")]
    pub max_compare: usize,
    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,
    #[serde(default = "default_max_network_entries")]
    pub max_network_entries: usize,
}

fn default_base_url() -> String {
    "https://rapidapi.com".to_string()
}

fn default_page_timeout_secs() -> u64 {
    30
}

fn default_settle_ms() -> u64 {
    3000
}

fn default_expand_wait_ms() -> u64 {
    5000
}

fn default_max_compare() -> usize {
    5
}

fn default_max_search_results() -> usize {
    20
}

fn default_max_network_entries() -> usize {
    1000
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_timeout_secs: default_page_timeout_secs(),
            settle_ms: default_settle_ms(),
            expand_wait_ms: default_expand_wait_ms(),
            max_compare: default_max_compare(),
            max_search_results: default_max_search_results(),
            max_network_entries: default_max_network_entries(),
        }
    }
}

impl ScraperConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    /// Host of the marketplace, e.g. `rapidapi.com`.
    pub fn marketplace_host(&self) -> String {
        let without_scheme = self
            .base_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.base_url);
        without_scheme
            .split(['/', ':'])
            .next()
            .unwrap_or_default()
            .trim_start_matches("www.")
            .to_ascii_lowercase()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn load_or_default(paths: &Paths) -> Result<Self> {
        let config_path = paths.config_file();
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load the config file (if any) and apply environment overrides.
    pub fn from_env(paths: &Paths) -> Result<Self> {
        let mut config = Self::load_or_default(paths)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup; unparsable values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = non_empty(ENV_CHROME_PATH).or_else(|| non_empty(ENV_CHROME_PATH_FALLBACK)) {
            self.browser.executable_path = Some(path.trim().to_string());
        }

        if let Some(raw) = non_empty(ENV_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.scraper.page_timeout_secs = secs,
                _ => warn!(var = ENV_TIMEOUT_SECS, value = %raw, "Ignoring invalid timeout"),
            }
        }

        if let Some(raw) = non_empty(ENV_HEADLESS) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.browser.headless = true,
                "0" | "false" | "no" => self.browser.headless = false,
                _ => warn!(var = ENV_HEADLESS, value = %raw, "Ignoring invalid flag"),
            }
        }

        if let Some(raw) = non_empty(ENV_IDLE_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.browser.idle_timeout_secs = secs,
                Err(_) => warn!(var = ENV_IDLE_TIMEOUT_SECS, value = %raw, "Ignoring invalid idle timeout"),
            }
        }
    }
}
