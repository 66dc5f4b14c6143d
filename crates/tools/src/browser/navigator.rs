//! Page loading: navigate, wait for readiness, reveal collapsed content.
//!
//! A readiness timeout is not an error. The snapshot is returned with
//! `timed_out` set and whatever HTML the page had at that point, so callers
//! get partial fields instead of a failure.

use rapidapi_core::{Error, Result, ScraperConfig};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::PageDriver;

pub const READY_STATE_JS: &str = "document.readyState";
pub const OUTER_HTML_JS: &str = "document.documentElement ? document.documentElement.outerHTML : ''";
pub const LOCATION_JS: &str = "window.location.href";

/// Opens `<details>`, collapsed toggles and "show more" style buttons, then
/// scrolls through the page so lazy sections render. Returns the click count.
pub const EXPAND_SECTIONS_JS: &str = r#"
(() => {
  let clicked = 0;
  window.scrollTo(0, 1000);
  document.querySelectorAll('details:not([open])').forEach(d => { d.open = true; clicked++; });
  document.querySelectorAll('[aria-expanded="false"]').forEach(el => {
    try { el.click(); clicked++; } catch (e) {}
  });
  const more = /^(show|view|see|load)\s+(more|all)\b|^expand\b/i;
  document.querySelectorAll('button, [role="button"]').forEach(el => {
    const text = (el.innerText || el.textContent || '').trim();
    if (text.length < 40 && more.test(text)) {
      try { el.click(); clicked++; } catch (e) {}
    }
  });
  window.scrollTo(0, document.body ? document.body.scrollHeight : 0);
  return clicked;
})()
"#;

/// Clicks the first five tabs and pricing/doc links 800 ms apart and scrolls
/// to the bottom after 3 s, which makes the page fetch its data payloads.
pub const TRIGGER_DATA_LOADS_JS: &str = r#"
(() => {
  window.scrollTo(0, 1000);
  setTimeout(() => {
    const tabs = document.querySelectorAll('button[role="tab"], [data-tab], .tab, a[href*="pricing"], a[href*="doc"]');
    tabs.forEach((tab, index) => {
      if (index < 5) {
        setTimeout(() => { try { tab.click(); } catch (e) {} }, index * 800);
      }
    });
    setTimeout(() => { window.scrollTo(0, document.body.scrollHeight); }, 3000);
  }, 1000);
  return true;
})()
"#;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct NavigationOptions {
    /// Budget for navigation plus readiness.
    pub timeout: Duration,
    /// Delay after readiness before interacting.
    pub settle: Duration,
    /// Delay after the interaction script before reading the DOM.
    pub expand_wait: Duration,
    pub script: &'static str,
}

impl NavigationOptions {
    pub fn from_config(config: &ScraperConfig) -> Self {
        Self {
            timeout: config.page_timeout(),
            settle: Duration::from_millis(config.settle_ms),
            expand_wait: Duration::from_millis(config.expand_wait_ms),
            script: EXPAND_SECTIONS_JS,
        }
    }

    pub fn with_script(mut self, script: &'static str) -> Self {
        self.script = script;
        self
    }
}

/// Rendered page content at the time extraction ran.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub requested_url: String,
    pub final_url: String,
    pub html: String,
    pub timed_out: bool,
}

/// Load `url`, wait for `document.readyState == "complete"`, run the
/// interaction script and return the resulting DOM.
///
/// Only a hard navigation failure (browser gone, DNS error) is an `Err`.
pub async fn load_page<D: PageDriver + ?Sized>(
    driver: &mut D,
    url: &str,
    opts: &NavigationOptions,
) -> Result<PageSnapshot> {
    let deadline = Instant::now() + opts.timeout;
    info!(url, "Loading page");

    let mut timed_out = match tokio::time::timeout(opts.timeout, driver.navigate(url)).await {
        Ok(Ok(())) => false,
        Ok(Err(Error::Timeout(msg))) => {
            warn!(url, "Navigation timed out: {}", msg);
            true
        }
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            warn!(url, timeout_secs = opts.timeout.as_secs(), "Navigation timed out");
            true
        }
    };

    if !timed_out {
        timed_out = !wait_until_ready(driver, deadline).await;
        if timed_out {
            warn!(url, "Page did not finish loading; extracting partial content");
        }
    }

    if !timed_out {
        tokio::time::sleep(opts.settle).await;
        match driver.evaluate(opts.script).await {
            Ok(result) => debug!(url, result = %result, "Interaction script ran"),
            Err(e) => warn!(url, error = %e, "Interaction script failed"),
        }
        tokio::time::sleep(opts.expand_wait).await;
    }

    let html = match driver.evaluate(OUTER_HTML_JS).await {
        Ok(Value::String(html)) => html,
        Ok(_) => String::new(),
        Err(e) => {
            warn!(url, error = %e, "Could not read page HTML");
            String::new()
        }
    };

    let final_url = driver
        .evaluate(LOCATION_JS)
        .await
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string());

    debug!(url, final_url = %final_url, bytes = html.len(), timed_out, "Page snapshot taken");
    Ok(PageSnapshot {
        requested_url: url.to_string(),
        final_url,
        html,
        timed_out,
    })
}

async fn wait_until_ready<D: PageDriver + ?Sized>(driver: &mut D, deadline: Instant) -> bool {
    loop {
        match driver.evaluate(READY_STATE_JS).await {
            Ok(Value::String(state)) if state == "complete" => return true,
            Ok(_) => {}
            // The execution context is replaced while the document commits.
            Err(e) => debug!(error = %e, "readyState lookup failed"),
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeLauncher;
    use crate::browser::BrowserLauncher;

    fn quick_options() -> NavigationOptions {
        NavigationOptions {
            timeout: Duration::from_millis(500),
            settle: Duration::ZERO,
            expand_wait: Duration::ZERO,
            script: EXPAND_SECTIONS_JS,
        }
    }

    #[tokio::test]
    async fn test_load_page_returns_rendered_html() {
        let url = "https://rapidapi.com/acme/api/weather";
        let launcher = FakeLauncher::new().with_page(url, "<html><h1>Weather</h1></html>");
        let mut driver = launcher.launch("t").await.unwrap();

        let snapshot = load_page(driver.as_mut(), url, &quick_options()).await.unwrap();
        assert!(!snapshot.timed_out);
        assert!(snapshot.html.contains("Weather"));
        assert_eq!(snapshot.final_url, url);
        assert_eq!(launcher.stats.scripts(), vec![EXPAND_SECTIONS_JS.to_string()]);
    }

    #[tokio::test]
    async fn test_readiness_timeout_yields_partial_snapshot() {
        let url = "https://rapidapi.com/acme/api/slow";
        let launcher = FakeLauncher::new().with_page(url, "<html><p>partial</p></html>").never_ready();
        let mut driver = launcher.launch("t").await.unwrap();

        let snapshot = load_page(driver.as_mut(), url, &quick_options()).await.unwrap();
        assert!(snapshot.timed_out);
        assert!(snapshot.html.contains("partial"));
        assert!(launcher.stats.scripts().is_empty());
    }

    #[tokio::test]
    async fn test_hard_navigation_failure_is_error() {
        let launcher = FakeLauncher::new().failing_navigation();
        let mut driver = launcher.launch("t").await.unwrap();
        let err = load_page(driver.as_mut(), "https://rapidapi.com/", &quick_options())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Browser(_)));
    }

    #[test]
    fn test_options_from_config() {
        let cfg = ScraperConfig {
            page_timeout_secs: 12,
            settle_ms: 100,
            ..ScraperConfig::default()
        };
        let opts = NavigationOptions::from_config(&cfg).with_script(TRIGGER_DATA_LOADS_JS);
        assert_eq!(opts.timeout, Duration::from_secs(12));
        assert_eq!(opts.settle, Duration::from_millis(100));
        assert_eq!(opts.script, TRIGGER_DATA_LOADS_JS);
    }
}
