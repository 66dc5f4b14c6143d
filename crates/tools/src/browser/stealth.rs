//! Launch flags and page patches that make headless Chrome look like a
//! regular desktop browser to the marketplace's bot detection.

use std::path::Path;

use rapidapi_core::BrowserConfig;

/// Installed with `Page.addScriptToEvaluateOnNewDocument`.
pub const STEALTH_SCRIPT: &str = r#"
(() => {
  Object.defineProperty(Navigator.prototype, 'webdriver', { get: () => undefined });
  Object.defineProperty(navigator, 'languages', { get: () => ['en-US', 'en'] });
  Object.defineProperty(navigator, 'plugins', {
    get: () => [1, 2, 3, 4, 5].map(i => ({ name: 'Plugin ' + i, filename: 'plugin' + i + '.so' })),
  });
  if (!window.chrome) {
    window.chrome = { runtime: {}, loadTimes: () => ({}), csi: () => ({}) };
  }
  const query = window.navigator.permissions && window.navigator.permissions.query;
  if (query) {
    window.navigator.permissions.query = (p) =>
      p && p.name === 'notifications'
        ? Promise.resolve({ state: Notification.permission })
        : query.call(window.navigator.permissions, p);
  }
})();
"#;

pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// Chrome command line for a session.
pub fn build_browser_args(config: &BrowserConfig, debug_port: u16, user_data_dir: &Path) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={}", debug_port),
        format!("--user-data-dir={}", user_data_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-background-networking".to_string(),
        "--disable-extensions".to_string(),
        "--disable-sync".to_string(),
        "--disable-translate".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--metrics-recording-only".to_string(),
        "--password-store=basic".to_string(),
        "--lang=en-US".to_string(),
        format!("--window-size={},{}", config.window_width, config.window_height),
    ];
    if config.headless {
        args.push("--headless=new".to_string());
    }
    if let Some(ua) = config.user_agent.as_deref() {
        args.push(format!("--user-agent={}", ua));
    }
    args.extend(config.extra_args.iter().cloned());
    args.push("about:blank".to_string());
    args
}

/// Turn the browser's reported user agent into one without headless markers.
pub fn humanize_user_agent(reported: &str) -> String {
    reported.replace("HeadlessChrome", "Chrome")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_args_hide_automation() {
        let cfg = BrowserConfig::default();
        let args = build_browser_args(&cfg, 9222, &PathBuf::from("/tmp/p"));
        assert!(args.contains(&"--remote-debugging-port=9222".to_string()));
        assert!(args.contains(&"--disable-blink-features=AutomationControlled".to_string()));
        assert!(args.contains(&"--headless=new".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("about:blank"));
    }

    #[test]
    fn test_headed_and_custom_user_agent() {
        let cfg = BrowserConfig {
            headless: false,
            user_agent: Some("Mozilla/5.0 X".to_string()),
            extra_args: vec!["--proxy-server=socks5://127.0.0.1:1080".to_string()],
            ..BrowserConfig::default()
        };
        let args = build_browser_args(&cfg, 1, &PathBuf::from("/tmp/p"));
        assert!(!args.iter().any(|a| a.starts_with("--headless")));
        assert!(args.contains(&"--user-agent=Mozilla/5.0 X".to_string()));
        assert!(args.contains(&"--proxy-server=socks5://127.0.0.1:1080".to_string()));
    }

    #[test]
    fn test_humanize_user_agent() {
        let ua = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) HeadlessChrome/126.0.0.0 Safari/537.36";
        assert!(humanize_user_agent(ua).contains(" Chrome/126.0.0.0 "));
    }
}
