use rapidapi_core::{Config, Paths};
use rapidapi_tools::browser::session::find_browser_binary;
use rapidapi_tools::browser::{BrowserLauncher, ChromeLauncher};
use rapidapi_tools::marketplace::search_url;
use rapidapi_tools::ToolRegistry;

/// Check configuration, the browser binary and (optionally) a real launch.
pub async fn run(launch: bool) -> anyhow::Result<()> {
    let paths = Paths::new();

    println!();
    println!("rapidapi-mcp doctor");
    println!("===================");
    println!();

    let mut ok_count = 0u32;
    let mut warn_count = 0u32;
    let mut err_count = 0u32;

    // --- 1. Config ---
    println!("Configuration");
    let config_file = paths.config_file();
    if config_file.exists() {
        print_ok("Config file", &config_file.display().to_string());
        ok_count += 1;
    } else {
        print_warn("No config file", &format!("Using defaults; create {} to override", config_file.display()));
        warn_count += 1;
    }

    let config = match Config::from_env(&paths) {
        Ok(config) => {
            print_ok("Config parsed", "");
            ok_count += 1;
            config
        }
        Err(e) => {
            print_err("Config invalid", &e.to_string());
            err_count += 1;
            Config::default()
        }
    };

    match search_url(&config.scraper, "test", None) {
        Ok(_) => {
            print_ok("Marketplace", &config.scraper.base_url);
            ok_count += 1;
        }
        Err(e) => {
            print_err("Marketplace URL unusable", &e.to_string());
            err_count += 1;
        }
    }
    println!(
        "  Page timeout: {}s, settle: {}ms, expand wait: {}ms",
        config.scraper.page_timeout_secs, config.scraper.settle_ms, config.scraper.expand_wait_ms
    );
    match config.browser.idle_timeout() {
        Some(idle) => println!("  Browser kept alive {}s between calls", idle.as_secs()),
        None => println!("  Browser closed after every call"),
    }
    println!();

    // --- 2. Browser ---
    println!("Browser");
    let binary = match find_browser_binary(config.browser.executable_path.as_deref()) {
        Ok(path) => {
            print_ok("Chrome/Chromium", &path);
            ok_count += 1;
            Some(path)
        }
        Err(e) => {
            print_err("Chrome/Chromium not found", &format!("{}; set RAPIDAPI_MCP_CHROME_PATH", e));
            err_count += 1;
            None
        }
    };

    let profile_dir = paths.browser_dir();
    match std::fs::create_dir_all(&profile_dir) {
        Ok(()) => {
            print_ok("Profile directory writable", &profile_dir.display().to_string());
            ok_count += 1;
        }
        Err(e) => {
            print_err("Profile directory not writable", &e.to_string());
            err_count += 1;
        }
    }

    if launch && binary.is_some() {
        let launcher = ChromeLauncher::new(config.browser.clone(), paths.clone());
        match launcher.launch("doctor").await {
            Ok(mut driver) => {
                let agent = driver
                    .evaluate("navigator.userAgent")
                    .await
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                driver.close().await;
                print_ok("Browser launched", &agent);
                ok_count += 1;
            }
            Err(e) => {
                print_err("Browser failed to launch", &e.to_string());
                err_count += 1;
            }
        }
    } else if !launch {
        println!("  (run with --launch to start the browser once)");
    }
    println!();

    // --- 3. Tools ---
    println!("Tools");
    let registry = ToolRegistry::with_defaults();
    print_ok(&format!("{} tools registered", registry.tool_names().len()), "");
    ok_count += 1;
    println!();

    // --- Summary ---
    println!("-------------------");
    println!("  {} passed, {} warnings, {} errors", ok_count, warn_count, err_count);
    if err_count > 0 {
        println!("  {} error(s) must be fixed before `rapidapi-mcp serve` will work.", err_count);
    }
    println!();

    Ok(())
}

fn print_ok(label: &str, detail: &str) {
    if detail.is_empty() {
        println!("  [ok]   {}", label);
    } else {
        println!("  [ok]   {}: {}", label, detail);
    }
}

fn print_warn(label: &str, hint: &str) {
    println!("  [warn] {}: {}", label, hint);
}

fn print_err(label: &str, hint: &str) {
    println!("  [err]  {}: {}", label, hint);
}
