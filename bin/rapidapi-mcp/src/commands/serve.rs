use rapidapi_core::{Config, Paths};
use rapidapi_tools::browser::session::find_browser_binary;
use rapidapi_tools::mcp::McpServer;
use rapidapi_tools::{ToolContext, ToolRegistry};
use tokio::io::BufReader;
use tracing::info;

/// Serve MCP on stdio until stdin closes or Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = Config::from_env(&paths)?;

    // Without a browser no tool can work, so refuse to start.
    let browser = find_browser_binary(config.browser.executable_path.as_deref())?;
    info!(
        browser = %browser,
        headless = config.browser.headless,
        idle_timeout_secs = config.browser.idle_timeout_secs,
        "Starting rapidapi-mcp"
    );

    let ctx = ToolContext::with_chrome(config, paths);
    let sessions = ctx.sessions.clone();
    let server = McpServer::new(ToolRegistry::with_defaults(), ctx);

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = server.serve(stdin, stdout) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, closing browser");
            sessions.close_all().await;
        }
    }

    Ok(())
}
