use rapidapi_core::{Config, Paths};
use rapidapi_tools::{ToolContext, ToolRegistry};
use serde_json::Value;

/// List all registered tools.
pub async fn list() -> anyhow::Result<()> {
    let registry = ToolRegistry::with_defaults();
    let schemas = registry.get_tool_schemas();

    println!();
    println!("Tools ({} total)", schemas.len());
    println!();
    for schema in &schemas {
        let name = schema["name"].as_str().unwrap_or("");
        let desc = schema["description"].as_str().unwrap_or("");
        let short_desc: String = desc.chars().take(70).collect();
        let ellipsis = if desc.chars().count() > 70 { "..." } else { "" };
        println!("  {:<32} {}{}", name, short_desc, ellipsis);
    }
    println!();

    Ok(())
}

/// Show detailed info for a specific tool.
pub async fn info(tool_name: &str) -> anyhow::Result<()> {
    let registry = ToolRegistry::with_defaults();
    let schemas = registry.get_tool_schemas();
    let schema = schemas
        .iter()
        .find(|s| s["name"].as_str() == Some(tool_name))
        .ok_or_else(|| anyhow::anyhow!("Tool '{}' not found; see `rapidapi-mcp tools list`", tool_name))?;

    println!();
    println!("{}", tool_name);
    println!();
    println!("  {}", schema["description"].as_str().unwrap_or(""));
    println!();

    let input = &schema["inputSchema"];
    let required: Vec<&str> = input["required"]
        .as_array()
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();
    if let Some(props) = input["properties"].as_object() {
        println!("  Parameters:");
        for (key, val) in props {
            let typ = val["type"].as_str().unwrap_or("any");
            let req = if required.contains(&key.as_str()) { " (required)" } else { "" };
            println!("    {:<12} {:<8}{}", key, typ, req);
            if let Some(desc) = val["description"].as_str() {
                println!("      {}", desc);
            }
        }
    }
    println!();

    Ok(())
}

/// Run one tool against the real browser and print the result.
pub async fn run(tool_name: &str, params_json: &str) -> anyhow::Result<()> {
    let params: Value = serde_json::from_str(params_json)
        .map_err(|e| anyhow::anyhow!("Failed to parse JSON params: {}", e))?;

    let paths = Paths::new();
    let config = Config::from_env(&paths)?;
    let ctx = ToolContext::with_chrome(config, paths);
    let sessions = ctx.sessions.clone();

    let registry = ToolRegistry::with_defaults();
    let result = registry.execute(tool_name, ctx, params).await;
    sessions.close_all().await;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}
