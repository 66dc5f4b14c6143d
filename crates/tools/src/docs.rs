use async_trait::async_trait;
use rapidapi_core::{DocumentationResult, Result};
use serde_json::{json, Value};
use tracing::info;

use crate::extract::{extract_documentation_url, extract_endpoints};
use crate::marketplace::{
    load, parse_url_param, playground_url, required_str, scrape_listing_enhanced, validate_listing_url,
};
use crate::{Tool, ToolContext, ToolSchema};

fn url_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "url": {
                "type": "string",
                "description": "Listing URL, e.g. https://rapidapi.com/<provider>/api/<api>"
            }
        },
        "required": ["url"]
    })
}

pub struct GetApiDocumentationTool;

#[async_trait]
impl Tool for GetApiDocumentationTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_api_documentation",
            description: "List the endpoints of a RapidAPI marketplace listing (method, name, group, path) from its playground page.",
            parameters: url_parameters(),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        parse_url_param(required_str(params, "url")?)?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let scraper = &ctx.config.scraper;
        let url = validate_listing_url(required_str(&params, "url")?, scraper)?;
        let page = playground_url(&url);

        let mut lease = ctx.sessions.acquire().await?;
        let result = async { load(lease.driver()?, &page, scraper).await }.await;
        lease.release(result.is_ok()).await;
        let snapshot = result?;

        let doc = DocumentationResult {
            url: url.to_string(),
            documentation_url: extract_documentation_url(&snapshot.html, &snapshot.final_url)
                .or(Some(page)),
            endpoints: extract_endpoints(&snapshot.html, false),
            partial: snapshot.timed_out,
        };
        info!(url = %doc.url, endpoints = doc.endpoints.len(), "Documentation extracted");
        Ok(serde_json::to_value(doc)?)
    }
}

pub struct GetEnhancedApiDocumentationTool;

#[async_trait]
impl Tool for GetEnhancedApiDocumentationTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_enhanced_api_documentation",
            description: "Full assessment of a RapidAPI marketplace listing including endpoint parameters. Also reads the data the page loads in the background, which fills fields the rendered page leaves out. Slower than assess_api.",
            parameters: url_parameters(),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        parse_url_param(required_str(params, "url")?)?;
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let scraper = &ctx.config.scraper;
        let url = validate_listing_url(required_str(&params, "url")?, scraper)?.to_string();

        let mut lease = ctx.sessions.acquire().await?;
        let result = async { scrape_listing_enhanced(lease.driver()?, &url, scraper).await }.await;
        lease.release(result.is_ok()).await;
        let listing = result?;

        info!(
            url = %url,
            endpoints = listing.endpoints.len(),
            tiers = listing.pricing.len(),
            "Enhanced documentation extracted"
        );
        Ok(serde_json::to_value(listing)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeLauncher;
    use crate::browser::navigator::{EXPAND_SECTIONS_JS, TRIGGER_DATA_LOADS_JS};
    use crate::test_context;
    use std::sync::Arc;

    const BASIC: &str = include_str!("../tests/fixtures/listing_basic.html");
    const PLAYGROUND: &str = include_str!("../tests/fixtures/playground.html");
    const WEATHER: &str = "https://rapidapi.com/acme-labs/api/weather-now";

    #[tokio::test]
    async fn test_documentation_from_playground() {
        let launcher = Arc::new(
            FakeLauncher::new().with_page(&format!("{}/playground", WEATHER), PLAYGROUND),
        );
        let ctx = test_context(launcher.clone());

        let out = GetApiDocumentationTool
            .execute(ctx, json!({"url": format!("{}/pricing", WEATHER)}))
            .await
            .unwrap();

        assert_eq!(launcher.stats.navigations(), vec![format!("{}/playground", WEATHER)]);
        assert_eq!(out["documentation_url"], format!("{}/playground", WEATHER));
        let endpoints = out["endpoints"].as_array().unwrap();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0]["name"], "Current Weather");
        assert_eq!(endpoints[0]["group"], "Weather");
        assert!(endpoints[0].get("parameters").is_none());
    }

    #[tokio::test]
    async fn test_documentation_with_no_endpoints_is_empty_list() {
        let ctx = test_context(Arc::new(FakeLauncher::new()));
        let out = GetApiDocumentationTool
            .execute(ctx, json!({"url": WEATHER}))
            .await
            .unwrap();
        assert_eq!(out["endpoints"], json!([]));
    }

    #[tokio::test]
    async fn test_enhanced_merges_captured_payloads() {
        let rsc = r#"0:["$","meta",null,{"name":"description","content":"Forecasts & alerts from the payload."}]"#;
        let graphql = r#"{"data":{"api":{"name":"Weather Now","rating":4.8,"reviewCount":131}}}"#;
        let launcher = Arc::new(
            FakeLauncher::new()
                .with_page(WEATHER, BASIC)
                .with_network_response(&format!("{}?_rsc=1x2y", WEATHER), rsc)
                .with_network_response("https://rapidapi.com/graphql", graphql),
        );
        let ctx = test_context(launcher.clone());

        let out = GetEnhancedApiDocumentationTool
            .execute(ctx, json!({"url": WEATHER}))
            .await
            .unwrap();

        assert_eq!(out["description"], "Forecasts & alerts from the payload.");
        assert_eq!(out["rating"], 4.8);
        assert_eq!(out["review_count"], 131);
        assert_eq!(out["provider"], "Acme Labs");
        assert_eq!(out["pricing"], json!([{"name": "BASIC", "monthly_cost": 0}]));
        assert_eq!(out["endpoints"].as_array().unwrap().len(), 3);

        // Trigger pass, then a clean load for the DOM.
        assert_eq!(launcher.stats.navigations(), vec![WEATHER, WEATHER]);
        let scripts = launcher.stats.scripts();
        assert_eq!(scripts.first().map(String::as_str), Some(TRIGGER_DATA_LOADS_JS));
        assert_eq!(scripts.last().map(String::as_str), Some(EXPAND_SECTIONS_JS));
    }

    #[tokio::test]
    async fn test_enhanced_falls_back_when_capture_is_unavailable() {
        let graphql = r#"{"data":{"api":{"name":"Weather Now","rating":4.8,"reviewCount":131}}}"#;
        let launcher = Arc::new(
            FakeLauncher::new()
                .with_page(WEATHER, BASIC)
                .with_network_response("https://rapidapi.com/graphql", graphql)
                .failing_capture(),
        );
        let ctx = test_context(launcher.clone());

        let out = GetEnhancedApiDocumentationTool
            .execute(ctx, json!({"url": WEATHER}))
            .await
            .unwrap();

        // Same listing the standard assessment yields; payloads are never read.
        assert_eq!(out["name"], "Weather Now");
        assert_eq!(out["rating"], 4.6);
        assert_eq!(out["review_count"], 128);
        assert_eq!(out["pricing"], json!([{"name": "BASIC", "monthly_cost": 0}]));
        assert_eq!(out["endpoints"].as_array().unwrap().len(), 3);
        assert!(out.get("partial").is_none());

        assert_eq!(launcher.stats.navigations(), vec![WEATHER]);
        assert_eq!(launcher.stats.scripts(), vec![EXPAND_SECTIONS_JS.to_string()]);
    }

    #[tokio::test]
    async fn test_enhanced_navigation_failure_is_an_error() {
        let ctx = test_context(Arc::new(FakeLauncher::new().failing_navigation()));
        let err = GetEnhancedApiDocumentationTool
            .execute(ctx, json!({"url": WEATHER}))
            .await
            .unwrap_err();
        assert!(!err.is_caller_error());
    }
}
