use async_trait::async_trait;
use rapidapi_core::{Error, Result};
use serde_json::{json, Value};
use tracing::info;

use crate::extract::extract_search_results;
use crate::marketplace::{load, required_str, search_url};
use crate::{Tool, ToolContext, ToolSchema};

const DEFAULT_LIMIT: usize = 10;

pub struct SearchApisTool;

#[async_trait]
impl Tool for SearchApisTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search_apis",
            description: "Search the RapidAPI marketplace by keyword. Returns matching APIs with name, URL, provider, category, rating, popularity, latency and service level.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "keyword": {
                        "type": "string",
                        "description": "Search term, e.g. 'weather' or 'sms gateway'"
                    },
                    "category": {
                        "type": "string",
                        "description": "Optional marketplace category to restrict the search to"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results (default 10)",
                        "minimum": 1
                    }
                },
                "required": ["keyword"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        required_str(params, "keyword")?;
        if let Some(category) = params.get("category") {
            if !category.is_null() && !category.is_string() {
                return Err(Error::Validation("Parameter 'category' must be a string".to_string()));
            }
        }
        if let Some(limit) = params.get("limit") {
            if !limit.is_null() && limit.as_u64().map_or(true, |l| l == 0) {
                return Err(Error::Validation(
                    "Parameter 'limit' must be a positive integer".to_string(),
                ));
            }
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let scraper = &ctx.config.scraper;
        let keyword = required_str(&params, "keyword")?.to_string();
        let category = params
            .get("category")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let limit = params
            .get("limit")
            .and_then(|v| v.as_u64())
            .map_or(DEFAULT_LIMIT, |l| l as usize)
            .clamp(1, scraper.max_search_results.max(1));

        let url = search_url(scraper, &keyword, category.as_deref())?;

        let mut lease = ctx.sessions.acquire().await?;
        let result = async { load(lease.driver()?, &url, scraper).await }.await;
        lease.release(result.is_ok()).await;
        let snapshot = result?;

        let results = extract_search_results(&snapshot.html, &scraper.base_url, limit);
        info!(keyword = %keyword, count = results.len(), "Search complete");

        let mut out = json!({
            "query": keyword,
            "category": category,
            "results": results,
        });
        if snapshot.timed_out {
            out["partial"] = json!(true);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeLauncher;
    use crate::test_context;
    use std::sync::Arc;

    const SEARCH: &str = include_str!("../tests/fixtures/search.html");

    #[test]
    fn test_validate() {
        let tool = SearchApisTool;
        assert!(tool.validate(&json!({"keyword": "weather"})).is_ok());
        assert!(tool.validate(&json!({"keyword": "weather", "category": null, "limit": 5})).is_ok());
        assert!(tool.validate(&json!({})).is_err());
        assert!(tool.validate(&json!({"keyword": "  "})).is_err());
        assert!(tool.validate(&json!({"keyword": "weather", "limit": 0})).is_err());
        assert!(tool.validate(&json!({"keyword": "weather", "limit": "five"})).is_err());
        assert!(tool.validate(&json!({"keyword": "weather", "category": 3})).is_err());
    }

    #[tokio::test]
    async fn test_search_returns_cards() {
        let launcher = Arc::new(FakeLauncher::new().with_page("https://rapidapi.com/search", SEARCH));
        let ctx = test_context(launcher.clone());

        let out = SearchApisTool
            .execute(ctx, json!({"keyword": "weather", "limit": 2}))
            .await
            .unwrap();

        assert_eq!(out["query"], "weather");
        assert_eq!(out["category"], Value::Null);
        let results = out["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["name"], "Weather Now");
        assert!(out.get("partial").is_none());
        assert_eq!(
            launcher.stats.navigations(),
            vec!["https://rapidapi.com/search?term=weather&sortBy=ByRelevance"]
        );
    }

    #[tokio::test]
    async fn test_search_with_no_matches_is_empty() {
        let ctx = test_context(Arc::new(FakeLauncher::new()));
        let out = SearchApisTool
            .execute(ctx, json!({"keyword": "zzzz", "category": "Weather"}))
            .await
            .unwrap();
        assert_eq!(out["category"], "Weather");
        assert_eq!(out["results"], json!([]));
    }
}
