use async_trait::async_trait;
use rapidapi_core::{ApiListing, Error, Result};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::marketplace::{parse_url_param, required_str, scrape_listing, validate_listing_url};
use crate::{Tool, ToolContext, ToolSchema};

pub struct AssessApiTool;

#[async_trait]
impl Tool for AssessApiTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "assess_api",
            description: "Assess one RapidAPI marketplace listing: name, description, provider, category, rating, review count, popularity, service level, latency, pricing tiers, endpoints and documentation link.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "Listing URL, e.g. https://rapidapi.com/<provider>/api/<api>"
                    }
                },
                "required": ["url"]
            }),
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
        let result = async { scrape_listing(lease.driver()?, &url, scraper).await }.await;
        lease.release(result.is_ok()).await;
        let listing = result?;

        info!(
            url = %url,
            tiers = listing.pricing.len(),
            endpoints = listing.endpoints.len(),
            partial = listing.partial,
            "API assessed"
        );
        Ok(serde_json::to_value(listing)?)
    }
}

pub struct CompareApisTool;

#[async_trait]
impl Tool for CompareApisTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "compare_apis",
            description: "Assess several RapidAPI marketplace listings and compare them side by side. Listings are returned in input order with a summary of the best-rated, cheapest and largest APIs.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "urls": {
                        "type": "array",
                        "items": {"type": "string"},
                        "minItems": 1,
                        "description": "Listing URLs to compare"
                    }
                },
                "required": ["urls"]
            }),
        }
    }

    fn validate(&self, params: &Value) -> Result<()> {
        let urls = params
            .get("urls")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::Validation("Missing required parameter: urls".to_string()))?;
        if urls.is_empty() {
            return Err(Error::Validation("Parameter 'urls' must not be empty".to_string()));
        }
        for url in urls {
            let raw = url
                .as_str()
                .ok_or_else(|| Error::Validation("Every entry of 'urls' must be a string".to_string()))?;
            parse_url_param(raw)?;
        }
        Ok(())
    }

    async fn execute(&self, ctx: ToolContext, params: Value) -> Result<Value> {
        let scraper = &ctx.config.scraper;
        let urls = params
            .get("urls")
            .and_then(|v| v.as_array())
            .ok_or_else(|| Error::Validation("Missing required parameter: urls".to_string()))?
            .iter()
            .map(|v| {
                let raw = v.as_str().unwrap_or_default();
                validate_listing_url(raw, scraper).map(|u| u.to_string())
            })
            .collect::<Result<Vec<String>>>()?;

        if urls.is_empty() || urls.len() > scraper.max_compare {
            return Err(Error::Validation(format!(
                "Expected between 1 and {} URLs, got {}",
                scraper.max_compare,
                urls.len()
            )));
        }

        let mut lease = ctx.sessions.acquire().await?;
        let mut healthy = true;
        let mut apis = Vec::with_capacity(urls.len());
        for url in &urls {
            let result = async { scrape_listing(lease.driver()?, url, scraper).await }.await;
            match result {
                Ok(listing) => apis.push(listing),
                Err(e) => {
                    warn!(url = %url, error = %e, "Listing failed during comparison");
                    healthy = false;
                    let mut listing = ApiListing::new(url.clone());
                    listing.partial = true;
                    apis.push(listing);
                }
            }
        }
        lease.release(healthy).await;

        info!(count = apis.len(), "APIs compared");
        let summary = summarize(&apis);
        Ok(json!({
            "apis": apis,
            "summary": summary,
        }))
    }
}

/// Headline comparison. Ties go to the listing given first.
fn summarize(apis: &[ApiListing]) -> Value {
    let highest_rated = apis
        .iter()
        .filter_map(|a| a.rating.map(|r| (a, r)))
        .reduce(|best, next| if next.1 > best.1 { next } else { best })
        .map(|(a, rating)| json!({"url": a.url, "name": a.name, "rating": rating}));

    let cheapest_paid = apis
        .iter()
        .filter_map(|a| a.lowest_paid_price().map(|p| (a, p)))
        .reduce(|best, next| if next.1 < best.1 { next } else { best })
        .map(|(a, price)| json!({"url": a.url, "name": a.name, "monthly_cost": price}));

    let most_endpoints = apis
        .iter()
        .filter(|a| !a.endpoints.is_empty())
        .reduce(|best, next| {
            if next.endpoints.len() > best.endpoints.len() {
                next
            } else {
                best
            }
        })
        .map(|a| json!({"url": a.url, "name": a.name, "count": a.endpoints.len()}));

    let with_free_tier: Vec<&str> = apis
        .iter()
        .filter(|a| a.has_free_tier())
        .map(|a| a.url.as_str())
        .collect();

    json!({
        "compared": apis.len(),
        "highest_rated": highest_rated,
        "cheapest_paid_plan": cheapest_paid,
        "most_endpoints": most_endpoints,
        "with_free_tier": with_free_tier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeLauncher;
    use crate::test_context;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    const BASIC: &str = include_str!("../tests/fixtures/listing_basic.html");
    const NO_RATING: &str = include_str!("../tests/fixtures/listing_no_rating.html");
    const WEATHER: &str = "https://rapidapi.com/acme-labs/api/weather-now";
    const CURRENCY: &str = "https://rapidapi.com/fxdata/api/currency-rates";

    #[test]
    fn test_assess_validate_rejects_non_urls() {
        let tool = AssessApiTool;
        assert!(tool.validate(&json!({"url": WEATHER})).is_ok());
        assert!(matches!(tool.validate(&json!({"url": "weather"})), Err(Error::Validation(_))));
        assert!(matches!(tool.validate(&json!({})), Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_assess_basic_listing() {
        let launcher = Arc::new(FakeLauncher::new().with_page(WEATHER, BASIC));
        let ctx = test_context(launcher.clone());

        let out = AssessApiTool.execute(ctx, json!({"url": WEATHER})).await.unwrap();

        assert_eq!(out["url"], WEATHER);
        assert_eq!(out["name"], "Weather Now");
        assert_eq!(out["provider"], "Acme Labs");
        assert_eq!(out["rating"], 4.6);
        assert_eq!(out["review_count"], 128);
        assert_eq!(out["pricing"], json!([{"name": "BASIC", "monthly_cost": 0}]));
        assert_eq!(out["endpoints"].as_array().unwrap().len(), 3);
        assert!(out.get("partial").is_none());
        // No idle timeout: the browser is closed after the call.
        assert_eq!(launcher.stats.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_assess_off_marketplace_host_is_rejected() {
        let launcher = Arc::new(FakeLauncher::new());
        let ctx = test_context(launcher.clone());
        let err = AssessApiTool
            .execute(ctx, json!({"url": "https://example.com/acme/api/weather"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(launcher.stats.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_assess_navigation_failure_is_an_error() {
        let launcher = Arc::new(FakeLauncher::new().failing_navigation());
        let ctx = test_context(launcher.clone());
        let err = AssessApiTool.execute(ctx, json!({"url": WEATHER})).await.unwrap_err();
        assert!(!err.is_caller_error());
        assert_eq!(launcher.stats.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_compare_validate() {
        let tool = CompareApisTool;
        assert!(tool.validate(&json!({"urls": [WEATHER, CURRENCY]})).is_ok());
        assert!(tool.validate(&json!({"urls": []})).is_err());
        assert!(tool.validate(&json!({"urls": [WEATHER, 3]})).is_err());
        assert!(tool.validate(&json!({"urls": [WEATHER, "nope"]})).is_err());
        assert!(tool.validate(&json!({"urls": WEATHER})).is_err());
    }

    #[tokio::test]
    async fn test_compare_keeps_input_order() {
        let launcher = Arc::new(
            FakeLauncher::new()
                .with_page(WEATHER, BASIC)
                .with_page(CURRENCY, NO_RATING),
        );
        let ctx = test_context(launcher.clone());

        let out = CompareApisTool
            .execute(ctx, json!({"urls": [CURRENCY, WEATHER]}))
            .await
            .unwrap();

        let apis = out["apis"].as_array().unwrap();
        assert_eq!(apis[0]["url"], CURRENCY);
        assert_eq!(apis[1]["url"], WEATHER);
        assert_eq!(launcher.stats.navigations(), vec![CURRENCY, WEATHER]);
        // One browser for the whole comparison.
        assert_eq!(launcher.stats.launches.load(Ordering::SeqCst), 1);

        let summary = &out["summary"];
        assert_eq!(summary["compared"], 2);
        assert_eq!(summary["highest_rated"]["url"], WEATHER);
        assert_eq!(summary["cheapest_paid_plan"]["url"], CURRENCY);
        assert_eq!(summary["cheapest_paid_plan"]["monthly_cost"], 25.0);
        assert_eq!(summary["most_endpoints"]["url"], WEATHER);
        assert_eq!(summary["with_free_tier"], json!([CURRENCY, WEATHER]));
    }

    #[tokio::test]
    async fn test_compare_rejects_too_many_urls() {
        let launcher = Arc::new(FakeLauncher::new());
        let mut ctx = test_context(launcher.clone());
        ctx.config.scraper.max_compare = 1;
        let err = CompareApisTool
            .execute(ctx, json!({"urls": [WEATHER, CURRENCY]}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(launcher.stats.launches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_compare_marks_failed_listings_partial() {
        let launcher = Arc::new(FakeLauncher::new().failing_navigation());
        let ctx = test_context(launcher.clone());
        let out = CompareApisTool
            .execute(ctx, json!({"urls": [WEATHER, CURRENCY]}))
            .await
            .unwrap();
        assert_eq!(
            out["apis"],
            json!([{"url": WEATHER, "partial": true}, {"url": CURRENCY, "partial": true}])
        );
        assert_eq!(out["summary"]["highest_rated"], Value::Null);
        assert_eq!(launcher.stats.closes.load(Ordering::SeqCst), 1);
    }
}
