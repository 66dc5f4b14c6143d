use async_trait::async_trait;
use rapidapi_core::{PricingResult, Result};
use serde_json::{json, Value};
use tracing::info;

use crate::extract::extract_pricing;
use crate::marketplace::{load, parse_url_param, pricing_url, required_str, validate_listing_url};
use crate::{Tool, ToolContext, ToolSchema};

pub struct GetPricingPlansTool;

#[async_trait]
impl Tool for GetPricingPlansTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_pricing_plans",
            description: "Read the pricing plans of a RapidAPI marketplace listing from its pricing page: plan name, monthly cost and quota limits.",
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
        let url = validate_listing_url(required_str(&params, "url")?, scraper)?;
        let page = pricing_url(&url);

        let mut lease = ctx.sessions.acquire().await?;
        let result = async { load(lease.driver()?, &page, scraper).await }.await;
        lease.release(result.is_ok()).await;
        let snapshot = result?;

        let pricing = PricingResult {
            url: url.to_string(),
            pricing_url: page,
            tiers: extract_pricing(&snapshot.html),
            partial: snapshot.timed_out,
        };
        info!(url = %pricing.url, tiers = pricing.tiers.len(), "Pricing plans extracted");
        Ok(serde_json::to_value(pricing)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeLauncher;
    use crate::test_context;
    use rapidapi_core::Error;
    use std::sync::Arc;

    const NO_RATING: &str = include_str!("../tests/fixtures/listing_no_rating.html");
    const CURRENCY: &str = "https://rapidapi.com/fxdata/api/currency-rates";

    #[tokio::test]
    async fn test_pricing_page_plans() {
        let page = format!("{}/pricing", CURRENCY);
        let launcher = Arc::new(FakeLauncher::new().with_page(&page, NO_RATING));
        let ctx = test_context(launcher.clone());

        let out = GetPricingPlansTool
            .execute(ctx, json!({"url": format!("{}?utm_source=x", CURRENCY)}))
            .await
            .unwrap();

        assert_eq!(launcher.stats.navigations(), vec![page.clone()]);
        assert_eq!(out["pricing_url"], page);
        let tiers = out["tiers"].as_array().unwrap();
        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers[0]["name"], "Basic");
        assert_eq!(tiers[0]["monthly_cost"], json!(0));
        assert_eq!(tiers[1]["monthly_cost"], json!(25));
    }

    #[tokio::test]
    async fn test_page_without_plans_yields_no_tiers() {
        let ctx = test_context(Arc::new(FakeLauncher::new()));
        let out = GetPricingPlansTool
            .execute(ctx, json!({"url": CURRENCY}))
            .await
            .unwrap();
        assert_eq!(out["tiers"], json!([]));
        assert!(out.get("partial").is_none());
    }

    #[test]
    fn test_validate() {
        assert!(GetPricingPlansTool.validate(&json!({"url": CURRENCY})).is_ok());
        assert!(matches!(
            GetPricingPlansTool.validate(&json!({"url": "ftp://rapidapi.com/x"})),
            Err(Error::Validation(_))
        ));
    }
}
