//! API listing pages: header fields, pricing plans, endpoint list.

use once_cell::sync::Lazy;
use rapidapi_core::{parse_price, price_number, ApiListing, Endpoint, EndpointParameter, PricingTier};
use regex::Regex;
use scraper::{ElementRef, Html};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use super::selectors::*;
use super::{
    element_text, parse_count, parse_rating, parse_selector, lookup_document, lookup_first,
    provider_from_url, visible_text,
};

static POPULARITY_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bPopularity\s*:?\s*(\d+(?:\.\d+)?(?:\s*/\s*10)?)")
        .expect("popularity regex is valid")
});

static SERVICE_LEVEL_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bService\s*Level\s*:?\s*(\d+(?:\.\d+)?\s*%)").expect("service level regex is valid")
});

static LATENCY_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bLatency\s*:?\s*(\d[\d,]*(?:\.\d+)?\s*ms)").expect("latency regex is valid")
});

static TITLE_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+Documentation\b.*$").expect("title suffix regex is valid"));

static HTTP_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\b").expect("http method regex is valid")
});

/// Scrape one listing page into an [`ApiListing`].
pub fn extract_listing(html: &str, url: &str) -> ApiListing {
    let document = Html::parse_document(html);
    let mut listing = ApiListing::new(url);

    listing.name = lookup_document(&document, NAME)
        .map(|n| clean_title(&n))
        .filter(|n| !n.is_empty());
    listing.description = lookup_document(&document, DESCRIPTION);
    listing.provider = lookup_document(&document, PROVIDER).or_else(|| provider_from_url(url));
    listing.category = lookup_document(&document, CATEGORY);
    listing.rating = lookup_document(&document, RATING).and_then(|t| parse_rating(&t));
    listing.review_count = lookup_document(&document, REVIEW_COUNT).and_then(|t| parse_count(&t));

    let stats = Stats::from_text(&visible_text(document.root_element()));
    listing.popularity = lookup_document(&document, POPULARITY).or(stats.popularity);
    listing.service_level = lookup_document(&document, SERVICE_LEVEL).or(stats.service_level);
    listing.latency = lookup_document(&document, LATENCY).or(stats.latency);

    listing.pricing = pricing_from_document(&document);
    listing.endpoints = endpoints_from_document(&document, false);
    listing.documentation_url = documentation_url_from_document(&document, url);

    log_unmatched(&listing);
    listing
}

/// Pricing tiers from embedded JSON, else from plan cards.
pub fn extract_pricing(html: &str) -> Vec<PricingTier> {
    pricing_from_document(&Html::parse_document(html))
}

/// Endpoints in DOM order, optionally with their request parameters.
pub fn extract_endpoints(html: &str, with_parameters: bool) -> Vec<Endpoint> {
    endpoints_from_document(&Html::parse_document(html), with_parameters)
}

/// Absolute URL of the page's documentation/playground link.
pub fn extract_documentation_url(html: &str, base_url: &str) -> Option<String> {
    documentation_url_from_document(&Html::parse_document(html), base_url)
}

fn clean_title(raw: &str) -> String {
    let first = raw.split(" | ").next().unwrap_or(raw);
    TITLE_SUFFIX.replace(first, "").trim().to_string()
}

/// Labelled marketplace statistics found in free text.
#[derive(Debug, Default)]
pub(super) struct Stats {
    pub popularity: Option<String>,
    pub service_level: Option<String>,
    pub latency: Option<String>,
}

impl Stats {
    pub fn from_text(text: &str) -> Self {
        Self {
            popularity: labelled_value(&POPULARITY_TEXT, text),
            service_level: labelled_value(&SERVICE_LEVEL_TEXT, text),
            latency: labelled_value(&LATENCY_TEXT, text),
        }
    }
}

fn labelled_value(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(""))
}

fn log_unmatched(listing: &ApiListing) {
    let mut missing = Vec::new();
    if listing.name.is_none() {
        missing.push("name");
    }
    if listing.description.is_none() {
        missing.push("description");
    }
    if listing.rating.is_none() {
        missing.push("rating");
    }
    if listing.review_count.is_none() {
        missing.push("review_count");
    }
    if listing.pricing.is_empty() {
        missing.push("pricing");
    }
    if listing.endpoints.is_empty() {
        missing.push("endpoints");
    }
    if !missing.is_empty() {
        debug!(url = %listing.url, ?missing, "No selector matched some listing fields");
    }
}

fn pricing_from_document(document: &Html) -> Vec<PricingTier> {
    let tiers = embedded_array(document, &["tiers", "plans", "pricingTiers"])
        .map(|items| items.iter().filter_map(PricingTier::from_value).collect::<Vec<_>>())
        .unwrap_or_default();
    if !tiers.is_empty() {
        return tiers;
    }
    pricing_from_cards(document)
}

fn pricing_from_cards(document: &Html) -> Vec<PricingTier> {
    let Some(card_sel) = parse_selector(PLAN_CARD) else {
        return Vec::new();
    };
    let limit_sel = parse_selector(PLAN_LIMIT);

    let mut seen = HashSet::new();
    let mut tiers = Vec::new();
    for card in document.select(&card_sel) {
        let Some(name) = lookup_first(card, PLAN_NAME) else {
            continue;
        };
        if !seen.insert(name.clone()) {
            continue;
        }
        let mut tier = PricingTier::new(name);
        tier.monthly_cost = lookup_first(card, PLAN_PRICE)
            .and_then(|p| parse_price(&p))
            .and_then(price_number);
        if let Some(sel) = &limit_sel {
            tier.limits = card
                .select(sel)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .collect();
        }
        tiers.push(tier);
    }
    tiers
}

/// First non-empty array under any of `keys`, searched depth-first through
/// every embedded JSON script.
fn embedded_array(document: &Html, keys: &[&str]) -> Option<Vec<Value>> {
    let sel = parse_selector(EMBEDDED_JSON)?;
    document.select(&sel).find_map(|script| {
        let raw = script.text().collect::<String>();
        let value: Value = serde_json::from_str(raw.trim()).ok()?;
        find_array(&value, keys).cloned()
    })
}

fn find_array<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    match value {
        Value::Object(obj) => keys
            .iter()
            .find_map(|k| obj.get(*k).and_then(|v| v.as_array()).filter(|a| !a.is_empty()))
            .or_else(|| obj.values().find_map(|v| find_array(v, keys))),
        Value::Array(items) => items.iter().find_map(|v| find_array(v, keys)),
        _ => None,
    }
}

fn endpoints_from_document(document: &Html, with_parameters: bool) -> Vec<Endpoint> {
    let endpoints = endpoints_from_dom(document, with_parameters);
    if !endpoints.is_empty() {
        return endpoints;
    }
    embedded_array(document, &["endpoints"])
        .map(|items| items.iter().filter_map(Endpoint::from_value).collect())
        .unwrap_or_default()
}

fn endpoints_from_dom(document: &Html, with_parameters: bool) -> Vec<Endpoint> {
    let (Some(item_sel), Some(group_sel)) = (parse_selector(ENDPOINT_ITEM), parse_selector(ENDPOINT_GROUP))
    else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut endpoints = Vec::new();
    for item in document.select(&item_sel) {
        let mut ancestors = item.ancestors().filter_map(ElementRef::wrap);
        if ancestors.any(|a| item_sel.matches(&a)) {
            continue;
        }

        let text = element_text(item);
        let method = lookup_first(item, ENDPOINT_METHOD)
            .and_then(|m| http_method(&m))
            .or_else(|| http_method(&text))
            .unwrap_or_else(|| "GET".to_string());
        let name = lookup_first(item, ENDPOINT_NAME).or_else(|| {
            let rest = HTTP_METHOD.replace(&text, "").trim().to_string();
            (!rest.is_empty()).then_some(rest)
        });
        let Some(name) = name else {
            continue;
        };

        let group = item
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|a| group_sel.matches(a))
            .and_then(|g| lookup_first(g, GROUP_TITLE));

        let endpoint = Endpoint {
            method,
            name,
            description: lookup_first(item, ENDPOINT_DESCRIPTION),
            group,
            path: lookup_first(item, ENDPOINT_PATH),
            parameters: if with_parameters {
                parameters_of(item)
            } else {
                Vec::new()
            },
        };
        let key = (
            endpoint.method.clone(),
            endpoint.name.clone(),
            endpoint.path.clone(),
            endpoint.group.clone(),
        );
        if seen.insert(key) {
            endpoints.push(endpoint);
        }
    }
    endpoints
}

fn http_method(text: &str) -> Option<String> {
    HTTP_METHOD
        .captures(text.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_uppercase())
}

fn parameters_of(item: ElementRef<'_>) -> Vec<EndpointParameter> {
    let Some(sel) = parse_selector(PARAM_ITEM) else {
        return Vec::new();
    };
    item.select(&sel)
        .filter_map(|param| {
            let el = param.value();
            let name = lookup_first(param, PARAM_NAME).or_else(|| el.attr("data-name").map(str::to_string))?;
            let required = el.attr("data-required") == Some("true")
                || el.classes().any(|c| c == "required")
                || lookup_first(param, PARAM_REQUIRED)
                    .map(|t| !t.to_ascii_lowercase().contains("optional"))
                    .unwrap_or(false);
            Some(EndpointParameter {
                name,
                location: el
                    .attr("data-location")
                    .map(str::to_string)
                    .or_else(|| lookup_first(param, PARAM_LOCATION))
                    .map(|l| l.to_ascii_lowercase()),
                param_type: lookup_first(param, PARAM_TYPE),
                required,
                description: lookup_first(param, PARAM_DESCRIPTION),
            })
        })
        .collect()
}

fn documentation_url_from_document(document: &Html, base_url: &str) -> Option<String> {
    let href = lookup_document(document, DOCUMENTATION_LINK)?;
    absolutize(base_url, &href)
}

pub(crate) fn absolutize(base_url: &str, href: &str) -> Option<String> {
    let base = url::Url::parse(base_url).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = include_str!("../../tests/fixtures/listing_basic.html");
    const NO_RATING: &str = include_str!("../../tests/fixtures/listing_no_rating.html");
    const PLAYGROUND: &str = include_str!("../../tests/fixtures/playground.html");

    const BASIC_URL: &str = "https://rapidapi.com/acme-labs/api/weather-now";

    #[test]
    fn test_golden_listing() {
        let listing = extract_listing(BASIC, BASIC_URL);
        assert_eq!(listing.url, BASIC_URL);
        assert_eq!(listing.name.as_deref(), Some("Weather Now"));
        assert_eq!(
            listing.description.as_deref(),
            Some("Real-time weather, forecasts and air quality for any city.")
        );
        assert_eq!(listing.provider.as_deref(), Some("Acme Labs"));
        assert_eq!(listing.category.as_deref(), Some("Weather"));
        assert_eq!(listing.rating, Some(4.6));
        assert_eq!(listing.review_count, Some(128));
        assert_eq!(listing.popularity.as_deref(), Some("9.8/10"));
        assert_eq!(listing.service_level.as_deref(), Some("100%"));
        assert_eq!(listing.latency.as_deref(), Some("245ms"));
        assert_eq!(
            listing.documentation_url.as_deref(),
            Some("https://rapidapi.com/acme-labs/api/weather-now/playground")
        );
        assert!(!listing.partial);
    }

    #[test]
    fn test_golden_pricing_tier_is_unchanged() {
        let listing = extract_listing(BASIC, BASIC_URL);
        let expected = PricingTier::from_value(&serde_json::json!({"name": "BASIC", "monthly_cost": 0}))
            .unwrap();
        assert_eq!(listing.pricing, vec![expected]);

        let out = serde_json::to_value(&listing).unwrap();
        assert_eq!(out["pricing"], serde_json::json!([{"name": "BASIC", "monthly_cost": 0}]));
    }

    #[test]
    fn test_endpoints_follow_dom_order_with_groups() {
        let listing = extract_listing(BASIC, BASIC_URL);
        let names: Vec<(&str, &str, Option<&str>)> = listing
            .endpoints
            .iter()
            .map(|e| (e.method.as_str(), e.name.as_str(), e.group.as_deref()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("GET", "Current Weather", Some("Weather")),
                ("GET", "5 Day Forecast", Some("Weather")),
                ("POST", "Bulk Lookup", Some("Batch")),
            ]
        );
        assert!(listing.endpoints.iter().all(|e| e.parameters.is_empty()));
    }

    #[test]
    fn test_missing_rating_widget_leaves_fields_absent() {
        let url = "https://rapidapi.com/jdoe/api/currency-rates";
        let listing = extract_listing(NO_RATING, url);
        assert_eq!(listing.name.as_deref(), Some("Currency Rates"));
        assert_eq!(listing.rating, None);
        assert_eq!(listing.review_count, None);
        assert_eq!(listing.provider.as_deref(), Some("jdoe"));

        let out = serde_json::to_value(&listing).unwrap();
        assert!(out.get("rating").is_none());
        assert!(out.get("review_count").is_none());
    }

    #[test]
    fn test_pricing_from_plan_cards() {
        let tiers = extract_pricing(NO_RATING);
        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers[0].name, "Basic");
        assert_eq!(tiers[0].cost(), Some(0.0));
        assert_eq!(tiers[0].limits, vec!["500 requests / month".to_string()]);
        assert_eq!(tiers[1].name, "Pro");
        assert_eq!(tiers[1].cost(), Some(25.0));
        assert_eq!(tiers[1].limits.len(), 2);
    }

    #[test]
    fn test_endpoints_from_details_sections() {
        let endpoints = extract_endpoints(NO_RATING, false);
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].method, "GET");
        assert_eq!(endpoints[0].name, "Latest Rates");
        assert_eq!(endpoints[0].group.as_deref(), Some("Rates"));
        assert_eq!(endpoints[1].method, "GET");
        assert_eq!(endpoints[1].name, "Convert");
    }

    #[test]
    fn test_endpoint_parameters() {
        let endpoints = extract_endpoints(PLAYGROUND, true);
        let current = &endpoints[0];
        assert_eq!(current.name, "Current Weather");
        assert_eq!(current.path.as_deref(), Some("/v1/current"));
        assert_eq!(current.parameters.len(), 2);
        assert_eq!(current.parameters[0].name, "city");
        assert!(current.parameters[0].required);
        assert_eq!(current.parameters[0].location.as_deref(), Some("query"));
        assert_eq!(current.parameters[0].param_type.as_deref(), Some("STRING"));
        assert_eq!(current.parameters[1].name, "units");
        assert!(!current.parameters[1].required);
    }

    #[test]
    fn test_endpoints_from_embedded_json_when_dom_has_none() {
        let html = r#"<html><body><script type="application/json">
            {"props": {"api": {"endpoints": [
                {"name": "List Items", "method": "get", "path": "/items"}
            ]}}}
        </script></body></html>"#;
        let endpoints = extract_endpoints(html, false);
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].method, "GET");
        assert_eq!(endpoints[0].path.as_deref(), Some("/items"));
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("Weather Now API Documentation (acme) | RapidAPI"), "Weather Now API");
        assert_eq!(clean_title("Weather Now"), "Weather Now");
    }

    #[test]
    fn test_empty_document_yields_empty_listing() {
        let listing = extract_listing("", "https://rapidapi.com/a/api/b");
        assert_eq!(listing.name, None);
        assert_eq!(listing.provider.as_deref(), Some("a"));
        assert!(listing.pricing.is_empty());
        assert!(listing.endpoints.is_empty());
    }
}
