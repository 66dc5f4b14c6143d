//! Listing data read from the marketplace's own network payloads.
//!
//! The front end streams Next.js RSC chunks and issues GraphQL queries; both
//! carry fields that are sometimes missing or truncated in the rendered DOM.

use once_cell::sync::Lazy;
use rapidapi_core::{ApiListing, Endpoint, PricingTier};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::provider_from_url;

static RSC_DESCRIPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""description","content":"([^"]*)""#).expect("rsc description regex is valid")
});

static RSC_PLANS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""plans"\s*:\s*\["#).expect("rsc plans regex is valid"));

static RSC_ENDPOINTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""endpoints"\s*:\s*\["#).expect("rsc endpoints regex is valid"));

/// Fields recovered from payloads. `None`/empty means "not present".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadData {
    pub name: Option<String>,
    pub description: Option<String>,
    pub provider: Option<String>,
    /// Provider slug from a payload URL; only fills a missing provider.
    pub provider_slug: Option<String>,
    pub rating: Option<f64>,
    pub review_count: Option<u64>,
    pub popularity: Option<String>,
    pub service_level: Option<String>,
    pub documentation_url: Option<String>,
    pub pricing: Vec<PricingTier>,
    pub endpoints: Vec<Endpoint>,
}

impl PayloadData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay `other` onto `self`; fields present in `other` win.
    pub fn absorb(&mut self, other: PayloadData) {
        fn take<T>(dst: &mut Option<T>, src: Option<T>) {
            if src.is_some() {
                *dst = src;
            }
        }
        take(&mut self.name, other.name);
        take(&mut self.description, other.description);
        take(&mut self.provider, other.provider);
        take(&mut self.provider_slug, other.provider_slug);
        take(&mut self.rating, other.rating);
        take(&mut self.review_count, other.review_count);
        take(&mut self.popularity, other.popularity);
        take(&mut self.service_level, other.service_level);
        take(&mut self.documentation_url, other.documentation_url);
        if !other.pricing.is_empty() {
            self.pricing = other.pricing;
        }
        if !other.endpoints.is_empty() {
            self.endpoints = other.endpoints;
        }
    }
}

/// Parse one RSC response body fetched from `url`.
///
/// Plans are only read from pricing payloads and endpoints only from
/// endpoint/playground payloads.
pub fn parse_rsc_payload(url: &str, body: &str) -> PayloadData {
    let mut data = PayloadData {
        description: RSC_DESCRIPTION
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| unescape_json_str(m.as_str()))
            .filter(|d| !d.is_empty()),
        provider_slug: provider_from_url(url),
        ..PayloadData::default()
    };

    let lower_url = url.to_ascii_lowercase();
    if lower_url.contains("pricing") {
        if let Some(Value::Array(plans)) = json_array_after(&RSC_PLANS, body) {
            data.pricing = plans.iter().filter_map(PricingTier::from_value).collect();
        }
    }
    if lower_url.contains("endpoint") || lower_url.contains("playground") {
        if let Some(Value::Array(items)) = json_array_after(&RSC_ENDPOINTS, body) {
            data.endpoints = items.iter().filter_map(Endpoint::from_value).collect();
        }
    }
    data
}

/// Parse a GraphQL response body. `None` unless it carries an API object
/// under `data.api`, `data.getApi`, `data.apiDetails` or
/// `data.marketplace.api`.
pub fn parse_graphql_payload(body: &str) -> Option<PayloadData> {
    let value: Value = serde_json::from_str(body).ok()?;
    let data = value.get("data")?;
    let api = ["api", "getApi", "apiDetails"]
        .iter()
        .find_map(|k| data.get(*k).filter(|v| v.is_object()))
        .or_else(|| data.get("marketplace").and_then(|m| m.get("api")).filter(|v| v.is_object()))?;

    let text = |key: &str| {
        api.get(key)
            .and_then(scalar_text)
            .filter(|s| !s.is_empty())
    };

    let provider = text("provider")
        .or_else(|| {
            api.get("provider")
                .and_then(|p| p.get("name").or_else(|| p.get("username")))
                .and_then(scalar_text)
        })
        .or_else(|| text("providerName"));

    let pricing = ["pricing", "pricingTiers", "plans"]
        .iter()
        .find_map(|k| api.get(*k).and_then(tier_array))
        .map(|items| items.iter().filter_map(PricingTier::from_value).collect())
        .unwrap_or_default();

    let endpoints = ["endpoints", "methods", "operations"]
        .iter()
        .find_map(|k| api.get(*k).and_then(|v| v.as_array()).filter(|a| !a.is_empty()))
        .map(|items| items.iter().filter_map(Endpoint::from_value).collect())
        .unwrap_or_default();

    Some(PayloadData {
        name: text("name"),
        description: text("description"),
        provider,
        provider_slug: None,
        rating: api.get("rating").and_then(number),
        review_count: api
            .get("reviewCount")
            .and_then(number)
            .filter(|n| *n >= 0.0)
            .map(|n| n as u64),
        popularity: text("popularity"),
        service_level: text("serviceLevel"),
        documentation_url: text("documentationUrl"),
        pricing,
        endpoints,
    })
}

/// Apply payload values over DOM values where they are present and differ.
/// Returns the names of the fields that changed.
pub fn merge_payload(listing: &mut ApiListing, payload: &PayloadData) -> Vec<&'static str> {
    let mut changed = Vec::new();

    fn merge<T: Clone + PartialEq>(
        field: &'static str,
        dst: &mut Option<T>,
        src: &Option<T>,
        changed: &mut Vec<&'static str>,
    ) {
        if let Some(value) = src {
            if dst.as_ref() != Some(value) {
                *dst = Some(value.clone());
                changed.push(field);
            }
        }
    }

    merge("name", &mut listing.name, &payload.name, &mut changed);
    merge("description", &mut listing.description, &payload.description, &mut changed);
    merge("provider", &mut listing.provider, &payload.provider, &mut changed);
    if listing.provider.is_none() && payload.provider_slug.is_some() {
        listing.provider = payload.provider_slug.clone();
        changed.push("provider");
    }
    merge("rating", &mut listing.rating, &payload.rating, &mut changed);
    merge("review_count", &mut listing.review_count, &payload.review_count, &mut changed);
    merge("popularity", &mut listing.popularity, &payload.popularity, &mut changed);
    merge("service_level", &mut listing.service_level, &payload.service_level, &mut changed);
    merge(
        "documentation_url",
        &mut listing.documentation_url,
        &payload.documentation_url,
        &mut changed,
    );
    if !payload.pricing.is_empty() && payload.pricing != listing.pricing {
        listing.pricing = payload.pricing.clone();
        changed.push("pricing");
    }
    if !payload.endpoints.is_empty() && payload.endpoints != listing.endpoints {
        listing.endpoints = payload.endpoints.clone();
        changed.push("endpoints");
    }

    if !changed.is_empty() {
        debug!(url = %listing.url, ?changed, "Listing fields updated from payloads");
    }
    changed
}

/// Parse the JSON array that starts where `marker` (ending in `[`) matched.
fn json_array_after(marker: &Regex, body: &str) -> Option<Value> {
    let m = marker.find(body)?;
    let start = m.end() - 1;
    serde_json::Deserializer::from_str(&body[start..])
        .into_iter::<Value>()
        .next()?
        .ok()
}

/// `pricing` may be a list of tiers or an object wrapping one.
fn tier_array(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) if !items.is_empty() => Some(items),
        Value::Object(obj) => ["tiers", "plans"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(|v| v.as_array()))
            .filter(|a| !a.is_empty()),
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn unescape_json_str(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}
