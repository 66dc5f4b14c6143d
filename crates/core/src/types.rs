//! Records produced by the marketplace scrapers.
//!
//! Every field is best-effort: scraped values that could not be found are
//! `None` / empty and are left out of the serialized JSON entirely.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// One pricing plan of an API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PricingTier {
    pub name: String,
    /// Monthly price in USD, zero for free plans. Kept as the payload's own
    /// number so integer prices serialize back as integers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_cost: Option<Number>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limits: Vec<String>,
    /// Keys carried over verbatim from an embedded pricing payload.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PricingTier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn cost(&self) -> Option<f64> {
        self.monthly_cost.as_ref().and_then(Number::as_f64)
    }

    /// Build a tier from a loosely-shaped JSON plan object.
    ///
    /// Accepts the key spellings seen in marketplace payloads
    /// (`name`/`title`/`planName`, `monthly_cost`/`monthlyCost`/`price`, ...).
    /// Keys that are not recognised are kept in `extra`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let mut extra = obj.clone();

        let name = take_first(&mut extra, &["name", "title", "planName", "displayName"])
            .and_then(|v| v.as_str().map(|s| s.trim().to_string()))
            .filter(|s| !s.is_empty())?;

        let monthly_cost = take_first(
            &mut extra,
            &["monthly_cost", "monthlyCost", "price", "monthlyPrice", "amount"],
        )
        .and_then(|v| match v {
            Value::Number(n) => Some(n),
            Value::String(s) => parse_price(&s).and_then(price_number),
            _ => None,
        });

        let limits = take_first(&mut extra, &["limits", "features", "quota", "rateLimits"])
            .map(|v| match v {
                Value::Array(items) => items
                    .iter()
                    .filter_map(|item| match item {
                        Value::String(s) => Some(s.clone()),
                        Value::Null => None,
                        other => Some(other.to_string()),
                    })
                    .collect(),
                Value::String(s) => vec![s],
                Value::Null => Vec::new(),
                other => vec![other.to_string()],
            })
            .unwrap_or_default();

        Some(Self {
            name,
            monthly_cost,
            limits,
            extra,
        })
    }
}

fn take_first(obj: &mut Map<String, Value>, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|k| obj.remove(*k))
}

/// Parse a displayed price such as `$25.00 / mo`, `Free` or `1,200`.
pub fn parse_price(text: &str) -> Option<f64> {
    let lower = text.trim().to_ascii_lowercase();
    if lower.is_empty() {
        return None;
    }
    if lower.starts_with("free") || lower == "$0" {
        return Some(0.0);
    }
    let digits: String = lower
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| *c != ',')
        .collect();
    digits.trim_end_matches('.').parse::<f64>().ok()
}

/// JSON number for a scraped price: whole amounts become integers.
pub fn price_number(value: f64) -> Option<Number> {
    if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Some(Number::from(value as u64))
    } else {
        Number::from_f64(value)
    }
}

/// A request parameter of an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EndpointParameter {
    pub name: String,
    /// `query`, `path`, `header` or `body` when the page says so.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Endpoint {
    pub method: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Collapsible section the endpoint was listed under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<EndpointParameter>,
}

impl Endpoint {
    /// Build an endpoint from a payload object (`method`/`httpMethod`,
    /// `name`/`title`/`operationName`, ...).
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let str_of = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| obj.get(*k).and_then(|v| v.as_str()))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let name = str_of(&["name", "title", "operationName", "route"])?;
        let method = str_of(&["method", "httpMethod", "verb"])
            .map(|m| m.to_ascii_uppercase())
            .unwrap_or_else(|| "GET".to_string());

        let parameters = ["params", "parameters"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(|v| v.as_array()))
            .map(|arr| {
                arr.iter()
                    .filter_map(|p| {
                        let p = p.as_object()?;
                        let name = p.get("name").and_then(|v| v.as_str())?.to_string();
                        Some(EndpointParameter {
                            name,
                            location: p
                                .get("in")
                                .or_else(|| p.get("location"))
                                .and_then(|v| v.as_str())
                                .map(str::to_string),
                            param_type: p
                                .get("type")
                                .or_else(|| p.get("paramType"))
                                .and_then(|v| v.as_str())
                                .map(str::to_string),
                            required: p
                                .get("required")
                                .or_else(|| p.get("condition").filter(|c| c.as_str() == Some("REQUIRED")))
                                .map(|v| v.as_bool().unwrap_or(true))
                                .unwrap_or(false),
                            description: p
                                .get("description")
                                .and_then(|v| v.as_str())
                                .map(str::to_string),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            method,
            name,
            description: str_of(&["description", "summary"]),
            group: str_of(&["group", "groupName"]),
            path: str_of(&["path", "route", "url"]),
            parameters,
        })
    }
}

/// Everything scraped from one API's marketplace page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ApiListing {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pricing: Vec<PricingTier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<Endpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    /// Set when the page did not finish loading before the timeout.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

impl ApiListing {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Lowest non-zero monthly price, if any tier has one.
    pub fn lowest_paid_price(&self) -> Option<f64> {
        self.pricing
            .iter()
            .filter_map(PricingTier::cost)
            .filter(|c| *c > 0.0)
            .fold(None, |acc: Option<f64>, c| Some(acc.map_or(c, |a| a.min(c))))
    }

    pub fn has_free_tier(&self) -> bool {
        self.pricing.iter().any(|t| t.cost() == Some(0.0))
    }
}

/// One card on the marketplace search page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ApiSummary {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DocumentationResult {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    pub endpoints: Vec<Endpoint>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PricingResult {
    pub url: String,
    pub pricing_url: String,
    pub tiers: Vec<PricingTier>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}
