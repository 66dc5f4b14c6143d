//! Field extraction over rendered marketplace HTML.
//!
//! Everything here is synchronous and pure: `scraper::Html` is not `Send`, so
//! documents are parsed and dropped inside these functions and never held
//! across an `.await`.
//!
//! Each field has an ordered list of [`Lookup`]s; the first one that yields
//! non-empty text wins. Fields nothing matched are logged at debug level and
//! left empty.

mod listing;
mod payload;
mod search;
mod selectors;

pub use listing::{extract_documentation_url, extract_endpoints, extract_listing, extract_pricing};
pub use payload::{merge_payload, parse_graphql_payload, parse_rsc_payload, PayloadData};
pub use search::extract_search_results;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// One way of locating a field in the DOM.
#[derive(Debug, Clone, Copy)]
pub enum Lookup {
    /// Text content of the first element matching the CSS selector.
    Text(&'static str),
    /// Attribute value of the first element matching the CSS selector.
    Attr(&'static str, &'static str),
}

impl Lookup {
    fn selector(&self) -> &'static str {
        match self {
            Lookup::Text(css) | Lookup::Attr(css, _) => css,
        }
    }

    fn read(&self, el: ElementRef<'_>) -> Option<String> {
        let value = match self {
            Lookup::Text(_) => element_text(el),
            Lookup::Attr(_, attr) => normalize_ws(el.value().attr(attr)?),
        };
        (!value.is_empty()).then_some(value)
    }
}

/// First non-empty value produced by `lookups` under `root`.
pub(crate) fn lookup_first(root: ElementRef<'_>, lookups: &[Lookup]) -> Option<String> {
    lookups.iter().find_map(|lookup| {
        let selector = parse_selector(lookup.selector())?;
        root.select(&selector).find_map(|el| lookup.read(el))
    })
}

pub(crate) fn lookup_document(document: &Html, lookups: &[Lookup]) -> Option<String> {
    lookup_first(document.root_element(), lookups)
}

/// Selectors are static strings; an invalid one is skipped rather than fatal.
pub(crate) fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!(selector = css, error = ?e, "Invalid CSS selector skipped");
            None
        }
    }
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    normalize_ws(&el.text().collect::<Vec<_>>().join(" "))
}

pub(crate) fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Page text outside `<script>`, `<style>` and `<noscript>`.
pub(crate) fn visible_text(root: ElementRef<'_>) -> String {
    let mut parts = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element())
            .map(|e| matches!(e.name(), "script" | "style" | "noscript" | "template"))
            .unwrap_or(false);
        if !hidden {
            parts.push(&**text);
        }
    }
    normalize_ws(&parts.join(" "))
}

static FIRST_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)").expect("number regex is valid"));

static COUNT_WITH_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:,\d{3})*(?:\.\d+)?)\s*([km])?\b").expect("count regex is valid")
});

static PROVIDER_FROM_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"rapidapi\.com/([^/?#]+)/api/").expect("provider url regex is valid")
});

/// Rating shown on the page, accepted when it falls in `0..=10`.
pub(crate) fn parse_rating(text: &str) -> Option<f64> {
    let raw = FIRST_NUMBER.captures(text)?.get(1)?.as_str().replace(',', ".");
    raw.parse::<f64>().ok().filter(|r| (0.0..=10.0).contains(r))
}

/// Counts such as `1,234`, `(87 reviews)` or `1.2k`.
pub(crate) fn parse_count(text: &str) -> Option<u64> {
    let caps = COUNT_WITH_SUFFIX.captures(text)?;
    let number: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(s) if s == "k" => 1_000.0,
        Some(s) if s == "m" => 1_000_000.0,
        _ => 1.0,
    };
    Some((number * multiplier).round() as u64)
}

/// Provider slug from a listing URL (`rapidapi.com/<provider>/api/<name>`).
pub fn provider_from_url(url: &str) -> Option<String> {
    PROVIDER_FROM_URL
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
