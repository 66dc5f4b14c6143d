//! Marketplace search result pages.

use once_cell::sync::Lazy;
use rapidapi_core::ApiSummary;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;

use super::listing::{absolutize, Stats};
use super::selectors::*;
use super::{element_text, parse_rating, parse_selector, lookup_first, provider_from_url, visible_text};

static LISTING_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://[^/]*rapidapi\.com/[^/?#]+/api/[^/?#]+").expect("listing url regex is valid")
});

static BY_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^by\s+").expect("by prefix regex is valid"));

/// Up to `limit` listing summaries, in page order, deduplicated by URL.
///
/// Result cards are used when the page has them; otherwise every anchor that
/// points at a listing page becomes a bare summary.
pub fn extract_search_results(html: &str, base_url: &str, limit: usize) -> Vec<ApiSummary> {
    let document = Html::parse_document(html);
    let Some(link_sel) = parse_selector(LISTING_LINK) else {
        return Vec::new();
    };

    let cards: Vec<ElementRef<'_>> = parse_selector(SEARCH_CARD)
        .map(|sel| document.select(&sel).collect())
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let mut results = Vec::new();

    if cards.is_empty() {
        debug!("No search result cards matched; falling back to listing links");
        for link in document.select(&link_sel) {
            if results.len() >= limit {
                break;
            }
            let Some(url) = link.value().attr("href").and_then(|h| listing_url(base_url, h)) else {
                continue;
            };
            let name = element_text(link);
            if name.is_empty() || !seen.insert(url.clone()) {
                continue;
            }
            results.push(ApiSummary {
                name,
                provider: provider_from_url(&url),
                url,
                ..ApiSummary::default()
            });
        }
        return results;
    }

    for card in cards {
        if results.len() >= limit {
            break;
        }
        let Some(summary) = summary_from_card(card, &link_sel, base_url) else {
            continue;
        };
        if seen.insert(summary.url.clone()) {
            results.push(summary);
        }
    }
    results
}

fn summary_from_card(card: ElementRef<'_>, link_sel: &Selector, base_url: &str) -> Option<ApiSummary> {
    let link = if card.value().name() == "a" {
        Some(card)
    } else {
        card.select(link_sel).next()
    }?;
    let url = listing_url(base_url, link.value().attr("href")?)?;
    let name = lookup_first(card, SEARCH_CARD_NAME).or_else(|| {
        let text = element_text(link);
        (!text.is_empty()).then_some(text)
    })?;

    let stats = Stats::from_text(&visible_text(card));
    Some(ApiSummary {
        name,
        description: lookup_first(card, SEARCH_CARD_DESCRIPTION),
        provider: lookup_first(card, SEARCH_CARD_PROVIDER)
            .map(|p| BY_PREFIX.replace(&p, "").to_string())
            .or_else(|| provider_from_url(&url)),
        category: lookup_first(card, SEARCH_CARD_CATEGORY),
        rating: lookup_first(card, SEARCH_CARD_RATING).and_then(|r| parse_rating(&r)),
        popularity: stats.popularity,
        latency: stats.latency,
        service_level: stats.service_level,
        url,
    })
}

/// Absolute listing URL without query or fragment, or `None` when `href`
/// does not point at a listing page.
fn listing_url(base_url: &str, href: &str) -> Option<String> {
    let absolute = absolutize(base_url, href)?;
    LISTING_URL.find(&absolute).map(|m| m.as_str().to_string())
}
