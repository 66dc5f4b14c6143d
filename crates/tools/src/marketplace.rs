//! Shared scraping flows behind the marketplace tools.
//!
//! Every flow takes a leased [`PageDriver`]; tools acquire and release the
//! lease around them.

use rapidapi_core::{ApiListing, Error, Result, ScraperConfig};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::navigator::TRIGGER_DATA_LOADS_JS;
use crate::browser::{load_page, NavigationOptions, PageDriver, PageSnapshot};
use crate::extract::{
    extract_endpoints, extract_listing, merge_payload, parse_graphql_payload, parse_rsc_payload,
    PayloadData,
};

/// Trailing path segments that name a sub-page of a listing.
const LISTING_SUBPAGES: &[&str] = &["playground", "details", "pricing", "tutorials", "discussions"];

/// Syntax check for a URL argument: parses, http(s), has a host.
pub fn parse_url_param(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed)
        .map_err(|_| Error::Validation(format!("'{}' is not a valid URL", raw)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Validation(format!(
            "URL must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::Validation(format!("URL has no host: '{}'", raw)));
    }
    Ok(url)
}

/// Full check for a listing URL: syntax plus a host on the marketplace.
pub fn validate_listing_url(raw: &str, config: &ScraperConfig) -> Result<Url> {
    let url = parse_url_param(raw)?;
    let marketplace = config.marketplace_host();
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let on_marketplace = host == marketplace || host.ends_with(&format!(".{}", marketplace));
    if !on_marketplace {
        return Err(Error::Validation(format!(
            "URL must point to {}, got host '{}'",
            marketplace, host
        )));
    }
    Ok(url)
}

/// Required string argument, trimmed and non-empty.
pub fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Validation(format!("Missing required parameter: {}", key)))
}

/// Listing root without query, fragment or a trailing sub-page segment.
pub fn listing_root(url: &Url) -> String {
    let mut root = url.clone();
    root.set_query(None);
    root.set_fragment(None);
    let mut path = root.path().trim_end_matches('/').to_string();
    if let Some((head, last)) = path.rsplit_once('/') {
        if LISTING_SUBPAGES.contains(&last.to_ascii_lowercase().as_str()) {
            path = head.to_string();
        }
    }
    root.set_path(&path);
    root.to_string().trim_end_matches('/').to_string()
}

pub fn pricing_url(url: &Url) -> String {
    format!("{}/pricing", listing_root(url))
}

pub fn playground_url(url: &Url) -> String {
    format!("{}/playground", listing_root(url))
}

/// Marketplace search URL for a keyword and optional category.
pub fn search_url(config: &ScraperConfig, keyword: &str, category: Option<&str>) -> Result<String> {
    let mut url = Url::parse(&config.base_url)
        .and_then(|base| base.join("/search"))
        .map_err(|e| Error::Config(format!("Invalid scraper.baseUrl '{}': {}", config.base_url, e)))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("term", keyword);
        query.append_pair("sortBy", "ByRelevance");
        if let Some(category) = category {
            query.append_pair("category", category);
        }
    }
    Ok(url.to_string())
}

/// Load a page with the standard expand pass.
pub async fn load<D: PageDriver + ?Sized>(
    driver: &mut D,
    url: &str,
    config: &ScraperConfig,
) -> Result<PageSnapshot> {
    load_page(driver, url, &NavigationOptions::from_config(config)).await
}

/// Load and scrape one listing page.
pub async fn scrape_listing<D: PageDriver + ?Sized>(
    driver: &mut D,
    url: &str,
    config: &ScraperConfig,
) -> Result<ApiListing> {
    let snapshot = load(driver, url, config).await?;
    let mut listing = extract_listing(&snapshot.html, url);
    listing.partial = snapshot.timed_out;
    Ok(listing)
}

/// Listing with endpoint parameters and fields merged from captured
/// RSC/GraphQL payloads. Falls back to [`scrape_listing`] when the
/// instrumented run fails.
pub async fn scrape_listing_enhanced<D: PageDriver + ?Sized>(
    driver: &mut D,
    url: &str,
    config: &ScraperConfig,
) -> Result<ApiListing> {
    let enhanced = match driver.start_network_capture().await {
        Ok(()) => {
            let result = instrumented_listing(driver, url, config).await;
            driver.stop_network_capture().await;
            result
        }
        Err(e) => Err(e),
    };

    match enhanced {
        Ok(listing) => Ok(listing),
        Err(e) => {
            warn!(url, error = %e, "Enhanced assessment failed; falling back to standard assessment");
            scrape_listing(driver, url, config).await
        }
    }
}

async fn instrumented_listing<D: PageDriver + ?Sized>(
    driver: &mut D,
    url: &str,
    config: &ScraperConfig,
) -> Result<ApiListing> {
    // The trigger pass makes the page fetch pricing/endpoint payloads; its
    // clicks may leave the listing, so the DOM is read from a fresh load.
    let trigger = NavigationOptions::from_config(config).with_script(TRIGGER_DATA_LOADS_JS);
    load_page(driver, url, &trigger).await?;

    let snapshot = load(driver, url, config).await?;
    let mut listing = extract_listing(&snapshot.html, url);
    listing.partial = snapshot.timed_out;
    let detailed = extract_endpoints(&snapshot.html, true);
    if !detailed.is_empty() {
        listing.endpoints = detailed;
    }

    let payload = collect_payloads(driver).await;
    if payload.is_empty() {
        info!(url, "No enhanced data captured");
    } else {
        let changed = merge_payload(&mut listing, &payload);
        info!(url, ?changed, "Listing enhanced from network payloads");
    }
    Ok(listing)
}

/// RSC bodies accumulate (later responses win); the first GraphQL response
/// that carries an API object is applied on top.
async fn collect_payloads<D: PageDriver + ?Sized>(driver: &mut D) -> PayloadData {
    let mut payload = PayloadData::default();

    let rsc_responses = driver.captured_responses(Some("/api/")).await;
    debug!(count = rsc_responses.len(), "API responses captured");
    for response in rsc_responses {
        match driver.response_body(&response.request_id).await {
            Ok(Some(body)) => payload.absorb(parse_rsc_payload(&response.url, &body)),
            Ok(None) => {}
            Err(e) => debug!(url = %response.url, error = %e, "Could not read response body"),
        }
    }

    let graphql_responses = driver.captured_responses(Some("graphql")).await;
    debug!(count = graphql_responses.len(), "GraphQL responses captured");
    for response in graphql_responses {
        let Ok(Some(body)) = driver.response_body(&response.request_id).await else {
            continue;
        };
        if let Some(data) = parse_graphql_payload(&body) {
            payload.absorb(data);
            break;
        }
    }

    payload
}
