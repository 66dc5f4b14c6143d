//! Selector strategies for marketplace pages, most specific first.

use super::Lookup;
use super::Lookup::{Attr, Text};

pub(crate) const NAME: &[Lookup] = &[
    Text("[data-testid='api-name']"),
    Text("[data-testid='api-title']"),
    Text("h1[itemprop='name']"),
    Text("main h1"),
    Text("h1"),
    Attr("meta[property='og:title']", "content"),
    Text("title"),
];

pub(crate) const DESCRIPTION: &[Lookup] = &[
    Text("[data-testid='api-description']"),
    Text("[itemprop='description']"),
    Text(".api-description"),
    Text(".ApiDescription"),
    Attr("meta[name='description']", "content"),
    Attr("meta[property='og:description']", "content"),
];

pub(crate) const PROVIDER: &[Lookup] = &[
    Text("[data-testid='api-provider']"),
    Text("[itemprop='author'] [itemprop='name']"),
    Text("[itemprop='author']"),
    Text(".provider-name"),
    Text("a[href*='/user/']"),
];

pub(crate) const CATEGORY: &[Lookup] = &[
    Text("[data-testid='api-category']"),
    Text("[itemprop='applicationCategory']"),
    Text("a[href*='/category/']"),
    Text("a[href*='/categories/']"),
];

pub(crate) const RATING: &[Lookup] = &[
    Attr("[itemprop='ratingValue']", "content"),
    Text("[itemprop='ratingValue']"),
    Text("[data-testid='api-rating']"),
    Text(".rating-value"),
];

pub(crate) const REVIEW_COUNT: &[Lookup] = &[
    Attr("[itemprop='reviewCount']", "content"),
    Text("[itemprop='reviewCount']"),
    Text("[data-testid='api-review-count']"),
    Text(".review-count"),
];

pub(crate) const POPULARITY: &[Lookup] = &[
    Text("[data-testid='api-popularity']"),
    Text(".popularity-score"),
];

pub(crate) const SERVICE_LEVEL: &[Lookup] = &[
    Text("[data-testid='api-service-level']"),
    Text(".service-level"),
];

pub(crate) const LATENCY: &[Lookup] = &[
    Text("[data-testid='api-latency']"),
    Text(".latency"),
];

pub(crate) const DOCUMENTATION_LINK: &[Lookup] = &[
    Attr("a[data-testid='documentation-link']", "href"),
    Attr("a[href*='/playground']", "href"),
    Attr("a[href$='/documentation']", "href"),
    Attr("a[href*='/docs']", "href"),
];

/// Scripts that may embed page data as JSON.
pub(crate) const EMBEDDED_JSON: &str =
    "script#__NEXT_DATA__, script[type='application/json'], script[type='application/ld+json']";

pub(crate) const PLAN_CARD: &str = "[data-testid='pricing-plan'], [data-testid='plan-card'], .pricing-plan, .plan-card, .pricing-card";
pub(crate) const PLAN_NAME: &[Lookup] = &[
    Text("[data-testid='plan-name']"),
    Text(".plan-name"),
    Text("h2"),
    Text("h3"),
    Text("h4"),
];
pub(crate) const PLAN_PRICE: &[Lookup] = &[
    Text("[data-testid='plan-price']"),
    Text(".plan-price"),
    Text(".price"),
];
pub(crate) const PLAN_LIMIT: &str = "[data-testid='plan-limit'], .plan-limit, li";

pub(crate) const ENDPOINT_ITEM: &str = "[data-testid='endpoint-item'], [data-testid='endpoint'], .endpoint-item, li.endpoint";
pub(crate) const ENDPOINT_GROUP: &str = "[data-testid='endpoint-group'], .endpoint-group, details";
pub(crate) const GROUP_TITLE: &[Lookup] = &[
    Text("[data-testid='group-name']"),
    Text(".group-name"),
    Text("summary"),
];
pub(crate) const ENDPOINT_METHOD: &[Lookup] = &[
    Text("[data-testid='endpoint-method']"),
    Text(".endpoint-method"),
    Text(".http-method"),
    Text(".method"),
];
pub(crate) const ENDPOINT_NAME: &[Lookup] = &[
    Text("[data-testid='endpoint-name']"),
    Text(".endpoint-name"),
    Text(".name"),
];
pub(crate) const ENDPOINT_DESCRIPTION: &[Lookup] = &[
    Text("[data-testid='endpoint-description']"),
    Text(".endpoint-description"),
    Text(".description"),
];
pub(crate) const ENDPOINT_PATH: &[Lookup] = &[
    Text("[data-testid='endpoint-path']"),
    Text(".endpoint-path"),
    Text("code"),
];

pub(crate) const PARAM_ITEM: &str = "[data-testid='endpoint-param'], .endpoint-param, .parameter";
pub(crate) const PARAM_NAME: &[Lookup] = &[
    Text("[data-testid='param-name']"),
    Text(".param-name"),
];
pub(crate) const PARAM_TYPE: &[Lookup] = &[
    Text("[data-testid='param-type']"),
    Text(".param-type"),
];
pub(crate) const PARAM_LOCATION: &[Lookup] = &[
    Text("[data-testid='param-location']"),
    Text(".param-in"),
];
pub(crate) const PARAM_REQUIRED: &[Lookup] = &[
    Text("[data-testid='param-required']"),
    Text(".param-required"),
];
pub(crate) const PARAM_DESCRIPTION: &[Lookup] = &[
    Text("[data-testid='param-description']"),
    Text(".param-description"),
];

pub(crate) const SEARCH_CARD: &str = "[data-testid='api-card'], [data-testid='search-result'], .api-card";
pub(crate) const SEARCH_CARD_NAME: &[Lookup] = &[
    Text("[data-testid='api-card-name']"),
    Text(".api-card-name"),
    Text("h3"),
    Text("h2"),
    Text(".name"),
];
pub(crate) const SEARCH_CARD_DESCRIPTION: &[Lookup] = &[
    Text("[data-testid='api-card-description']"),
    Text(".api-card-description"),
    Text(".description"),
    Text("p"),
];
pub(crate) const SEARCH_CARD_PROVIDER: &[Lookup] = &[
    Text("[data-testid='api-card-provider']"),
    Text(".api-card-provider"),
    Text(".provider"),
];
pub(crate) const SEARCH_CARD_CATEGORY: &[Lookup] = &[
    Text("[data-testid='api-card-category']"),
    Text(".category"),
];
pub(crate) const SEARCH_CARD_RATING: &[Lookup] = &[
    Text("[data-testid='api-card-rating']"),
    Text(".rating"),
];
/// Anchor pointing at a listing page.
pub(crate) const LISTING_LINK: &str = "a[href*='/api/']";
