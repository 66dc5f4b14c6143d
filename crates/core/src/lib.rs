pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use config::{BrowserConfig, Config, ScraperConfig};
pub use error::{Error, Result};
pub use paths::Paths;
pub use types::{
    parse_price, price_number, ApiListing, ApiSummary, DocumentationResult, Endpoint,
    EndpointParameter, PricingResult, PricingTier,
};
