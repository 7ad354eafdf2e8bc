//! Upstream Price Source
//!
//! The rate-limited pricing search a worker queries once per item id. Any
//! non-200 status or transport error is a failure; the worker does not
//! distinguish between rate limiting and other upstream trouble because the
//! recovery path (stop, report, resubmit elsewhere) is the same.

use super::types::Listing;
use crate::dispatch::types::ItemId;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetches current listings for one item. `Err` means the batch stops.
    async fn fetch(&self, item_id: &ItemId) -> Result<Vec<Listing>>;
}

/// Production source: posts the pricing search payload to the configured
/// API URL and extracts listings from the nested results.
pub struct HttpPriceSource {
    http_client: reqwest::Client,
    api_url: String,
}

impl HttpPriceSource {
    pub fn new(api_url: &str) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_url: api_url.to_string(),
        }
    }

    fn search_payload(item_id: &ItemId) -> Value {
        serde_json::json!({
            "filters": {
                "term": {
                    "productId": item_id.0,
                    "sellerStatus": "Live",
                    "channelId": 0,
                    "language": ["English"],
                    "verified-seller": true,
                },
                "range": { "quantity": { "gte": 1 } },
                "exclude": { "channelExclusion": 0 },
            },
            "from": 0,
            "size": 10,
            "sort": { "field": "price", "order": "asc" },
            "context": { "shippingCountry": "US", "cart": {} },
            "aggregations": ["listingType"],
        })
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch(&self, item_id: &ItemId) -> Result<Vec<Listing>> {
        let response = self
            .http_client
            .post(&self.api_url)
            .json(&Self::search_payload(item_id))
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(anyhow::anyhow!(
                "Upstream returned {} for item {}",
                response.status(),
                item_id
            ));
        }

        let body: Value = response.json().await?;
        Ok(parse_listings(&body))
    }
}

/// Extracts listings from the upstream response shape:
/// `results[].results[]` entries carrying per-seller pricing.
pub fn parse_listings(body: &Value) -> Vec<Listing> {
    let mut listings = Vec::new();

    let outer = match body.get("results").and_then(Value::as_array) {
        Some(outer) => outer,
        None => return listings,
    };

    for group in outer {
        let inner = match group.get("results").and_then(Value::as_array) {
            Some(inner) => inner,
            None => continue,
        };

        for product in inner {
            listings.push(Listing {
                sku: product.get("productConditionId").and_then(Value::as_i64),
                seller_id: string_field(product, "sellerId"),
                seller_name: string_field(product, "sellerName"),
                price: product.get("price").and_then(Value::as_f64),
            });
        }
    }

    listings
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}
