use std::time::Duration;

use reqwest::Client;

use rrv_core::RestaurantRecord;

use crate::error::SearchError;
use crate::format::format_overpass_element;
use crate::relevance::filter_by_search_term;
use crate::types::{OverpassResponse, SearchConfig};

/// Overpass returns many unnamed or off-topic elements, so ask for more than
/// the caller wants before filtering.
const OVERFETCH_FACTOR: usize = 5;

/// Client for the Overpass interpreter endpoint.
///
/// One query per search: every `restaurant`, `fast_food` and `cafe` node or
/// way within the configured radius.
pub struct OverpassClient {
    client: Client,
    endpoint: reqwest::Url,
    center_lat: f64,
    center_lon: f64,
    radius_m: u32,
}

impl OverpassClient {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidBaseUrl`] if `overpass_url` does not
    /// parse, or [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let endpoint =
            reqwest::Url::parse(&config.overpass_url).map_err(|e| SearchError::InvalidBaseUrl {
                url: config.overpass_url.clone(),
                reason: e.to_string(),
            })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            endpoint,
            center_lat: config.center_lat,
            center_lon: config.center_lon,
            radius_m: config.radius_m,
        })
    }

    /// Overpass QL for the configured area, capped at `limit * 5` elements.
    #[must_use]
    pub fn build_query(&self, limit: usize) -> String {
        let around = format!(
            "(around:{},{},{})",
            self.radius_m, self.center_lat, self.center_lon
        );
        let mut query = String::from("[out:json][timeout:25];(");
        for element in ["node", "way"] {
            for amenity in ["restaurant", "fast_food", "cafe"] {
                query.push_str(&format!("{element}[\"amenity\"=\"{amenity}\"]{around};"));
            }
        }
        query.push_str(&format!(
            ");out center {};",
            limit.saturating_mul(OVERFETCH_FACTOR)
        ));
        query
    }

    /// Relevant named restaurants for `term`.
    ///
    /// Never fails: any transport, status or decode error is logged and
    /// yields an empty list.
    pub async fn search(&self, term: &str, limit: usize) -> Vec<RestaurantRecord> {
        match self.fetch(limit).await {
            Ok(response) => {
                let records: Vec<RestaurantRecord> = response
                    .elements
                    .iter()
                    .filter_map(format_overpass_element)
                    .collect();
                let total = records.len();
                let relevant = filter_by_search_term(records, term);
                tracing::debug!(
                    provider = "overpass",
                    term,
                    named = total,
                    relevant = relevant.len(),
                    "overpass search complete"
                );
                relevant
            }
            Err(e) => {
                tracing::warn!(provider = "overpass", term, error = %e, "overpass search failed");
                Vec::new()
            }
        }
    }

    /// Sends the query and decodes the raw response.
    ///
    /// # Errors
    ///
    /// - [`SearchError::Http`] on network failure.
    /// - [`SearchError::UnexpectedStatus`] on any non-2xx response.
    /// - [`SearchError::Deserialize`] when the body is not an Overpass
    ///   JSON document.
    pub async fn fetch(&self, limit: usize) -> Result<OverpassResponse, SearchError> {
        let query = self.build_query(limit);
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("data", query.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.endpoint.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<OverpassResponse>(&body).map_err(|e| SearchError::Deserialize {
            context: "overpass interpreter response".to_string(),
            source: e,
        })
    }
}
