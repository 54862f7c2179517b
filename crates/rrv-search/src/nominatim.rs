use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use rrv_core::restaurant::native_id;
use rrv_core::RestaurantRecord;

use crate::error::SearchError;
use crate::format::format_nominatim_place;
use crate::types::{NominatimPlace, SearchConfig};

/// Results requested per variant query.
const RESULTS_PER_VARIANT: &str = "50";

/// `class=amenity` types that count as places to eat.
const FOOD_AMENITY_TYPES: [&str; 6] = [
    "restaurant",
    "fast_food",
    "cafe",
    "food_court",
    "bar",
    "pub",
];

/// Display-name keywords that mark a place as food-related when the
/// category does not.
const FOOD_KEYWORDS: [&str; 4] = ["restaurant", "cafe", "pizza", "food"];

/// Client for the Nominatim `search` and `lookup` endpoints.
pub struct NominatimClient {
    client: Client,
    base_url: String,
}

impl NominatimClient {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidBaseUrl`] if `nominatim_url` does not
    /// parse, or [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        reqwest::Url::parse(&config.nominatim_url).map_err(|e| SearchError::InvalidBaseUrl {
            url: config.nominatim_url.clone(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            base_url: config.nominatim_url.trim_end_matches('/').to_string(),
        })
    }

    /// Free-text variants tried in order. Nominatim ranks generic matches
    /// poorly, so the food-flavoured variants come first.
    #[must_use]
    pub fn query_variants(term: &str) -> [String; 4] {
        [
            format!("{term} restaurant"),
            format!("{term} food"),
            format!("{term} cafe"),
            term.to_string(),
        ]
    }

    /// Whether a geocoder hit is a place to eat.
    #[must_use]
    pub fn is_food_place(place: &NominatimPlace) -> bool {
        let kind = place.kind.as_deref().unwrap_or_default();
        if place.category.as_deref() == Some("amenity") && FOOD_AMENITY_TYPES.contains(&kind) {
            return true;
        }
        if kind == "restaurant" {
            return true;
        }
        let display = place.display_name.to_lowercase();
        FOOD_KEYWORDS.iter().any(|kw| display.contains(kw))
    }

    /// Food places for `term`, accumulated across the query variants.
    ///
    /// Variants run one after another and stop once at least `limit * 2`
    /// records are collected. A failing variant is logged and skipped.
    pub async fn search(&self, term: &str, limit: usize) -> Vec<RestaurantRecord> {
        let target = limit.saturating_mul(2);
        let mut records = Vec::new();

        for variant in Self::query_variants(term) {
            match self.fetch_search(&variant).await {
                Ok(places) => {
                    records.extend(
                        places
                            .iter()
                            .filter(|p| Self::is_food_place(p))
                            .map(format_nominatim_place),
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        provider = "nominatim",
                        variant = %variant,
                        error = %e,
                        "nominatim variant failed"
                    );
                }
            }
            if records.len() >= target {
                break;
            }
        }

        tracing::debug!(
            provider = "nominatim",
            term,
            found = records.len(),
            "nominatim search complete"
        );
        records
    }

    /// Details for a single restaurant by record id.
    ///
    /// The `osm-`/`nom-` prefix is stripped and the remainder looked up as
    /// an OSM node. The returned record keeps `record_id`. Returns `None`
    /// for a non-numeric id, an empty result, or any failure.
    pub async fn lookup(&self, record_id: &str) -> Option<RestaurantRecord> {
        let native = native_id(record_id);
        if native.is_empty() || !native.bytes().all(|b| b.is_ascii_digit()) {
            tracing::debug!(
                provider = "nominatim",
                record_id,
                "lookup skipped for non-numeric id"
            );
            return None;
        }

        let osm_ids = format!("N{native}");
        let url = format!("{}/lookup", self.base_url);
        let result: Result<Vec<NominatimPlace>, SearchError> = self
            .get_json(
                &url,
                &[
                    ("osm_ids", osm_ids.as_str()),
                    ("format", "json"),
                    ("addressdetails", "1"),
                    ("extratags", "1"),
                ],
                "nominatim lookup response",
            )
            .await;

        match result {
            Ok(places) => places.first().map(|place| {
                let mut record = format_nominatim_place(place);
                record.id = record_id.to_string();
                record
            }),
            Err(e) => {
                tracing::warn!(
                    provider = "nominatim",
                    record_id,
                    error = %e,
                    "nominatim lookup failed"
                );
                None
            }
        }
    }

    /// One raw `search` call for a query string.
    ///
    /// # Errors
    ///
    /// - [`SearchError::Http`] on network failure.
    /// - [`SearchError::UnexpectedStatus`] on any non-2xx response.
    /// - [`SearchError::Deserialize`] when the body is not a JSON array of
    ///   places.
    pub async fn fetch_search(&self, query: &str) -> Result<Vec<NominatimPlace>, SearchError> {
        let url = format!("{}/search", self.base_url);
        self.get_json(
            &url,
            &[
                ("q", query),
                ("format", "json"),
                ("limit", RESULTS_PER_VARIANT),
                ("addressdetails", "1"),
                ("extratags", "1"),
            ],
            "nominatim search response",
        )
        .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
        context: &str,
    ) -> Result<T, SearchError> {
        let response = self.client.get(url).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<T>(&body).map_err(|e| SearchError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }
}
