//! Provider wire types and client configuration.

use std::collections::BTreeMap;

use serde::Deserialize;

use rrv_core::config::{DEFAULT_NOMINATIM_URL, DEFAULT_OVERPASS_URL, DEFAULT_USER_AGENT};
use rrv_core::AppConfig;

/// Settings shared by both provider clients.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Full Overpass interpreter endpoint.
    pub overpass_url: String,
    /// Nominatim base URL; `search` and `lookup` are resolved against it.
    pub nominatim_url: String,
    /// Sent on every provider request. Nominatim's usage policy requires it.
    pub user_agent: String,
    pub timeout_secs: u64,
    pub center_lat: f64,
    pub center_lon: f64,
    pub radius_m: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            overpass_url: DEFAULT_OVERPASS_URL.to_string(),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            center_lat: -29.5,
            center_lon: 28.5,
            radius_m: 200_000,
        }
    }
}

impl SearchConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            overpass_url: config.overpass_url.clone(),
            nominatim_url: config.nominatim_url.clone(),
            user_agent: config.user_agent.clone(),
            timeout_secs: config.http_timeout_secs,
            center_lat: config.search_center_lat,
            center_lon: config.search_center_lon,
            radius_m: config.search_radius_m,
        }
    }
}

// ---------------------------------------------------------------------------
// Overpass
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

/// A node or way returned by `out center`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverpassElement {
    pub id: i64,
    /// `node` or `way`.
    #[serde(rename = "type", default)]
    pub element_type: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Present on ways when the query asks for `out center`.
    pub center: Option<OverpassCenter>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OverpassCenter {
    pub lat: f64,
    pub lon: f64,
}

impl OverpassElement {
    /// Tag value, treating empty strings as absent.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

// ---------------------------------------------------------------------------
// Nominatim
// ---------------------------------------------------------------------------

/// One entry of a Nominatim `search` or `lookup` response.
///
/// Coordinates arrive as strings. `address` and `extratags` values are kept
/// as raw JSON so one odd value does not reject the whole response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NominatimPlace {
    pub place_id: i64,
    #[serde(default)]
    pub display_name: String,
    pub name: Option<String>,
    #[serde(default)]
    pub lat: String,
    #[serde(default)]
    pub lon: String,
    #[serde(rename = "class")]
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub address: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub extratags: Option<BTreeMap<String, serde_json::Value>>,
    pub osm_type: Option<String>,
    pub osm_id: Option<i64>,
}

impl NominatimPlace {
    /// Extra tag value as a string, treating empty strings as absent.
    #[must_use]
    pub fn extratag(&self, key: &str) -> Option<String> {
        self.extratags
            .as_ref()
            .and_then(|tags| tags.get(key))
            .and_then(value_to_string)
            .filter(|v| !v.trim().is_empty())
    }

    /// The structured address flattened to string values.
    #[must_use]
    pub fn address_map(&self) -> BTreeMap<String, String> {
        self.address
            .iter()
            .flatten()
            .filter_map(|(k, v)| value_to_string(v).map(|s| (k.clone(), s)))
            .collect()
    }
}

fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
