//! Unified restaurant record produced from either OpenStreetMap provider.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CUISINE: &str = "Not specified";
pub const PIZZA_CUISINE: &str = "Pizza";
pub const DEFAULT_PHONE: &str = "N/A";
pub const DEFAULT_OPENING_HOURS: &str = "Not available";
pub const ADDRESS_UNAVAILABLE: &str = "Address not available";

const OSM_BASE_URL: &str = "https://www.openstreetmap.org";

/// Which provider produced a [`RestaurantRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestaurantSource {
    Overpass,
    Nominatim,
}

impl RestaurantSource {
    /// Prefix used in record ids so ids never collide across providers.
    #[must_use]
    pub fn id_prefix(self) -> &'static str {
        match self {
            RestaurantSource::Overpass => "osm",
            RestaurantSource::Nominatim => "nom",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RestaurantSource::Overpass => "overpass",
            RestaurantSource::Nominatim => "nominatim",
        }
    }

    /// Infer the source from a prefixed record id (`osm-…` / `nom-…`).
    #[must_use]
    pub fn from_record_id(id: &str) -> Option<Self> {
        if id.starts_with("osm-") {
            Some(RestaurantSource::Overpass)
        } else if id.starts_with("nom-") {
            Some(RestaurantSource::Nominatim)
        } else {
            None
        }
    }

    /// Build a prefixed record id for a provider-native id.
    #[must_use]
    pub fn record_id(self, native_id: impl std::fmt::Display) -> String {
        format!("{}-{native_id}", self.id_prefix())
    }
}

impl std::fmt::Display for RestaurantSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A restaurant as shown to users, regardless of which provider found it.
///
/// Serialized with camelCase keys; `kind` is emitted as `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantRecord {
    /// Provider-prefixed id: `osm-<id>` or `nom-<place_id>`.
    pub id: String,
    pub source: RestaurantSource,
    pub name: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub cuisine: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Structured address; completeness depends on the provider.
    #[serde(default)]
    pub address: BTreeMap<String, String>,
    pub full_address: String,
    pub phone: String,
    pub website: Option<String>,
    pub opening_hours: String,
    pub osm_url: String,
}

impl RestaurantRecord {
    /// Minimal stand-in used when a restaurant can be found neither in the
    /// cache nor at the provider.
    #[must_use]
    pub fn placeholder(id: &str) -> Self {
        Self {
            id: id.to_string(),
            source: RestaurantSource::from_record_id(id).unwrap_or(RestaurantSource::Overpass),
            name: "Restaurant".to_string(),
            display_name: "Information currently unavailable. Please try searching again."
                .to_string(),
            kind: "restaurant".to_string(),
            cuisine: DEFAULT_CUISINE.to_string(),
            lat: None,
            lon: None,
            address: BTreeMap::new(),
            full_address: ADDRESS_UNAVAILABLE.to_string(),
            phone: DEFAULT_PHONE.to_string(),
            website: None,
            opening_hours: DEFAULT_OPENING_HOURS.to_string(),
            osm_url: osm_search_url(id),
        }
    }

    /// Both coordinates, when the provider supplied usable geometry.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Strip the `osm-` / `nom-` prefix from a record id.
#[must_use]
pub fn native_id(record_id: &str) -> &str {
    record_id
        .strip_prefix("osm-")
        .or_else(|| record_id.strip_prefix("nom-"))
        .unwrap_or(record_id)
}

/// Deep link to an OpenStreetMap element, e.g. `https://www.openstreetmap.org/node/42`.
#[must_use]
pub fn osm_element_url(element_type: &str, id: impl std::fmt::Display) -> String {
    format!("{OSM_BASE_URL}/{element_type}/{id}")
}

/// OpenStreetMap search link for free text, percent-encoded.
#[must_use]
pub fn osm_search_url(query: &str) -> String {
    let encoded: String = query
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                char::from(b).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect();
    format!("{OSM_BASE_URL}/search?query={encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_is_prefixed_by_source() {
        assert_eq!(RestaurantSource::Overpass.record_id(42), "osm-42");
        assert_eq!(RestaurantSource::Nominatim.record_id("9001"), "nom-9001");
    }

    #[test]
    fn from_record_id_recognises_both_prefixes() {
        assert_eq!(
            RestaurantSource::from_record_id("osm-1"),
            Some(RestaurantSource::Overpass)
        );
        assert_eq!(
            RestaurantSource::from_record_id("nom-1"),
            Some(RestaurantSource::Nominatim)
        );
        assert_eq!(RestaurantSource::from_record_id("123"), None);
    }

    #[test]
    fn native_id_strips_either_prefix() {
        assert_eq!(native_id("osm-123"), "123");
        assert_eq!(native_id("nom-456"), "456");
        assert_eq!(native_id("789"), "789");
    }

    #[test]
    fn placeholder_links_to_osm_search() {
        let record = RestaurantRecord::placeholder("nom-12 34");
        assert_eq!(record.name, "Restaurant");
        assert_eq!(record.source, RestaurantSource::Nominatim);
        assert_eq!(
            record.osm_url,
            "https://www.openstreetmap.org/search?query=nom-12%2034"
        );
    }

    #[test]
    fn coordinates_rejects_nan() {
        let mut record = RestaurantRecord::placeholder("osm-1");
        record.lat = Some(f64::NAN);
        record.lon = Some(28.5);
        assert!(record.coordinates().is_none());
        record.lat = Some(-29.3);
        assert_eq!(record.coordinates(), Some((-29.3, 28.5)));
    }

    #[test]
    fn serializes_with_camel_case_and_type_key() {
        let record = RestaurantRecord::placeholder("osm-7");
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["type"], "restaurant");
        assert_eq!(json["source"], "overpass");
        assert!(json.get("displayName").is_some());
        assert!(json.get("openingHours").is_some());
        assert!(json.get("osmUrl").is_some());
    }
}
