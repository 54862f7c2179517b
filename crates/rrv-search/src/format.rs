//! Conversion from provider wire shapes to [`RestaurantRecord`].
//!
//! Both functions are pure. Every optional field falls back to the shared
//! defaults in [`rrv_core::restaurant`].

use std::collections::BTreeMap;

use rrv_core::restaurant::{
    osm_element_url, osm_search_url, ADDRESS_UNAVAILABLE, DEFAULT_CUISINE,
    DEFAULT_OPENING_HOURS, DEFAULT_PHONE, PIZZA_CUISINE,
};
use rrv_core::{RestaurantRecord, RestaurantSource};

use crate::types::{NominatimPlace, OverpassElement};

const DEFAULT_KIND: &str = "restaurant";
const NOT_AVAILABLE: &str = "N/A";

/// Formats an Overpass element, or `None` when it has no `name` tag.
#[must_use]
pub fn format_overpass_element(element: &OverpassElement) -> Option<RestaurantRecord> {
    let name = element.tag("name")?.to_string();

    let lat = element.lat.or(element.center.map(|c| c.lat));
    let lon = element.lon.or(element.center.map(|c| c.lon));

    let street = element.tag("addr:street");
    let city = element.tag("addr:city");
    let country = element.tag("addr:country");

    let display_name = match city {
        Some(city) => format!("{name}, {city}"),
        None => name.clone(),
    };

    let cuisine = cuisine_or_heuristic(element.tag("cuisine"), &name);

    let mut address = BTreeMap::new();
    address.insert("street".to_string(), street.unwrap_or(NOT_AVAILABLE).to_string());
    address.insert("city".to_string(), city.unwrap_or(NOT_AVAILABLE).to_string());
    address.insert(
        "postcode".to_string(),
        element
            .tag("addr:postcode")
            .unwrap_or(NOT_AVAILABLE)
            .to_string(),
    );

    let parts: Vec<&str> = [street, city, country].into_iter().flatten().collect();
    let full_address = if parts.is_empty() {
        ADDRESS_UNAVAILABLE.to_string()
    } else {
        parts.join(", ")
    };

    let element_type = if element.element_type.is_empty() {
        "node"
    } else {
        element.element_type.as_str()
    };

    Some(RestaurantRecord {
        id: RestaurantSource::Overpass.record_id(element.id),
        source: RestaurantSource::Overpass,
        name,
        display_name,
        kind: element.tag("amenity").unwrap_or(DEFAULT_KIND).to_string(),
        cuisine,
        lat,
        lon,
        address,
        full_address,
        phone: element
            .tag("phone")
            .or_else(|| element.tag("contact:phone"))
            .unwrap_or(DEFAULT_PHONE)
            .to_string(),
        website: element
            .tag("website")
            .or_else(|| element.tag("contact:website"))
            .map(str::to_string),
        opening_hours: element
            .tag("opening_hours")
            .unwrap_or(DEFAULT_OPENING_HOURS)
            .to_string(),
        osm_url: osm_element_url(element_type, element.id),
    })
}

/// Formats a Nominatim place.
///
/// The short name is the first comma-separated segment of `display_name`,
/// falling back to the place's `name` and then to `"Restaurant"`.
#[must_use]
pub fn format_nominatim_place(place: &NominatimPlace) -> RestaurantRecord {
    let name = short_name(place);

    let cuisine =
        cuisine_or_heuristic(place.extratag("cuisine").as_deref(), &place.display_name);

    let osm_url = match (place.osm_type.as_deref(), place.osm_id) {
        (Some(osm_type), Some(osm_id)) => osm_element_url(osm_type, osm_id),
        _ => osm_search_url(&place.display_name),
    };

    RestaurantRecord {
        id: RestaurantSource::Nominatim.record_id(place.place_id),
        source: RestaurantSource::Nominatim,
        name,
        display_name: place.display_name.clone(),
        kind: place
            .kind
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or(DEFAULT_KIND)
            .to_string(),
        cuisine,
        lat: parse_coordinate(&place.lat),
        lon: parse_coordinate(&place.lon),
        address: place.address_map(),
        full_address: place.display_name.clone(),
        phone: place
            .extratag("phone")
            .unwrap_or_else(|| DEFAULT_PHONE.to_string()),
        website: place.extratag("website"),
        opening_hours: place
            .extratag("opening_hours")
            .unwrap_or_else(|| DEFAULT_OPENING_HOURS.to_string()),
        osm_url,
    }
}

fn short_name(place: &NominatimPlace) -> String {
    let first_segment = place.display_name.split(',').next().unwrap_or("").trim();
    if !first_segment.is_empty() {
        return first_segment.to_string();
    }
    place
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Restaurant")
        .to_string()
}

/// The tagged cuisine when present; otherwise `"Pizza"` if `text` mentions
/// pizza, else `"Not specified"`.
fn cuisine_or_heuristic(tagged: Option<&str>, text: &str) -> String {
    match tagged {
        Some(cuisine) => cuisine.to_string(),
        None if text.to_lowercase().contains("pizza") => PIZZA_CUISINE.to_string(),
        None => DEFAULT_CUISINE.to_string(),
    }
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
#[path = "format_test.rs"]
mod tests;
