//! Keeps Overpass results that actually relate to the search term.
//!
//! The Overpass query is a fixed radius around the configured centre, so it
//! returns every eatery in range regardless of the term.

use rrv_core::RestaurantRecord;

/// Whether `record` is relevant to `term`.
///
/// `term` is compared case-insensitively against name, cuisine, type and
/// display name. The generic terms `restaurant`, `cafe` and `pizza` also
/// match on type or cuisine.
#[must_use]
pub fn matches_search_term(record: &RestaurantRecord, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return true;
    }

    let name = record.name.to_lowercase();
    let cuisine = record.cuisine.to_lowercase();
    let kind = record.kind.to_lowercase();

    if name.contains(&term)
        || cuisine.contains(&term)
        || kind.contains(&term)
        || record.display_name.to_lowercase().contains(&term)
    {
        return true;
    }

    match term.as_str() {
        "restaurant" => kind == "restaurant",
        "cafe" => kind == "cafe",
        "pizza" => cuisine.contains("pizza") || name.contains("pizza"),
        _ => false,
    }
}

/// Retains records matching `term`, preserving order.
#[must_use]
pub fn filter_by_search_term(records: Vec<RestaurantRecord>, term: &str) -> Vec<RestaurantRecord> {
    records
        .into_iter()
        .filter(|r| matches_search_term(r, term))
        .collect()
}
