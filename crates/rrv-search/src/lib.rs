//! Restaurant search over OpenStreetMap providers.
//!
//! Queries Overpass (fixed-radius POI query) and Nominatim (geocoder) in
//! parallel, normalises both response shapes into
//! [`rrv_core::RestaurantRecord`], filters by relevance, and collapses
//! duplicates by name and rounded coordinates.

pub mod aggregator;
pub mod dedup;
pub mod error;
pub mod format;
pub mod nominatim;
pub mod overpass;
pub mod relevance;
pub mod types;

pub use aggregator::{RestaurantSearch, DEFAULT_LIMIT};
pub use dedup::{dedup_key, deduplicate};
pub use error::SearchError;
pub use format::{format_nominatim_place, format_overpass_element};
pub use nominatim::NominatimClient;
pub use overpass::OverpassClient;
pub use relevance::{filter_by_search_term, matches_search_term};
pub use types::{NominatimPlace, OverpassElement, OverpassResponse, SearchConfig};
