use rrv_core::RestaurantRecord;

use crate::dedup::deduplicate;
use crate::error::SearchError;
use crate::nominatim::NominatimClient;
use crate::overpass::OverpassClient;
use crate::types::SearchConfig;

/// Result count used when the caller does not ask for one.
pub const DEFAULT_LIMIT: usize = 10;

/// Combined restaurant search across Overpass and Nominatim.
pub struct RestaurantSearch {
    overpass: OverpassClient,
    nominatim: NominatimClient,
}

impl RestaurantSearch {
    /// Builds both provider clients from one config.
    ///
    /// # Errors
    ///
    /// Propagates [`SearchError`] from either client constructor.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            overpass: OverpassClient::new(config)?,
            nominatim: NominatimClient::new(config)?,
        })
    }

    /// Up to `limit` deduplicated restaurants matching `term`.
    ///
    /// A blank term returns nothing without touching the network. Both
    /// providers run concurrently; Overpass results come first. A failing
    /// provider contributes nothing rather than failing the search.
    pub async fn search(&self, term: &str, limit: usize) -> Vec<RestaurantRecord> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Vec::new();
        }

        let (overpass, nominatim) = tokio::join!(
            self.overpass.search(&term, limit),
            self.nominatim.search(&term, limit),
        );
        let (overpass_count, nominatim_count) = (overpass.len(), nominatim.len());

        let mut combined = overpass;
        combined.extend(nominatim);
        let mut results = deduplicate(combined);
        results.truncate(limit);

        tracing::info!(
            term = %term,
            limit,
            overpass = overpass_count,
            nominatim = nominatim_count,
            returned = results.len(),
            "restaurant search complete"
        );
        results
    }

    /// Details for one restaurant from Nominatim. See [`NominatimClient::lookup`].
    pub async fn lookup(&self, record_id: &str) -> Option<RestaurantRecord> {
        self.nominatim.lookup(record_id).await
    }
}
