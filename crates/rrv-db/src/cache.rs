//! Restaurant details remembered from earlier searches and lookups.
//!
//! Reviews only store a restaurant id, so pages that list a user's reviews
//! resolve names through this cache. Entries are never evicted.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use rrv_core::RestaurantRecord;

/// Storage key for a restaurant id: `restaurant_<id>`.
#[must_use]
pub fn cache_key(restaurant_id: &str) -> String {
    format!("restaurant_{restaurant_id}")
}

pub trait RestaurantCache: Send + Sync {
    fn get(&self, restaurant_id: &str) -> Option<RestaurantRecord>;

    /// Stores `record` under its own id, replacing any earlier entry.
    fn put(&self, record: RestaurantRecord);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct MemoryRestaurantCache {
    entries: RwLock<HashMap<String, RestaurantRecord>>,
}

impl MemoryRestaurantCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RestaurantCache for MemoryRestaurantCache {
    fn get(&self, restaurant_id: &str) -> Option<RestaurantRecord> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&cache_key(restaurant_id))
            .cloned()
    }

    fn put(&self, record: RestaurantRecord) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cache_key(&record.id), record);
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_scheme_is_prefixed() {
        assert_eq!(cache_key("osm-42"), "restaurant_osm-42");
    }

    #[test]
    fn put_then_get_and_replace() {
        let cache = MemoryRestaurantCache::new();
        assert!(cache.is_empty());
        assert!(cache.get("osm-1").is_none());

        let mut record = RestaurantRecord::placeholder("osm-1");
        record.name = "Sky Restaurant".to_string();
        cache.put(record.clone());
        assert_eq!(cache.get("osm-1"), Some(record.clone()));

        record.name = "Sky Restaurant & Bar".to_string();
        cache.put(record);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get("osm-1").map(|r| r.name),
            Some("Sky Restaurant & Bar".to_string())
        );
    }
}
