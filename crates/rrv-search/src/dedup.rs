use std::collections::HashSet;

use rust_decimal::{Decimal, RoundingStrategy};

use rrv_core::RestaurantRecord;

/// Composite key used to collapse the same place reported twice.
///
/// Lowercased name plus coordinates rounded to four decimals (about 11 m).
/// Records without coordinates fall back to the name plus their own id.
#[must_use]
pub fn dedup_key(record: &RestaurantRecord) -> String {
    let name = record.name.to_lowercase();
    match record.coordinates() {
        Some((lat, lon)) => format!("{name}-{}-{}", fixed4(lat), fixed4(lon)),
        None => format!("{name}-{}", record.id),
    }
}

/// Four-decimal rendering with exact ties rounded away from zero.
///
/// `{:.4}` alone rounds ties to even, so `-29.03125` would render as
/// `-29.0312` while web clients keying the same place produce `-29.0313`.
fn fixed4(value: f64) -> String {
    match Decimal::from_f64_retain(value) {
        Some(exact) => {
            let rounded = exact.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero);
            format!("{rounded:.4}")
        }
        None => format!("{value:.4}"),
    }
}

/// Drops every record whose [`dedup_key`] was already seen. The first
/// occurrence wins and order is preserved.
#[must_use]
pub fn deduplicate(records: Vec<RestaurantRecord>) -> Vec<RestaurantRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| seen.insert(dedup_key(r)))
        .collect()
}
