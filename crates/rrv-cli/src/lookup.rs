//! Provider lookups from the command line. Output is pretty JSON on stdout
//! so it can be piped into other tools; logs go to stderr.

use rrv_core::AppConfig;
use rrv_search::{RestaurantSearch, SearchConfig};

fn build_search(config: &AppConfig) -> anyhow::Result<RestaurantSearch> {
    RestaurantSearch::new(&SearchConfig::from_app_config(config))
        .map_err(|e| anyhow::anyhow!("failed to build search clients: {e}"))
}

pub(crate) async fn run_search(config: &AppConfig, term: &str, limit: usize) -> anyhow::Result<()> {
    let search = build_search(config)?;
    let results = search.search(term, limit.max(1)).await;

    if results.is_empty() {
        eprintln!("no restaurants found for '{term}'");
    }
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

/// Unlike the HTTP API, a miss is reported as an error instead of a
/// placeholder record.
pub(crate) async fn run_details(config: &AppConfig, id: &str) -> anyhow::Result<()> {
    let search = build_search(config)?;
    let record = search
        .lookup(id)
        .await
        .ok_or_else(|| anyhow::anyhow!("restaurant '{id}' not found"))?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
