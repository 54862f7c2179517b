//! Integration tests for `RestaurantSearch` against mocked providers.
//!
//! Overpass and Nominatim each get their own `wiremock` server so a test
//! can fail one provider while the other answers normally.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use rrv_core::RestaurantSource;
use rrv_search::{RestaurantSearch, SearchConfig};

const TEST_UA: &str = "rrv-test/0.1";

/// Matches an Overpass request whose `data` parameter contains a fragment.
struct OverpassDataContains(&'static str);

impl Match for OverpassDataContains {
    fn matches(&self, request: &Request) -> bool {
        request
            .url
            .query_pairs()
            .any(|(k, v)| k == "data" && v.contains(self.0))
    }
}

fn config(overpass: &MockServer, nominatim: &MockServer) -> SearchConfig {
    SearchConfig {
        overpass_url: format!("{}/api/interpreter", overpass.uri()),
        nominatim_url: nominatim.uri(),
        user_agent: TEST_UA.to_string(),
        timeout_secs: 5,
        ..SearchConfig::default()
    }
}

fn search(overpass: &MockServer, nominatim: &MockServer) -> RestaurantSearch {
    RestaurantSearch::new(&config(overpass, nominatim)).expect("failed to build RestaurantSearch")
}

fn overpass_node(id: i64, name: &str, amenity: &str, lat: f64, lon: f64) -> serde_json::Value {
    json!({
        "type": "node",
        "id": id,
        "lat": lat,
        "lon": lon,
        "tags": { "name": name, "amenity": amenity }
    })
}

fn nominatim_place(place_id: i64, display_name: &str, kind: &str) -> serde_json::Value {
    json!({
        "place_id": place_id,
        "display_name": display_name,
        "lat": "-29.3151",
        "lon": "27.4869",
        "class": "amenity",
        "type": kind,
        "osm_type": "node",
        "osm_id": place_id * 10,
        "address": { "road": "Kingsway", "city": "Maseru" },
        "extratags": {}
    })
}

async fn mount_overpass(server: &MockServer, elements: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "elements": elements })))
        .mount(server)
        .await;
}

async fn mount_nominatim(server: &MockServer, places: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(places))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Blank terms
// ---------------------------------------------------------------------------

#[tokio::test]
async fn blank_term_returns_empty_without_network_calls() {
    let overpass = MockServer::start().await;
    let nominatim = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&overpass)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&nominatim)
        .await;

    let client = search(&overpass, &nominatim);
    assert!(client.search("", 10).await.is_empty());
    assert!(client.search("   \t", 10).await.is_empty());
}

// ---------------------------------------------------------------------------
// Provider failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overpass_500_still_returns_nominatim_results() {
    let overpass = MockServer::start().await;
    let nominatim = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&overpass)
        .await;
    mount_nominatim(
        &nominatim,
        json!([nominatim_place(1, "Cafe Mojito, Kingsway, Maseru, Lesotho", "cafe")]),
    )
    .await;

    let results = search(&overpass, &nominatim).search("mojito", 10).await;

    assert_eq!(results.len(), 1, "expected Nominatim result, got: {results:?}");
    assert_eq!(results[0].name, "Cafe Mojito");
    assert_eq!(results[0].source, RestaurantSource::Nominatim);
    assert_eq!(results[0].full_address, "Cafe Mojito, Kingsway, Maseru, Lesotho");
}

#[tokio::test]
async fn both_providers_failing_yields_empty_list() {
    let overpass = MockServer::start().await;
    let nominatim = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&overpass)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&nominatim)
        .await;

    let results = search(&overpass, &nominatim).search("pizza", 10).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn empty_overpass_response_keeps_nominatim_contribution() {
    let overpass = MockServer::start().await;
    let nominatim = MockServer::start().await;

    mount_overpass(&overpass, json!([])).await;
    mount_nominatim(
        &nominatim,
        json!([nominatim_place(2, "Ouh La La, Kingsway, Maseru", "cafe")]),
    )
    .await;

    let results = search(&overpass, &nominatim).search("ouh la la", 10).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "nom-2");
}

#[tokio::test]
async fn failing_nominatim_variant_is_skipped() {
    let overpass = MockServer::start().await;
    let nominatim = MockServer::start().await;

    mount_overpass(&overpass, json!([])).await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "lancers restaurant"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&nominatim)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "lancers food"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            nominatim_place(3, "Lancers Inn, Kingsway, Maseru", "restaurant"),
        ])))
        .expect(1)
        .mount(&nominatim)
        .await;
    mount_nominatim(&nominatim, json!([])).await;

    let results = search(&overpass, &nominatim).search("Lancers", 10).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Lancers Inn");
}

// ---------------------------------------------------------------------------
// Request shape
// ---------------------------------------------------------------------------

#[tokio::test]
async fn requests_carry_user_agent_and_expected_params() {
    let overpass = MockServer::start().await;
    let nominatim = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/interpreter"))
        .and(header("user-agent", TEST_UA))
        .and(OverpassDataContains("(around:200000,-29.5,28.5)"))
        .and(OverpassDataContains("out center 15;"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "elements": [] })))
        .expect(1)
        .mount(&overpass)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(header("user-agent", TEST_UA))
        .and(query_param("format", "json"))
        .and(query_param("limit", "50"))
        .and(query_param("addressdetails", "1"))
        .and(query_param("extratags", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(4)
        .mount(&nominatim)
        .await;

    let results = search(&overpass, &nominatim).search("sushi", 3).await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn nominatim_stops_once_enough_results_collected() {
    let overpass = MockServer::start().await;
    let nominatim = MockServer::start().await;

    mount_overpass(&overpass, json!([])).await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "maseru restaurant"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            nominatim_place(10, "Sky Restaurant, Maseru", "restaurant"),
            nominatim_place(11, "Rendezvous, Maseru", "restaurant"),
        ])))
        .expect(1)
        .mount(&nominatim)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&nominatim)
        .await;

    let results = search(&overpass, &nominatim).search("maseru", 1).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Sky Restaurant");
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overpass_relevance_filter_keeps_pizza_places() {
    let overpass = MockServer::start().await;
    let nominatim = MockServer::start().await;

    mount_overpass(
        &overpass,
        json!([
            overpass_node(1, "Pizza Hut", "fast_food", -29.31, 27.48),
            overpass_node(2, "Ouh La La", "cafe", -29.32, 27.49),
        ]),
    )
    .await;
    mount_nominatim(&nominatim, json!([])).await;

    let results = search(&overpass, &nominatim).search("pizza", 10).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Pizza Hut");
    assert_eq!(results[0].cuisine, "Pizza");
    assert_eq!(results[0].source, RestaurantSource::Overpass);
}

#[tokio::test]
async fn duplicates_across_providers_keep_overpass_first() {
    let overpass = MockServer::start().await;
    let nominatim = MockServer::start().await;

    mount_overpass(
        &overpass,
        json!([overpass_node(7, "Cafe Mojito", "cafe", -29.3151, 27.4869)]),
    )
    .await;
    mount_nominatim(
        &nominatim,
        json!([nominatim_place(8, "Cafe Mojito, Kingsway, Maseru", "cafe")]),
    )
    .await;

    let results = search(&overpass, &nominatim).search("mojito", 10).await;
    assert_eq!(results.len(), 1, "expected duplicate collapsed, got: {results:?}");
    assert_eq!(results[0].id, "osm-7");
}

#[tokio::test]
async fn results_are_truncated_to_limit() {
    let overpass = MockServer::start().await;
    let nominatim = MockServer::start().await;

    let elements: Vec<serde_json::Value> = (0u8..6)
        .map(|i| {
            overpass_node(
                100 + i64::from(i),
                &format!("Pizza Place {i}"),
                "restaurant",
                -29.3 - f64::from(i) * 0.01,
                27.5,
            )
        })
        .collect();
    mount_overpass(&overpass, json!(elements)).await;
    mount_nominatim(&nominatim, json!([])).await;

    let results = search(&overpass, &nominatim).search("pizza", 4).await;
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].name, "Pizza Place 0");
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lookup_keeps_caller_id() {
    let overpass = MockServer::start().await;
    let nominatim = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lookup"))
        .and(query_param("osm_ids", "N123"))
        .and(query_param("format", "json"))
        .and(query_param("addressdetails", "1"))
        .and(query_param("extratags", "1"))
        .and(header("user-agent", TEST_UA))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            nominatim_place(555, "Sky Restaurant, Kingsway, Maseru", "restaurant"),
        ])))
        .expect(1)
        .mount(&nominatim)
        .await;

    let record = search(&overpass, &nominatim)
        .lookup("osm-123")
        .await
        .expect("lookup should find the place");
    assert_eq!(record.id, "osm-123");
    assert_eq!(record.name, "Sky Restaurant");
}

#[tokio::test]
async fn lookup_returns_none_on_empty_or_failed_response() {
    let overpass = MockServer::start().await;
    let nominatim = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lookup"))
        .and(query_param("osm_ids", "N1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&nominatim)
        .await;
    Mock::given(method("GET"))
        .and(path("/lookup"))
        .and(query_param("osm_ids", "N2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&nominatim)
        .await;

    let client = search(&overpass, &nominatim);
    assert!(client.lookup("nom-1").await.is_none());
    assert!(client.lookup("osm-2").await.is_none());
    assert!(client.lookup("osm-not-a-number").await.is_none());
}
