//! Integration tests for `NominatimGeocoder` against a local mock server.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use listing_wizard::error::GeocodingError;
use listing_wizard::geocoding::{Geocoder, NominatimGeocoder};

fn test_geocoder(server: &MockServer) -> NominatimGeocoder {
    NominatimGeocoder::new(server.uri(), 5, "listing-wizard-test/0.1")
        .expect("failed to build test geocoder")
}

#[tokio::test]
async fn resolve_returns_first_match() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Calle Mayor 1, Madrid, Spain"))
        .and(query_param("format", "json"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": "40.4168", "lon": "-3.7038", "display_name": "Calle Mayor, Madrid"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let coordinates = test_geocoder(&server)
        .resolve("Calle Mayor 1, Madrid, Spain")
        .await
        .expect("expected a match");

    assert!((coordinates.latitude - 40.4168).abs() < 1e-9);
    assert!((coordinates.longitude + 3.7038).abs() < 1e-9);
}

#[tokio::test]
async fn empty_result_is_no_match() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = test_geocoder(&server).resolve("Nowhere").await.unwrap_err();
    assert!(
        matches!(err, GeocodingError::NoMatch { ref address } if address == "Nowhere"),
        "expected NoMatch, got: {err:?}"
    );
}

#[tokio::test]
async fn server_error_maps_to_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = test_geocoder(&server).resolve("Madrid").await.unwrap_err();
    assert!(
        matches!(err, GeocodingError::UnexpectedStatus { status: 503 }),
        "expected UnexpectedStatus(503), got: {err:?}"
    );
}

#[tokio::test]
async fn unparseable_or_out_of_range_coordinates_are_invalid() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "garbled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": "north", "lon": "-3.7"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "off-planet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": "95.0", "lon": "10.0"}
        ])))
        .mount(&server)
        .await;

    let geocoder = test_geocoder(&server);
    for address in ["garbled", "off-planet"] {
        let err = geocoder.resolve(address).await.unwrap_err();
        assert!(
            matches!(err, GeocodingError::InvalidResponse { .. }),
            "{address}: expected InvalidResponse, got: {err:?}"
        );
    }
}
