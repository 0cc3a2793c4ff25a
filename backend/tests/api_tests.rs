//! HTTP API tests
//!
//! Requests go through the full router with in-memory storage. The provider
//! is either stubbed or an Open-Meteo client pointed at a mock server.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use common::{forecast_for, three_cities, track, FlakyStorage, Reply, StubProvider};
use forecast_tracker_backend::{
    create_app,
    external::{ForecastProvider, OpenMeteoClient},
    storage::{MemoryStorage, Storage},
    AppState, Config,
};
use serde_json::{json, Value};
use shared::Coordinates;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app(storage: Arc<dyn Storage>, provider: Arc<dyn ForecastProvider>) -> Router {
    app_with(storage, provider, Config::default())
}

fn app_with(storage: Arc<dyn Storage>, provider: Arc<dyn ForecastProvider>, config: Config) -> Router {
    create_app(AppState::new(storage, provider, config))
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_ok() {
    let app = app(Arc::new(MemoryStorage::new()), Arc::new(StubProvider::new()));

    let (status, body) = send(app, Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
    assert_eq!(body["database"], "OK");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_health_reports_storage_outage() {
    let storage = Arc::new(FlakyStorage::new());
    storage.take_down();
    let app = app(storage, Arc::new(StubProvider::new()));

    let (status, body) = send(app, Method::GET, "/api/v1/health", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "ERROR");
    assert_eq!(body["database"], "ERROR");
}

// ============================================================================
// Forecasts
// ============================================================================

#[tokio::test]
async fn test_refresh_and_read_forecasts() {
    let storage = Arc::new(MemoryStorage::new());
    let provider = Arc::new(StubProvider::new());
    for location in track(storage.as_ref(), &three_cities()).await {
        let coords = location.coordinates();
        provider.reply(coords, Reply::Forecast(forecast_for(coords, 24)));
    }
    let app = app(storage, provider);

    let (status, refreshed) = send(app.clone(), Method::PUT, "/api/v1/forecast/latest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed.as_array().unwrap().len(), 3);

    let (status, stored) = send(app, Method::GET, "/api/v1/forecast", None).await;
    assert_eq!(status, StatusCode::OK);
    let stored = stored.as_array().unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0]["hourly"]["time"].as_array().unwrap().len(), 24);
    assert_eq!(stored[0]["hourly_units"]["temperature_2m"], "°F");
}

#[tokio::test]
async fn test_refresh_with_failing_provider_is_bad_gateway() {
    let storage = Arc::new(MemoryStorage::new());
    track(storage.as_ref(), &[Coordinates::new(40.7128, -74.006)]).await;
    let app = app(storage, Arc::new(StubProvider::new()));

    let (status, body) = send(app, Method::PUT, "/api/v1/forecast/latest", None).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "FORECAST_PROVIDER_ERROR");
}

#[tokio::test]
async fn test_refresh_past_deadline_is_timeout() {
    let storage = Arc::new(MemoryStorage::new());
    let coords = Coordinates::new(40.7128, -74.006);
    track(storage.as_ref(), &[coords]).await;
    let provider = Arc::new(StubProvider::new());
    provider.reply(coords, Reply::Hang);

    let mut config = Config::default();
    config.aggregation.deadline_secs = 1;
    config.aggregation.cancel_grace_ms = 100;
    let app = app_with(storage, provider, config);

    let (status, body) = send(app, Method::PUT, "/api/v1/forecast/latest", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "AGGREGATION_TIMEOUT");
}

#[tokio::test]
async fn test_read_forecast_for_unknown_location_is_not_found() {
    let app = app(Arc::new(MemoryStorage::new()), Arc::new(StubProvider::new()));
    let uri = format!("/api/v1/forecast/{}", uuid::Uuid::new_v4());

    let (status, body) = send(app, Method::GET, &uri, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// ============================================================================
// Locations
// ============================================================================

#[tokio::test]
async fn test_create_location_then_conflict() {
    let provider = Arc::new(StubProvider::new());
    let coords = Coordinates::new(52.52, 13.405);
    provider.reply(coords, Reply::Forecast(forecast_for(coords, 24)));
    let app = app(Arc::new(MemoryStorage::new()), provider);
    let body = json!({"latitude": 52.52, "longitude": 13.405});

    let (status, created) =
        send(app.clone(), Method::POST, "/api/v1/locations", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["latitude"], 52.52);
    assert_eq!(created["forecast"]["location_id"], created["id"]);

    let (status, conflict) = send(app, Method::POST, "/api/v1/locations", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(conflict["error"]["code"], "LOCATION_CONFLICT");
    assert_eq!(conflict["error"]["location"]["id"], created["id"]);
}

#[tokio::test]
async fn test_create_location_with_invalid_coordinates() {
    let app = app(Arc::new(MemoryStorage::new()), Arc::new(StubProvider::new()));

    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/locations",
        Some(json!({"latitude": 10.0, "longitude": 200.0})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "longitude");
}

#[tokio::test]
async fn test_list_and_delete_locations() {
    let storage = Arc::new(MemoryStorage::new());
    let tracked = track(storage.as_ref(), &three_cities()).await;
    let app = app(storage, Arc::new(StubProvider::new()));

    let (status, listed) = send(app.clone(), Method::GET, "/api/v1/locations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 3);

    let uri = format!("/api/v1/locations/{}", tracked[0].id);
    let (status, _) = send(app.clone(), Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (lat, lon) = tracked[1].coordinates().to_query_pair();
    let uri = format!("/api/v1/locations?latitude={}&longitude={}", lat, lon);
    let (status, _) = send(app.clone(), Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, listed) = send(app, Method::GET, "/api/v1/locations", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_unknown_location_is_not_found() {
    let app = app(Arc::new(MemoryStorage::new()), Arc::new(StubProvider::new()));
    let uri = format!("/api/v1/locations/{}", uuid::Uuid::new_v4());

    let (status, body) = send(app, Method::DELETE, &uri, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

// ============================================================================
// Against a mocked Open-Meteo
// ============================================================================

#[tokio::test]
async fn test_create_location_against_open_meteo() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("latitude", "35.676200"))
        .and(query_param("longitude", "139.650300"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latitude": 35.7,
            "longitude": 139.6875,
            "generationtime_ms": 0.031,
            "utc_offset_seconds": 32400,
            "timezone": "Asia/Tokyo",
            "timezone_abbreviation": "JST",
            "elevation": 40.0,
            "hourly_units": {"time": "iso8601", "temperature_2m": "°F"},
            "hourly": {
                "time": ["2024-06-01T00:00", "2024-06-01T01:00"],
                "temperature_2m": [68.2, 67.9]
            }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let provider = OpenMeteoClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    let app = app(Arc::new(MemoryStorage::new()), Arc::new(provider));

    let (status, created) = send(
        app.clone(),
        Method::POST,
        "/api/v1/locations",
        Some(json!({"latitude": 35.6762, "longitude": 139.6503})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["forecast"]["timezone"], "Asia/Tokyo");

    let (status, refreshed) = send(app.clone(), Method::PUT, "/api/v1/forecast/latest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed[0]["hourly"]["temperature_2m"], json!([68.2, 67.9]));

    let uri = format!("/api/v1/forecast/{}", created["id"].as_str().unwrap());
    let (status, stored) = send(app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["utc_offset_seconds"], 32400);
    assert_eq!(stored["hourly"]["time"][1], "2024-06-01T01:00");
}
