use std::{collections::BTreeMap, net::SocketAddr, time::Duration};

use anyhow::Result;
use chrono::{FixedOffset, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nuclear_genflow::{build_client, routes, Config, OverlapPolicy};

const GENERATION_PATH: &str = "/open_api/actual_generation/v1/actual_generations_per_unit";
const FIXTURE: &str = include_str!("fixtures/generations_2022_12_01.json");

#[derive(Debug, Deserialize)]
struct Aggregates {
    start_date: String,
    end_date: String,
    record_count: usize,
    average_per_hour: BTreeMap<String, f64>,
    cumulative_per_hour: BTreeMap<String, f64>,
    sum_per_hour_per_day: BTreeMap<String, BTreeMap<String, f64>>,
}

fn config(upstream: &MockServer) -> Config {
    // ---
    Config {
        token_url: format!("{}/token/oauth/", upstream.uri()),
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        generation_url: format!("{}{}", upstream.uri(), GENERATION_PATH),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        http_timeout: Duration::from_secs(5),
        overlap: OverlapPolicy::Preserve,
        default_start: NaiveDate::from_ymd_opt(2022, 12, 1).unwrap(),
        default_end: NaiveDate::from_ymd_opt(2022, 12, 10).unwrap(),
        utc_offset: FixedOffset::east_opt(3600).unwrap(),
        max_range_days: 366,
    }
}

/// Serve the router on an ephemeral port and return its base URL.
async fn spawn_app(upstream: &MockServer) -> Result<String> {
    // ---
    let cfg = config(upstream);
    let client = build_client(&cfg)?;
    let app = routes::router(client, cfg);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    Ok(format!("http://{}", addr))
}

async fn mount_token(upstream: &MockServer) {
    // ---
    Mock::given(method("POST"))
        .and(path("/token/oauth/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "integration-token",
            "expires_in": 7200,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(upstream)
        .await;
}

async fn mount_generations(upstream: &MockServer, body: Value) {
    // ---
    Mock::given(method("GET"))
        .and(path(GENERATION_PATH))
        .and(header("Authorization", "Bearer integration-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(upstream)
        .await;
}

fn fixture() -> Value {
    serde_json::from_str(FIXTURE).unwrap()
}

#[tokio::test]
async fn health_endpoint_is_ok() -> Result<()> {
    // ---
    let upstream = MockServer::start().await;
    let base = spawn_app(&upstream).await?;

    let body: Value = Client::new().get(format!("{}/health", base)).send().await?.json().await?;
    assert_eq!(body, json!({ "status": "ok" }));
    Ok(())
}

#[tokio::test]
async fn data_endpoint_returns_upstream_records() -> Result<()> {
    // ---
    let upstream = MockServer::start().await;
    mount_token(&upstream).await;
    Mock::given(method("GET"))
        .and(query_param("start_date", "2022-12-01T00:00:00+01:00"))
        .and(query_param("end_date", "2022-12-02T00:00:00+01:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture()))
        .expect(1)
        .mount(&upstream)
        .await;
    let base = spawn_app(&upstream).await?;

    let url = format!("{}/data?start_date=2022-12-01&end_date=2022-12-01", base);
    let response = Client::new().get(&url).send().await?;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await?;
    let records = body["actual_generations_per_unit"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["unit"]["name"], "BELLEVILLE 1");
    assert_eq!(records[0]["values"][0]["value"], 1287.5);
    Ok(())
}

#[tokio::test]
async fn data_endpoint_defaults_to_ten_day_window_in_two_chunks() -> Result<()> {
    // ---
    let upstream = MockServer::start().await;
    mount_token(&upstream).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(fixture()))
        .expect(2)
        .mount(&upstream)
        .await;
    let base = spawn_app(&upstream).await?;

    let body: Value = Client::new().get(format!("{}/data", base)).send().await?.json().await?;

    // Overlap duplicates are kept
    assert_eq!(body["actual_generations_per_unit"].as_array().unwrap().len(), 4);
    Ok(())
}

#[tokio::test]
async fn aggregates_endpoint_sums_fixture_day() -> Result<()> {
    // ---
    let upstream = MockServer::start().await;
    mount_token(&upstream).await;
    mount_generations(&upstream, fixture()).await;
    let base = spawn_app(&upstream).await?;

    let url = format!("{}/api/aggregates?start_date=2022-12-01&end_date=2022-12-01", base);
    let views: Aggregates = Client::new().get(&url).send().await?.json().await?;

    assert_eq!(views.start_date, "2022-12-01T00:00:00+01:00");
    assert_eq!(views.end_date, "2022-12-02T00:00:00+01:00");
    assert_eq!(views.record_count, 2);
    assert_eq!(views.average_per_hour.len(), 24);
    assert_eq!(views.cumulative_per_hour["Hour 00"], 1287.5);
    assert_eq!(views.cumulative_per_hour["Hour 01"], 2576.0);

    let day = &views.sum_per_hour_per_day["2022-12-01"];
    assert_eq!(day.len(), 24);
    assert_eq!(day["Hour 00"], 1287.5);
    assert_eq!(day["Hour 01"], 1288.5);
    assert_eq!(day["Hour 23"], 1289.0);
    Ok(())
}

#[tokio::test]
async fn dashboard_renders_tables() -> Result<()> {
    // ---
    let upstream = MockServer::start().await;
    mount_token(&upstream).await;
    mount_generations(&upstream, fixture()).await;
    let base = spawn_app(&upstream).await?;

    let url = format!("{}/?start_date=2022-12-01&end_date=2022-12-01", base);
    let response = Client::new().get(&url).send().await?;
    assert_eq!(response.status(), StatusCode::OK);

    let html = response.text().await?;
    assert!(html.contains("Average production per hour"));
    assert!(html.contains("2022-12-01"));
    assert!(html.contains("Hour 00"));
    assert!(html.contains("1287.5"));
    assert!(html.contains("Cumulative"));
    assert!(html.contains("2576.00"));
    Ok(())
}

#[tokio::test]
async fn dashboard_shows_error_page_for_empty_range() -> Result<()> {
    // ---
    let upstream = MockServer::start().await;
    mount_token(&upstream).await;
    mount_generations(&upstream, json!({ "actual_generations_per_unit": [] })).await;
    let base = spawn_app(&upstream).await?;

    let url = format!("{}/?start_date=2022-12-01&end_date=2022-12-01", base);
    let response = Client::new().get(&url).send().await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let html = response.text().await?;
    assert!(html.contains("No data"));
    assert!(!html.contains("Average production per hour"));
    Ok(())
}

#[tokio::test]
async fn upstream_failure_is_bad_gateway() -> Result<()> {
    // ---
    let upstream = MockServer::start().await;
    mount_token(&upstream).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&upstream)
        .await;
    let base = spawn_app(&upstream).await?;

    let url = format!("{}/data?start_date=2022-12-01&end_date=2022-12-01", base);
    let response = Client::new().get(&url).send().await?;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body: Value = response.json().await?;
    assert!(body["error"].as_str().unwrap().contains("generation request"));
    Ok(())
}

#[tokio::test]
async fn invalid_range_is_bad_request() -> Result<()> {
    // ---
    let upstream = MockServer::start().await;
    let base = spawn_app(&upstream).await?;

    let url = format!("{}/api/aggregates?start_date=2022-12-10&end_date=2022-12-01", base);
    let response = Client::new().get(&url).send().await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn oversized_range_is_bad_request() -> Result<()> {
    // ---
    let upstream = MockServer::start().await;
    let base = spawn_app(&upstream).await?;
    let client = Client::new();

    for query in [
        "start_date=0001-01-01&end_date=9999-12-31",
        "start_date=%2B262142-12-31&end_date=%2B262142-12-31",
    ] {
        let url = format!("{}/api/aggregates?{}", base, query);
        let response = client.get(&url).send().await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{query}");
    }

    // Nothing reached the upstream
    assert!(upstream.received_requests().await.unwrap_or_default().is_empty());
    Ok(())
}
