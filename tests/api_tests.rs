use std::sync::Arc;

use rocket::http::{ContentType, Status};
use rocket::local::asynchronous::Client;

use probewatch::db::{SqliteStore, Store};
use probewatch::email::{EmailTransport, SmtpEmailTransport};
use probewatch::engine::Engine;

async fn test_client() -> Client {
    let db_path = format!("/tmp/probewatch_test_{}.db", uuid::Uuid::new_v4());
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(&db_path).expect("db init failed"));
    let transport: Arc<dyn EmailTransport> = Arc::new(SmtpEmailTransport::from_env());
    let engine = Arc::new(Engine::new(store.clone(), transport, std::time::Duration::from_secs(300)));
    let scheduler = engine.scheduler();

    let rocket = rocket::build()
        .manage(store)
        .manage(scheduler)
        .manage(engine)
        .mount(
            "/api",
            rocket::routes![
                probewatch::routes::health,
                probewatch::routes::create_monitor,
                probewatch::routes::list_monitors,
                probewatch::routes::get_monitor,
                probewatch::routes::delete_monitor,
                probewatch::routes::check_monitor,
                probewatch::routes::monitor_history,
                probewatch::routes::monitor_logs,
                probewatch::routes::dashboard_stats,
                probewatch::routes::create_alert_settings,
                probewatch::routes::get_alert_settings,
                probewatch::routes::delete_alert_settings,
            ],
        )
        .register(
            "/",
            rocket::catchers![
                probewatch::catchers::bad_request,
                probewatch::catchers::not_found,
                probewatch::catchers::unprocessable_entity,
                probewatch::catchers::internal_error,
            ],
        );

    Client::tracked(rocket).await.expect("valid rocket instance")
}

async fn create_http_monitor(client: &Client, url: &str) -> serde_json::Value {
    let resp = client
        .post("/api/monitors")
        .header(ContentType::JSON)
        .body(format!(r#"{{"name": "demo", "kind": "http", "url": "{url}", "interval_seconds": 60}}"#))
        .dispatch()
        .await;
    assert_eq!(resp.status(), Status::Ok);
    resp.into_json().await.unwrap()
}

#[rocket::async_test]
async fn health_reports_ok() {
    let client = test_client().await;
    let resp = client.get("/api/").dispatch().await;
    assert_eq!(resp.status(), Status::Ok);
    let body: serde_json::Value = resp.into_json().await.unwrap();
    assert_eq!(body["service"], "probewatch");
    assert_eq!(body["status"], "ok");
}

#[rocket::async_test]
async fn create_http_monitor_round_trips() {
    let client = test_client().await;
    let body = create_http_monitor(&client, "https://example.com/health").await;
    assert_eq!(body["name"], "demo");
    assert_eq!(body["kind"], "http");
    assert_eq!(body["status"], "unknown");
    assert_eq!(body["interval_seconds"], 60);
    assert!(body["id"].as_str().is_some());
}

#[rocket::async_test]
async fn create_monitor_rejects_empty_name() {
    let client = test_client().await;
    let resp = client
        .post("/api/monitors")
        .header(ContentType::JSON)
        .body(r#"{"name": "", "kind": "http", "url": "https://example.com"}"#)
        .dispatch()
        .await;
    assert_eq!(resp.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn create_monitor_rejects_unknown_kind() {
    let client = test_client().await;
    let resp = client
        .post("/api/monitors")
        .header(ContentType::JSON)
        .body(r#"{"name": "x", "kind": "carrier-pigeon"}"#)
        .dispatch()
        .await;
    assert_eq!(resp.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn create_monitor_rejects_http_without_url() {
    let client = test_client().await;
    let resp = client
        .post("/api/monitors")
        .header(ContentType::JSON)
        .body(r#"{"name": "x", "kind": "http"}"#)
        .dispatch()
        .await;
    assert_eq!(resp.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn create_monitor_rejects_port_without_port_number() {
    let client = test_client().await;
    let resp = client
        .post("/api/monitors")
        .header(ContentType::JSON)
        .body(r#"{"name": "x", "kind": "port", "port_host": "example.com"}"#)
        .dispatch()
        .await;
    assert_eq!(resp.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn create_monitor_rejects_keyword_without_text() {
    let client = test_client().await;
    let resp = client
        .post("/api/monitors")
        .header(ContentType::JSON)
        .body(r#"{"name": "x", "kind": "keyword", "keyword_url": "https://example.com"}"#)
        .dispatch()
        .await;
    assert_eq!(resp.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn get_monitor_not_found() {
    let client = test_client().await;
    let resp = client.get("/api/monitors/does-not-exist").dispatch().await;
    assert_eq!(resp.status(), Status::NotFound);
}

#[rocket::async_test]
async fn list_monitors_returns_created_ones() {
    let client = test_client().await;
    create_http_monitor(&client, "https://a.example.com").await;
    create_http_monitor(&client, "https://b.example.com").await;

    let resp = client.get("/api/monitors").dispatch().await;
    assert_eq!(resp.status(), Status::Ok);
    let body: Vec<serde_json::Value> = resp.into_json().await.unwrap();
    assert_eq!(body.len(), 2);
}

#[rocket::async_test]
async fn delete_monitor_removes_it() {
    let client = test_client().await;
    let created = create_http_monitor(&client, "https://example.com").await;
    let id = created["id"].as_str().unwrap();

    let resp = client.delete(format!("/api/monitors/{id}")).dispatch().await;
    assert_eq!(resp.status(), Status::Ok);

    let resp = client.get(format!("/api/monitors/{id}")).dispatch().await;
    assert_eq!(resp.status(), Status::NotFound);
}

#[rocket::async_test]
async fn delete_monitor_not_found() {
    let client = test_client().await;
    let resp = client.delete("/api/monitors/does-not-exist").dispatch().await;
    assert_eq!(resp.status(), Status::NotFound);
}

/// End-to-end through the real HTTP probe against a local wiremock
/// server, exercising the same pipeline a scheduler tick would run
/// (§4.3) via the manual-check route.
#[rocket::async_test]
async fn manual_check_runs_pipeline_and_updates_status() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = test_client().await;
    let created = create_http_monitor(&client, &server.uri()).await;
    let id = created["id"].as_str().unwrap();

    let resp = client.post(format!("/api/monitors/{id}/check")).dispatch().await;
    assert_eq!(resp.status(), Status::Ok);
    let body: serde_json::Value = resp.into_json().await.unwrap();
    assert_eq!(body["status"], "up");
    assert!(body["last_checked_at"].as_str().is_some());
}

#[rocket::async_test]
async fn manual_check_reports_down_on_server_error() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client().await;
    let created = create_http_monitor(&client, &server.uri()).await;
    let id = created["id"].as_str().unwrap();

    let resp = client.post(format!("/api/monitors/{id}/check")).dispatch().await;
    assert_eq!(resp.status(), Status::Ok);
    let body: serde_json::Value = resp.into_json().await.unwrap();
    assert_eq!(body["status"], "down");
}

#[rocket::async_test]
async fn manual_check_not_found() {
    let client = test_client().await;
    let resp = client.post("/api/monitors/does-not-exist/check").dispatch().await;
    assert_eq!(resp.status(), Status::NotFound);
}

#[rocket::async_test]
async fn dashboard_stats_reflect_monitor_counts() {
    let client = test_client().await;
    create_http_monitor(&client, "https://a.example.com").await;
    create_http_monitor(&client, "https://b.example.com").await;

    let resp = client.get("/api/dashboard/stats").dispatch().await;
    assert_eq!(resp.status(), Status::Ok);
    let body: serde_json::Value = resp.into_json().await.unwrap();
    assert_eq!(body["total"], 2);
    assert_eq!(body["up"], 0);
    assert_eq!(body["down"], 0);
}

#[rocket::async_test]
async fn alert_settings_lifecycle() {
    let client = test_client().await;
    let created = create_http_monitor(&client, "https://example.com").await;
    let id = created["id"].as_str().unwrap();

    let resp = client
        .post("/api/alerts")
        .header(ContentType::JSON)
        .body(format!(r#"{{"monitor_id": "{id}", "email": "ops@example.com"}}"#))
        .dispatch()
        .await;
    assert_eq!(resp.status(), Status::Ok);
    let settings: serde_json::Value = resp.into_json().await.unwrap();
    assert_eq!(settings["email"], "ops@example.com");
    assert_eq!(settings["alert_on_down"], true);

    // A second registration for the same monitor is rejected (I4).
    let resp = client
        .post("/api/alerts")
        .header(ContentType::JSON)
        .body(format!(r#"{{"monitor_id": "{id}", "email": "other@example.com"}}"#))
        .dispatch()
        .await;
    assert_eq!(resp.status(), Status::BadRequest);

    let resp = client.get(format!("/api/alerts/{id}")).dispatch().await;
    assert_eq!(resp.status(), Status::Ok);

    let resp = client.delete(format!("/api/alerts/{id}")).dispatch().await;
    assert_eq!(resp.status(), Status::Ok);

    let resp = client.get(format!("/api/alerts/{id}")).dispatch().await;
    assert_eq!(resp.status(), Status::NotFound);
}

#[rocket::async_test]
async fn alert_settings_rejects_blank_email() {
    let client = test_client().await;
    let created = create_http_monitor(&client, "https://example.com").await;
    let id = created["id"].as_str().unwrap();

    let resp = client
        .post("/api/alerts")
        .header(ContentType::JSON)
        .body(format!(r#"{{"monitor_id": "{id}", "email": ""}}"#))
        .dispatch()
        .await;
    assert_eq!(resp.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn alert_settings_not_found_before_creation() {
    let client = test_client().await;
    let created = create_http_monitor(&client, "https://example.com").await;
    let id = created["id"].as_str().unwrap();

    let resp = client.get(format!("/api/alerts/{id}")).dispatch().await;
    assert_eq!(resp.status(), Status::NotFound);
}

#[rocket::async_test]
async fn monitor_logs_and_history_are_empty_before_any_check() {
    let client = test_client().await;
    let created = create_http_monitor(&client, "https://example.com").await;
    let id = created["id"].as_str().unwrap();

    let resp = client.get(format!("/api/monitors/{id}/logs")).dispatch().await;
    assert_eq!(resp.status(), Status::Ok);
    let logs: Vec<serde_json::Value> = resp.into_json().await.unwrap();
    assert!(logs.is_empty());

    let resp = client.get(format!("/api/monitors/{id}/history")).dispatch().await;
    assert_eq!(resp.status(), Status::Ok);
    let buckets: Vec<serde_json::Value> = resp.into_json().await.unwrap();
    assert!(buckets.is_empty());
}

#[rocket::async_test]
async fn monitor_logs_populated_after_manual_check() {
    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = test_client().await;
    let created = create_http_monitor(&client, &server.uri()).await;
    let id = created["id"].as_str().unwrap();

    client.post(format!("/api/monitors/{id}/check")).dispatch().await;

    let resp = client.get(format!("/api/monitors/{id}/logs")).dispatch().await;
    let logs: Vec<serde_json::Value> = resp.into_json().await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["status"], "up");
}

#[rocket::async_test]
async fn unknown_route_yields_not_found_catcher() {
    let client = test_client().await;
    let resp = client.get("/api/nope").dispatch().await;
    assert_eq!(resp.status(), Status::NotFound);
}
