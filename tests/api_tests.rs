use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use callboard::config::{AuthStrategy, Config};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const TEST_PASSWORD: &str = "test-password";

fn test_config() -> Config {
    let mut config = Config::default();
    // A single pooled connection keeps the in-memory database shared.
    config.database.path = "sqlite::memory:".to_string();
    config.database.max_connections = 1;
    config.auth.jwt_secret = "test-secret".to_string();
    config.auth.admin_password = TEST_PASSWORD.to_string();
    config
}

async fn spawn_app() -> Router {
    spawn_app_with(test_config()).await
}

async fn spawn_app_with(config: Config) -> Router {
    let state = callboard::api::create_app_state(config)
        .await
        .expect("Failed to create app state");
    callboard::api::router(state)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn login(app: &Router) -> String {
    let (status, body) = send(
        app,
        request("POST", "/login", None, Some(json!({"password": TEST_PASSWORD}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn add_number(app: &Router, token: &str, payload: Value) -> Value {
    let (status, body) = send(app, request("POST", "/add-number", Some(token), Some(payload))).await;
    assert_eq!(status, StatusCode::OK, "add-number failed: {body}");
    body["data"].clone()
}

#[tokio::test]
async fn login_validates_and_issues_tokens() {
    let app = spawn_app().await;

    let (status, _) = send(&app, request("POST", "/login", None, Some(json!({})))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request("POST", "/login", None, Some(json!({"password": "wrong"}))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app).await;

    let (status, body) = send(&app, request("GET", "/verify", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn protected_routes_reject_missing_and_bad_tokens() {
    let app = spawn_app().await;

    for (method, uri) in [
        ("GET", "/verify"),
        ("GET", "/numbers"),
        ("GET", "/search"),
        ("GET", "/stats"),
        ("GET", "/tags"),
    ] {
        let (status, _) = send(&app, request(method, uri, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }

    let (status, _) = send(&app, request("GET", "/numbers", Some("garbage"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A rejected write must not mutate anything.
    let (status, _) = send(
        &app,
        request(
            "POST",
            "/add-number",
            None,
            Some(json!({"number": "+12125551234", "mode": "CALL"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = login(&app).await;
    let (status, body) = send(&app, request("GET", "/numbers", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn add_number_normalizes_and_derives_state() {
    let app = spawn_app().await;
    let token = login(&app).await;

    let data = add_number(
        &app,
        &token,
        json!({
            "number": " +1 (212) 555-1234 ",
            "mode": "CALL",
            "tags": [" Work ", "VIP", ""],
            "notes": "main line"
        }),
    )
    .await;

    assert_eq!(data["number"], "+12125551234");
    assert_eq!(data["mode"], "CALL");
    assert_eq!(data["tags"], json!(["work", "vip"]));
    assert_eq!(data["state"], "New York");
    assert_eq!(data["usageCount"], 0);
    assert!(data["createdAt"].is_string());

    // Explicit state wins over derivation.
    let data = add_number(
        &app,
        &token,
        json!({"number": "+12145550000", "mode": "OTP", "state": "Nowhere"}),
    )
    .await;
    assert_eq!(data["state"], "Nowhere");
}

#[tokio::test]
async fn add_number_rejects_invalid_input() {
    let app = spawn_app().await;
    let token = login(&app).await;

    let (status, _) = send(
        &app,
        request("POST", "/add-number", Some(&token), Some(json!({"number": "+12125551234"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/add-number",
            Some(&token),
            Some(json!({"number": "+12125551234", "mode": "SMS"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/add-number",
            Some(&token),
            Some(json!({"number": "  ", "mode": "CALL"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_numbers_are_rejected_ignoring_formatting() {
    let app = spawn_app().await;
    let token = login(&app).await;

    add_number(&app, &token, json!({"number": "+12125551234", "mode": "CALL"})).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/add-number",
            Some(&token),
            Some(json!({"number": "+1 212-555-1234", "mode": "OTP"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Number already exists");
}

#[tokio::test]
async fn update_number_changes_only_supplied_fields() {
    let app = spawn_app().await;
    let token = login(&app).await;

    let data = add_number(
        &app,
        &token,
        json!({
            "number": "+12125551234",
            "mode": "CALL",
            "tags": ["work"],
            "notes": "original"
        }),
    )
    .await;
    let id = data["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        request(
            "PUT",
            "/update-number",
            Some(&token),
            Some(json!({"id": id, "tags": ["personal", "vip"]})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated = &body["data"];
    assert_eq!(updated["tags"], json!(["personal", "vip"]));
    assert_eq!(updated["mode"], "CALL");
    assert_eq!(updated["notes"], "original");
    assert_eq!(updated["state"], "New York");

    // Same handler semantics via the path variant.
    let (status, body) = send(
        &app,
        request(
            "PUT",
            &format!("/update-number/{id}"),
            Some(&token),
            Some(json!({"notes": "updated"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["notes"], "updated");
    assert_eq!(body["data"]["tags"], json!(["personal", "vip"]));

    let (status, _) = send(
        &app,
        request("PUT", "/update-number", Some(&token), Some(json!({"tags": []}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            "PUT",
            "/update-number",
            Some(&token),
            Some(json!({"id": 9999, "notes": "x"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_mode_is_mode_only() {
    let app = spawn_app().await;
    let token = login(&app).await;

    let data = add_number(
        &app,
        &token,
        json!({"number": "+12125551234", "mode": "CALL", "notes": "keep me"}),
    )
    .await;
    let id = data["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        request(
            "PUT",
            "/update-mode",
            Some(&token),
            Some(json!({"id": id, "mode": "OTP"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["mode"], "OTP");
    assert_eq!(body["data"]["notes"], "keep me");

    let (status, _) = send(
        &app,
        request("PUT", "/update-mode", Some(&token), Some(json!({"mode": "OTP"}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            "PUT",
            "/update-mode",
            Some(&token),
            Some(json!({"id": id, "mode": "FAX"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            "PUT",
            "/update-mode",
            Some(&token),
            Some(json!({"id": 9999, "mode": "OTP"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_number_is_permanent() {
    let app = spawn_app().await;
    let token = login(&app).await;

    let data = add_number(&app, &token, json!({"number": "+12125551234", "mode": "CALL"})).await;
    let id = data["id"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/delete-number/{id}"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/delete-number/{id}"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, request("GET", "/numbers", Some(&token), None)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn bulk_add_isolates_items() {
    let app = spawn_app().await;
    let token = login(&app).await;

    let (status, _) = send(
        &app,
        request("POST", "/bulk-add", Some(&token), Some(json!({"numbers": []}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/bulk-add",
            Some(&token),
            Some(json!({
                "numbers": [
                    {"number": "+15551230000"},
                    {"number": "+15551230000"},
                    {"number": "+12125559999", "mode": "OTP", "tags": ["Pool"]},
                    {"number": "---"}
                ]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let results = &body["data"];
    assert_eq!(results["added"].as_array().unwrap().len(), 2);
    assert_eq!(results["skipped"].as_array().unwrap().len(), 1);
    assert_eq!(results["errors"].as_array().unwrap().len(), 1);
    assert_eq!(results["skipped"][0]["number"], "+15551230000");
    assert_eq!(results["skipped"][0]["reason"], "Already exists");

    // Unset mode defaults to CALL; tags are normalized like single adds.
    assert_eq!(results["added"][0]["mode"], "CALL");
    assert_eq!(results["added"][1]["tags"], json!(["pool"]));

    assert_eq!(
        body["message"],
        "Bulk add: 2 added, 1 skipped, 1 errors"
    );
}

#[tokio::test]
async fn lookup_reports_mode_and_counts_usage() {
    let app = spawn_app().await;
    let token = login(&app).await;

    add_number(&app, &token, json!({"number": "+12125551234", "mode": "OTP"})).await;

    // Unknown numbers are a normal answer, not an error.
    let (status, body) = send(
        &app,
        request("POST", "/lookup", None, Some(json!({"Called": "+19999999999"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "UNKNOWN");

    // Body fields, formatting-insensitive.
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/lookup",
            None,
            Some(json!({"Called": "+1 (212) 555-1234", "From": "+15550001111", "CallSid": "CA123"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["calledNumber"], "+12125551234");
    assert_eq!(body["mode"], "OTP");
    assert_eq!(body["from"], "+15550001111");
    assert_eq!(body["callSid"], "CA123");

    // Query-string variant, `To` as the fallback field.
    let (status, body) = send(
        &app,
        request("POST", "/lookup?To=%2B12125551234", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "OTP");

    // An empty request still answers.
    let (status, body) = send(&app, request("POST", "/lookup", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "UNKNOWN");

    let (_, body) = send(&app, request("GET", "/numbers", Some(&token), None)).await;
    let entry = &body["data"][0];
    assert_eq!(entry["usageCount"], 2);
    assert!(entry["lastUsed"].is_string());
}

#[tokio::test]
async fn search_matches_tags_case_insensitively() {
    let app = spawn_app().await;
    let token = login(&app).await;

    add_number(
        &app,
        &token,
        json!({"number": "+13125550000", "mode": "CALL", "tags": ["work"], "notes": "chicago"}),
    )
    .await;
    add_number(
        &app,
        &token,
        json!({"number": "+12125551111", "mode": "OTP", "notes": "codes only"}),
    )
    .await;

    let (status, body) = send(&app, request("GET", "/search?q=WORK", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["numbers"][0]["number"], "+13125550000");
    assert_eq!(body["data"]["query"]["q"], "WORK");

    let (_, body) = send(&app, request("GET", "/search?q=nothing", Some(&token), None)).await;
    assert_eq!(body["data"]["count"], 0);

    let (_, body) = send(&app, request("GET", "/search?mode=OTP", Some(&token), None)).await;
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["numbers"][0]["mode"], "OTP");

    let (_, body) = send(
        &app,
        request("GET", "/search?q=555&state=Illinois", Some(&token), None),
    )
    .await;
    assert_eq!(body["data"]["count"], 1);
}

#[tokio::test]
async fn numbers_listing_filters_and_sorts_newest_first() {
    let app = spawn_app().await;
    let token = login(&app).await;

    add_number(
        &app,
        &token,
        json!({"number": "+13125550000", "mode": "CALL", "tags": ["work"]}),
    )
    .await;
    add_number(
        &app,
        &token,
        json!({"number": "+12125551111", "mode": "OTP", "tags": ["work", "codes"]}),
    )
    .await;

    let (_, body) = send(&app, request("GET", "/numbers", Some(&token), None)).await;
    let numbers = body["data"].as_array().unwrap();
    assert_eq!(numbers.len(), 2);
    // Newest first
    assert_eq!(numbers[0]["number"], "+12125551111");

    let (_, body) = send(&app, request("GET", "/numbers?tag=work", Some(&token), None)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, request("GET", "/numbers?mode=OTP", Some(&token), None)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = send(
        &app,
        request("GET", "/numbers?state=New%20York", Some(&token), None),
    )
    .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, request("GET", "/numbers?q=312", Some(&token), None)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn stats_and_tags_aggregate() {
    let app = spawn_app().await;
    let token = login(&app).await;

    add_number(
        &app,
        &token,
        json!({"number": "+12125551111", "mode": "CALL", "tags": ["work", "vip"]}),
    )
    .await;
    add_number(
        &app,
        &token,
        json!({"number": "+12125552222", "mode": "CALL", "tags": ["work"]}),
    )
    .await;
    add_number(&app, &token, json!({"number": "+13125553333", "mode": "OTP"})).await;

    let (status, body) = send(&app, request("GET", "/stats", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["data"];
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["call"], 2);
    assert_eq!(stats["otp"], 1);
    assert_eq!(stats["topTags"][0]["tag"], "work");
    assert_eq!(stats["topTags"][0]["count"], 2);
    assert_eq!(stats["topStates"][0]["state"], "New York");
    assert_eq!(stats["topStates"][0]["count"], 2);
    assert!(stats["timestamp"].is_string());

    let (status, body) = send(&app, request("GET", "/tags", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let tags = body["data"].as_array().unwrap();
    assert_eq!(tags[0]["tag"], "work");
    assert_eq!(tags[0]["count"], 2);
    assert_eq!(tags.len(), 2);
}

#[tokio::test]
async fn health_reports_connected_database() {
    let app = spawn_app().await;

    let (status, body) = send(&app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn unknown_routes_return_404() {
    let app = spawn_app().await;

    let (status, body) = send(&app, request("GET", "/nope", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn account_strategy_logs_in_with_stored_credentials() {
    let mut config = test_config();
    config.auth.strategy = AuthStrategy::Account;
    config.auth.admin_username = "ops".to_string();
    let app = spawn_app_with(config).await;

    let (status, _) = send(
        &app,
        request("POST", "/login", None, Some(json!({"password": TEST_PASSWORD}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/login",
            None,
            Some(json!({"username": "ops", "password": "wrong"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Unknown users are indistinguishable from wrong passwords.
    let (status, body) = send(
        &app,
        request(
            "POST",
            "/login",
            None,
            Some(json!({"username": "ghost", "password": "wrong"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/login",
            None,
            Some(json!({"username": "ops", "password": TEST_PASSWORD})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["user"]["username"], "ops");

    let (status, body) = send(&app, request("GET", "/verify", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "ops");
}
