mod support;

use axum::http::{Method, StatusCode};
use serde_json::json;

use family_records_api::repos::DeviceStore;
use support::TestApp;

#[tokio::test]
async fn free_tier_ceiling_is_lifted_by_revoking_a_device() {
    let app = TestApp::new();
    app.register_device("alice", "d1").await;

    let second = app
        .call(Method::POST, "/api/v1/devices", Some("alice"), Some("d2"), None)
        .await;
    assert_eq!(second.status, StatusCode::FORBIDDEN);
    assert_eq!(second.code(), Some("DEVICE_LIMIT_EXCEEDED"));

    let revoked = app
        .call(
            Method::DELETE,
            "/api/v1/devices/d1?scope=single",
            Some("alice"),
            Some("d1"),
            None,
        )
        .await;
    assert_eq!(revoked.status, StatusCode::OK, "{:?}", revoked.body);
    assert_eq!(revoked.body["scope"], "single");

    app.register_device("alice", "d2").await;
    assert_eq!(app.store.count_by_user("alice").await.unwrap(), 1);
    assert!(app.store.signed_out_users().await.is_empty());
}

#[tokio::test]
async fn active_subscription_raises_the_ceiling() {
    let app = TestApp::new();
    app.activate_subscription("alice", 1_700_000_000_000).await;

    for device in ["d1", "d2", "d3"] {
        app.register_device("alice", device).await;
    }

    let listed = app
        .call(Method::GET, "/api/v1/devices", Some("alice"), Some("d3"), None)
        .await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body["devices"].as_array().unwrap().len(), 3);
    assert_eq!(listed.body["currentDeviceId"], "d3");
}

#[tokio::test]
async fn registering_a_known_device_again_refreshes_it() {
    let app = TestApp::new();
    app.register_device("alice", "d1").await;

    let again = app
        .call(
            Method::POST,
            "/api/v1/devices",
            Some("alice"),
            Some("d1"),
            Some(json!({ "deviceType": "tablet", "locale": "en-GB" })),
        )
        .await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.body["created"], false);
    assert_eq!(again.body["deviceType"], "tablet");
}

#[tokio::test]
async fn another_accounts_device_is_forbidden() {
    let app = TestApp::new();
    app.register_device("bob", "d-bob").await;

    let listed = app
        .call(Method::GET, "/api/v1/devices", Some("alice"), Some("d-bob"), None)
        .await;
    assert_eq!(listed.status, StatusCode::FORBIDDEN);
    assert_eq!(listed.code(), Some("FORBIDDEN"));

    let claimed = app
        .call(Method::POST, "/api/v1/devices", Some("alice"), Some("d-bob"), None)
        .await;
    assert_eq!(claimed.code(), Some("FORBIDDEN"));
}

#[tokio::test]
async fn unknown_or_missing_device_is_device_not_found() {
    let app = TestApp::new();

    let unknown = app
        .call(Method::GET, "/api/v1/devices", Some("alice"), Some("ghost"), None)
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    assert_eq!(unknown.code(), Some("DEVICE_NOT_FOUND"));

    let missing = app
        .call(Method::POST, "/api/v1/devices/heartbeat", Some("alice"), None, None)
        .await;
    assert_eq!(missing.code(), Some("DEVICE_NOT_FOUND"));
}

#[tokio::test]
async fn global_revoke_signs_the_account_out() {
    let app = TestApp::new();
    app.register_device("alice", "d1").await;

    let res = app
        .call(
            Method::DELETE,
            "/api/v1/devices/d1?scope=global",
            Some("alice"),
            Some("d1"),
            None,
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(app.store.signed_out_users().await, vec!["alice".to_string()]);
    assert_eq!(app.store.count_by_user("alice").await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_revoke_scope_is_bad_request() {
    let app = TestApp::new();
    app.register_device("alice", "d1").await;

    let res = app
        .call(
            Method::DELETE,
            "/api/v1/devices/d1?scope=everything",
            Some("alice"),
            Some("d1"),
            None,
        )
        .await;
    assert_eq!(res.code(), Some("BAD_REQUEST"));
    assert_eq!(app.store.count_by_user("alice").await.unwrap(), 1);
}

#[tokio::test]
async fn device_type_outside_the_allowed_set_is_rejected() {
    let app = TestApp::new();
    let res = app
        .call(
            Method::POST,
            "/api/v1/devices",
            Some("alice"),
            Some("d1"),
            Some(json!({ "deviceType": "toaster" })),
        )
        .await;
    assert_eq!(res.code(), Some("VALIDATION_ERROR"));
    assert_eq!(res.body["error"]["fields"][0]["field"], "deviceType");
    assert_eq!(app.store.count_by_user("alice").await.unwrap(), 0);
}
