mod support;

use axum::http::{Method, StatusCode};

use family_records_api::repos::AuditStore;
use support::TestApp;

#[tokio::test]
async fn tier_reflects_the_newest_active_row() {
    let app = TestApp::new();

    let free = app
        .call(Method::GET, "/api/v1/subscription", Some("alice"), None, None)
        .await;
    assert_eq!(free.status, StatusCode::OK);
    assert_eq!(free.body["tier"], "free");
    assert!(free.body["subscription"].is_null());

    app.activate_subscription("alice", 1_000).await;
    app.activate_subscription("alice", 2_000).await;

    let paid = app
        .call(Method::GET, "/api/v1/subscription", Some("alice"), None, None)
        .await;
    assert_eq!(paid.body["tier"], "paid");
    assert_eq!(paid.body["subscription"]["status"], "active");
}

#[tokio::test]
async fn cancel_flips_the_current_row_and_is_audited() {
    let app = TestApp::new();
    app.activate_subscription("alice", 1_000).await;
    app.register_device("alice", "d1").await;

    let canceled = app
        .call(
            Method::POST,
            "/api/v1/subscription/cancel",
            Some("alice"),
            Some("d1"),
            None,
        )
        .await;
    assert_eq!(canceled.status, StatusCode::OK, "{:?}", canceled.body);
    assert_eq!(canceled.body["tier"], "free");
    assert_eq!(canceled.body["subscription"]["status"], "canceled");

    let again = app
        .call(
            Method::POST,
            "/api/v1/subscription/cancel",
            Some("alice"),
            Some("d1"),
            None,
        )
        .await;
    assert_eq!(again.code(), Some("NOT_FOUND"));

    app.settle_audit().await;
    let events = app.store.list_by_resource("alice", 10).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action.as_str(), "SUBSCRIPTION_CANCELED");
}

#[tokio::test]
async fn cancel_requires_a_trusted_device() {
    let app = TestApp::new();
    app.activate_subscription("alice", 1_000).await;

    let res = app
        .call(Method::POST, "/api/v1/subscription/cancel", Some("alice"), None, None)
        .await;
    assert_eq!(res.code(), Some("DEVICE_NOT_FOUND"));
    assert!(app.store.subscriptions_of("alice").await[0].is_active());
}
