mod support;

use axum::http::{Method, StatusCode};
use serde_json::json;

use support::TestApp;

/// Owner with a profile, plus a viewer who accepted an invite to it.
async fn shared_family(app: &TestApp) -> String {
    app.register_device("owner", "d-owner").await;
    app.register_device("viewer", "d-viewer").await;
    let profile_id = app.create_profile("owner", "d-owner", "Kid").await;

    let invited = app
        .call(
            Method::POST,
            &format!("/api/v1/profiles/{profile_id}/shares"),
            Some("owner"),
            Some("d-owner"),
            Some(json!({ "email": "Viewer@Example.com", "role": "Viewer" })),
        )
        .await;
    assert_eq!(invited.status, StatusCode::CREATED, "{:?}", invited.body);
    assert_eq!(invited.body["status"], "PENDING");

    let accepted = app
        .call(
            Method::POST,
            &format!("/api/v1/profiles/{profile_id}/shares/accept"),
            Some("viewer"),
            Some("d-viewer"),
            None,
        )
        .await;
    assert_eq!(accepted.status, StatusCode::OK, "{:?}", accepted.body);
    assert_eq!(accepted.body["status"], "ACCEPTED");

    profile_id
}

#[tokio::test]
async fn activity_is_for_owners_only() {
    let app = TestApp::new();
    let profile_id = shared_family(&app).await;
    let uri = format!("/api/v1/profiles/{profile_id}/activity");
    app.settle_audit().await;

    let as_viewer = app
        .call(Method::GET, &uri, Some("viewer"), Some("d-viewer"), None)
        .await;
    assert_eq!(as_viewer.status, StatusCode::FORBIDDEN);
    assert_eq!(as_viewer.code(), Some("FORBIDDEN"));

    let as_owner = app
        .call(Method::GET, &uri, Some("owner"), Some("d-owner"), None)
        .await;
    assert_eq!(as_owner.status, StatusCode::OK);
    let actions: Vec<&str> = as_owner.body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"PROFILE_CREATED"));
    assert!(actions.contains(&"SHARE_INVITED"));
    assert!(actions.contains(&"SHARE_ACCEPTED"));
}

#[tokio::test]
async fn viewer_reads_but_cannot_delete() {
    let app = TestApp::new();
    let profile_id = shared_family(&app).await;
    let uri = format!("/api/v1/profiles/{profile_id}");

    let read = app
        .call(Method::GET, &uri, Some("viewer"), Some("d-viewer"), None)
        .await;
    assert_eq!(read.status, StatusCode::OK);
    assert_eq!(read.body["role"], "Viewer");
    assert_eq!(read.body["name"], "Kid");

    let delete = app
        .call(Method::DELETE, &uri, Some("viewer"), Some("d-viewer"), None)
        .await;
    assert_eq!(delete.code(), Some("FORBIDDEN"));

    let listed = app
        .call(Method::GET, "/api/v1/profiles", Some("viewer"), Some("d-viewer"), None)
        .await;
    assert_eq!(listed.body["profiles"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn strangers_and_missing_profiles_look_the_same() {
    let app = TestApp::new();
    let profile_id = shared_family(&app).await;
    app.register_device("stranger", "d-x").await;

    let hidden = app
        .call(
            Method::GET,
            &format!("/api/v1/profiles/{profile_id}"),
            Some("stranger"),
            Some("d-x"),
            None,
        )
        .await;
    let missing = app
        .call(
            Method::GET,
            "/api/v1/profiles/does-not-exist",
            Some("owner"),
            Some("d-owner"),
            None,
        )
        .await;

    assert_eq!(hidden.status, StatusCode::NOT_FOUND);
    assert_eq!(hidden.body, missing.body);
}

#[tokio::test]
async fn owner_deletes_profile() {
    let app = TestApp::new();
    let profile_id = shared_family(&app).await;
    let uri = format!("/api/v1/profiles/{profile_id}");

    let deleted = app
        .call(Method::DELETE, &uri, Some("owner"), Some("d-owner"), None)
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = app
        .call(Method::GET, &uri, Some("viewer"), Some("d-viewer"), None)
        .await;
    assert_eq!(gone.code(), Some("NOT_FOUND"));
}

#[tokio::test]
async fn duplicate_invite_conflicts_and_unknown_accept_is_not_found() {
    let app = TestApp::new();
    let profile_id = shared_family(&app).await;

    let again = app
        .call(
            Method::POST,
            &format!("/api/v1/profiles/{profile_id}/shares"),
            Some("owner"),
            Some("d-owner"),
            Some(json!({ "email": "viewer@example.com", "role": "Owner" })),
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    app.register_device("nobody", "d-n").await;
    let accept = app
        .call(
            Method::POST,
            &format!("/api/v1/profiles/{profile_id}/shares/accept"),
            Some("nobody"),
            Some("d-n"),
            None,
        )
        .await;
    assert_eq!(accept.code(), Some("NOT_FOUND"));
}

#[tokio::test]
async fn revoked_share_removes_access() {
    let app = TestApp::new();
    let profile_id = shared_family(&app).await;

    let revoked = app
        .call(
            Method::DELETE,
            &format!("/api/v1/profiles/{profile_id}/shares/viewer@example.com"),
            Some("owner"),
            Some("d-owner"),
            None,
        )
        .await;
    assert_eq!(revoked.status, StatusCode::NO_CONTENT);

    let read = app
        .call(
            Method::GET,
            &format!("/api/v1/profiles/{profile_id}"),
            Some("viewer"),
            Some("d-viewer"),
            None,
        )
        .await;
    assert_eq!(read.code(), Some("NOT_FOUND"));

    let shares = app
        .call(
            Method::GET,
            &format!("/api/v1/profiles/{profile_id}/shares"),
            Some("owner"),
            Some("d-owner"),
            None,
        )
        .await;
    assert!(shares.body["shares"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invite_body_is_validated_before_role_check() {
    let app = TestApp::new();
    let profile_id = shared_family(&app).await;

    // A viewer sending a bad body learns about the body first.
    let res = app
        .call(
            Method::POST,
            &format!("/api/v1/profiles/{profile_id}/shares"),
            Some("viewer"),
            Some("d-viewer"),
            Some(json!({ "role": "Admin" })),
        )
        .await;
    assert_eq!(res.code(), Some("VALIDATION_ERROR"));
    let fields: Vec<&str> = res.body["error"]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "role"]);

    let valid = app
        .call(
            Method::POST,
            &format!("/api/v1/profiles/{profile_id}/shares"),
            Some("viewer"),
            Some("d-viewer"),
            Some(json!({ "email": "x@example.com", "role": "Viewer" })),
        )
        .await;
    assert_eq!(valid.code(), Some("FORBIDDEN"));
}

#[tokio::test]
async fn vaccine_records_follow_profile_roles() {
    let app = TestApp::new();
    let profile_id = shared_family(&app).await;
    let uri = format!("/api/v1/profiles/{profile_id}/vaccines");

    let bad_date = app
        .call(
            Method::POST,
            &uri,
            Some("owner"),
            Some("d-owner"),
            Some(json!({ "name": "MMR", "administeredOn": "yesterday" })),
        )
        .await;
    assert_eq!(bad_date.code(), Some("VALIDATION_ERROR"));
    assert_eq!(bad_date.body["error"]["fields"][0]["field"], "administeredOn");

    let added = app
        .call(
            Method::POST,
            &uri,
            Some("owner"),
            Some("d-owner"),
            Some(json!({ "name": "MMR", "administeredOn": "2021-05-04", "dose": 1 })),
        )
        .await;
    assert_eq!(added.status, StatusCode::CREATED, "{:?}", added.body);
    let vaccine_id = added.body["vaccineId"].as_str().unwrap().to_string();

    let by_viewer = app
        .call(
            Method::POST,
            &uri,
            Some("viewer"),
            Some("d-viewer"),
            Some(json!({ "name": "Polio", "administeredOn": "2021-06-01" })),
        )
        .await;
    assert_eq!(by_viewer.code(), Some("FORBIDDEN"));

    let listed = app
        .call(Method::GET, &uri, Some("viewer"), Some("d-viewer"), None)
        .await;
    assert_eq!(listed.body["vaccines"].as_array().unwrap().len(), 1);

    let deleted = app
        .call(
            Method::DELETE,
            &format!("{uri}/{vaccine_id}"),
            Some("owner"),
            Some("d-owner"),
            None,
        )
        .await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn padded_profile_id_writes_to_the_authorized_profile() {
    let app = TestApp::new();
    app.register_device("alice", "d1").await;
    let profile_id = app.create_profile("alice", "d1", "Kid").await;

    let added = app
        .call(
            Method::POST,
            &format!("/api/v1/profiles/{profile_id}%20/vaccines"),
            Some("alice"),
            Some("d1"),
            Some(json!({ "name": "MMR", "administeredOn": "2021-05-04" })),
        )
        .await;
    assert_eq!(added.status, StatusCode::CREATED, "{:?}", added.body);
    assert_eq!(added.body["profileId"], profile_id.as_str());

    let listed = app
        .call(
            Method::GET,
            &format!("/api/v1/profiles/{profile_id}/vaccines"),
            Some("alice"),
            Some("d1"),
            None,
        )
        .await;
    assert_eq!(listed.body["vaccines"].as_array().unwrap().len(), 1);
}
