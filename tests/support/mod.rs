//! Shared harness for the HTTP scenario tests: the real router over the
//! in-memory backend, with bearer tokens minted locally.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};
use tower::ServiceExt;

use family_records_api::{
    app::build_router,
    config::Config,
    models::{Subscription, SubscriptionStatus},
    repos::MemoryStore,
    services::AuditRecorder,
    state::AppState,
};

/// Claims are trusted verbatim in this mode, so any signing key will do.
pub fn token(sub: &str) -> String {
    let claims = json!({
        "sub": sub,
        "email": format!("{sub}@example.com"),
        "exp": Utc::now().timestamp() + 600,
    });
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-only"),
    )
    .unwrap()
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub audit: AuditRecorder,
}

pub struct Response {
    pub status: StatusCode,
    pub request_id: Option<String>,
    pub body: Value,
}

impl Response {
    pub fn code(&self) -> Option<&str> {
        self.body["error"]["code"].as_str()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_state(store.clone(), AppState::in_memory(store))
    }

    pub fn with_state(store: Arc<MemoryStore>, state: AppState) -> Self {
        let config = Config::from_lookup(|_| None).unwrap();
        let audit = state.audit.clone();
        Self {
            router: build_router(state, &config),
            store,
            audit,
        }
    }

    /// Audit appends run in the background; wait for them before reading.
    pub async fn settle_audit(&self) {
        self.audit.drain().await;
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        user: Option<&str>,
        device: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("authorization", format!("Bearer {}", token(user)));
        }
        if let Some(device) = device {
            builder = builder.header("x-device-id", device);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        Response {
            status,
            request_id,
            body,
        }
    }

    /// Register `device` for `user`; panics unless it is newly created.
    pub async fn register_device(&self, user: &str, device: &str) {
        let res = self
            .call(
                Method::POST,
                "/api/v1/devices",
                Some(user),
                Some(device),
                Some(json!({ "deviceType": "mobile" })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    }

    pub async fn create_profile(&self, user: &str, device: &str, name: &str) -> String {
        let res = self
            .call(
                Method::POST,
                "/api/v1/profiles",
                Some(user),
                Some(device),
                Some(json!({ "name": name, "relationship": "child" })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
        res.body["profileId"].as_str().unwrap().to_string()
    }

    pub async fn activate_subscription(&self, user: &str, created_at_millis: i64) {
        self.store
            .insert_subscription(Subscription {
                user_id: user.to_string(),
                created_at: Utc.timestamp_millis_opt(created_at_millis).unwrap(),
                status: SubscriptionStatus::Active,
                canceled_at: None,
            })
            .await;
    }
}
