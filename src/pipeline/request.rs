/*
 * Responsibility
 * - RawRequest: what a protected endpoint hands to the pipeline
 *   (headers, path/query params, unparsed body)
 * - UserContext / AuthorizedRequest: what business logic receives once
 *   every gate has passed
 */
use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, RawPathParams, Request},
    http::{HeaderMap, Method, StatusCode},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Device, Role};

pub const DEVICE_ID_HEADER: &str = "x-device-id";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub path_params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Bytes,
}

impl RawRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Request id set by the HTTP layer, or a fresh one.
    pub fn correlation_id(&self) -> String {
        self.header(REQUEST_ID_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }
}

impl<S> FromRequest<S> for RawRequest
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (mut parts, body) = req.into_parts();

        // Routes without placeholders carry no params at all; treat as empty.
        let path_params = match RawPathParams::from_request_parts(&mut parts, state).await {
            Ok(params) => params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            Err(_) => HashMap::new(),
        };

        let Query(query) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|_| AppError::bad_request("malformed query string"))?;

        let method = parts.method.clone();
        let headers = parts.headers.clone();
        let body = Bytes::from_request(Request::from_parts(parts, body), state)
            .await
            .map_err(|rejection| {
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    AppError::PayloadTooLarge
                } else {
                    AppError::bad_request("unreadable request body")
                }
            })?;

        Ok(Self {
            method,
            headers,
            path_params,
            query,
            body,
        })
    }
}

/// Authenticated caller as seen by business logic.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: String,
    pub email: String,
    // Claimed device id (header or token claim), if any.
    pub device_id: Option<String>,
    // Set only when the device gate ran and confirmed ownership.
    pub device: Option<Device>,
    pub subscription_active: bool,
}

#[derive(Debug, Clone)]
pub struct AuthorizedRequest {
    pub user: UserContext,
    pub body: Value,
    pub path_params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub correlation_id: String,
    // Set together when the policy carried a profile requirement: the id the
    // RBAC gate checked and the caller's effective role on it.
    pub profile_id: Option<String>,
    pub profile_role: Option<Role>,
}

impl AuthorizedRequest {
    pub fn path_param(&self, name: &str) -> Result<&str, AppError> {
        self.path_params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AppError::bad_request(format!("missing path parameter: {name}")))
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Profile id authorized by the RBAC gate.
    pub fn profile_id(&self) -> Result<&str, AppError> {
        self.profile_id
            .as_deref()
            .ok_or_else(|| AppError::internal("profile id read on an endpoint without RBAC"))
    }

    /// Deserialize the already-validated body into a DTO.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_value(self.body.clone())
            .map_err(|_| AppError::bad_request("request body has an unexpected shape"))
    }
}
