//! Response envelope produced by every pipeline run.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::models::AuditAction;

/// `{statusCode, headers, body}`; a `None` body renders as an empty response.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status_code: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl Reply {
    pub fn new(status_code: StatusCode, body: Option<Value>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

        Self {
            status_code,
            headers,
            body,
        }
    }

    pub fn json(status_code: StatusCode, body: &impl Serialize) -> Result<Self, AppError> {
        let value = serde_json::to_value(body)
            .map_err(|e| AppError::internal(format!("serialize response: {e}")))?;
        Ok(Self::new(status_code, Some(value)))
    }

    pub fn ok(body: &impl Serialize) -> Result<Self, AppError> {
        Self::json(StatusCode::OK, body)
    }

    pub fn created(body: &impl Serialize) -> Result<Self, AppError> {
        Self::json(StatusCode::CREATED, body)
    }

    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, None)
    }

    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let mut response = match self.body {
            Some(body) => (self.status_code, Json(body)).into_response(),
            None => self.status_code.into_response(),
        };
        response.headers_mut().extend(self.headers);
        response
    }
}

/// Audit append requested by business logic, dispatched after the reply.
#[derive(Debug, Clone)]
pub struct AuditIntent {
    pub action: AuditAction,
    pub resource: String,
    pub details: Value,
}

/// What a business-logic callback hands back to the pipeline.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub reply: Reply,
    pub audit: Option<AuditIntent>,
}

impl Outcome {
    pub fn new(reply: Reply) -> Self {
        Self { reply, audit: None }
    }

    pub fn audited(
        mut self,
        action: AuditAction,
        resource: impl Into<String>,
        details: Value,
    ) -> Self {
        self.audit = Some(AuditIntent {
            action,
            resource: resource.into(),
            details,
        });
        self
    }
}

impl From<Reply> for Outcome {
    fn from(reply: Reply) -> Self {
        Self::new(reply)
    }
}
