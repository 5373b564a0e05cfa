/*
 * Responsibility
 * - Request-level error taxonomy shared by every endpoint
 * - Stable machine-readable code + generic message; storage detail never
 *   reaches the body (it is logged with the correlation id instead)
 * - RepoError is converted to INTERNAL_ERROR
 */
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::pipeline::Reply;
use crate::repos::error::RepoError;

/// One offending field in a rejected body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("validation failed: {0:?}")]
    Validation(Vec<FieldError>),
    #[error("unauthenticated")]
    Unauthenticated,
    #[error("device not found")]
    DeviceNotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("device limit exceeded")]
    DeviceLimitExceeded,
    #[error("conflict")]
    Conflict,
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::DeviceNotFound => "DEVICE_NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::DeviceLimitExceeded => "DEVICE_LIMIT_EXCEEDED",
            Self::Conflict => "CONFLICT",
            Self::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::DeviceLimitExceeded => StatusCode::FORBIDDEN,
            Self::NotFound | Self::DeviceNotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::Validation(_) => "request body failed validation".into(),
            Self::Unauthenticated => "authentication required".into(),
            Self::DeviceNotFound => "device is not registered".into(),
            Self::Forbidden => "forbidden".into(),
            Self::NotFound => "resource not found".into(),
            Self::DeviceLimitExceeded => {
                "device limit reached for the current plan; revoke a device or upgrade".into()
            }
            Self::Conflict => "resource already exists".into(),
            Self::PayloadTooLarge => "request body is too large".into(),
            Self::Internal(_) => "internal server error".into(),
        }
    }

    /// Render the uniform error envelope.
    pub fn into_reply(self, correlation_id: &str) -> Reply {
        let mut error = json!({
            "code": self.code(),
            "message": self.public_message(),
        });

        match &self {
            Self::Validation(fields) => {
                error["fields"] = json!(fields);
            }
            Self::Internal(_) => {
                error["correlationId"] = json!(correlation_id);
            }
            _ => {}
        }

        Reply::new(self.status(), Some(json!({ "error": error })))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let correlation_id = Uuid::new_v4().to_string();
        if let Self::Internal(detail) = &self {
            tracing::error!(%correlation_id, %detail, "request failed");
        }
        self.into_reply(&correlation_id).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        Self::Internal(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_hides_detail_but_keeps_correlation_id() {
        let reply = AppError::internal("connection reset by peer").into_reply("req-1");
        assert_eq!(reply.status_code, StatusCode::INTERNAL_SERVER_ERROR);

        let body = reply.body.unwrap();
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["correlationId"], "req-1");
        assert!(!body.to_string().contains("connection reset"));
    }

    #[test]
    fn validation_error_lists_fields() {
        let reply = AppError::Validation(vec![FieldError::new("name", "is required")])
            .into_reply("req-2");
        let body = reply.body.unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["fields"][0]["field"], "name");
        assert!(body["error"].get("correlationId").is_none());
    }
}
