/*
 * Responsibility
 * - /devices: register the calling device (under the tier ceiling),
 *   heartbeat, list, revoke (single device or global sign-out)
 */
use axum::extract::State;
use serde_json::json;

use crate::api::v1::dto::devices::{DeviceListResponse, DeviceResponse, RevokeResponse};
use crate::error::AppError;
use crate::models::{AuditAction, DeviceAttributes};
use crate::pipeline::{
    self, AccessPolicy, AccessRequirements, AuthorizedRequest, Endpoint, Outcome, RawRequest,
    Reply,
};
use crate::services::device_gate::{self, RevokeScope};
use crate::services::schema::{BodySchema, FieldRule, FieldType};
use crate::state::AppState;

const DEVICE_TYPES: &[&str] = &["mobile", "tablet", "desktop", "unknown"];

static REGISTER: Endpoint = Endpoint {
    name: "devices.register",
    schema: BodySchema::new(&[
        FieldRule::optional("deviceType", FieldType::String).one_of(DEVICE_TYPES),
        FieldRule::optional("osName", FieldType::String).max_length(64),
        FieldRule::optional("browserName", FieldType::String).max_length(64),
        FieldRule::optional("locale", FieldType::String).max_length(35),
        FieldRule::optional("timeZone", FieldType::String).max_length(64),
    ]),
    policy: AccessPolicy::Static(AccessRequirements {
        require_device: false,
        enforce_device_limit: true,
        profile: None,
    }),
};

static HEARTBEAT: Endpoint = Endpoint {
    name: "devices.heartbeat",
    schema: BodySchema::EMPTY,
    policy: AccessPolicy::Static(AccessRequirements::DEVICE),
};

static LIST: Endpoint = Endpoint {
    name: "devices.list",
    schema: BodySchema::EMPTY,
    policy: AccessPolicy::Static(AccessRequirements::DEVICE),
};

static REVOKE: Endpoint = Endpoint {
    name: "devices.revoke",
    schema: BodySchema::EMPTY,
    policy: AccessPolicy::Static(AccessRequirements::DEVICE),
};

pub async fn register_device(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &REGISTER, raw, |req| register(&state, req)).await
}

pub async fn heartbeat(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &HEARTBEAT, raw, |req| touch(&state, req)).await
}

pub async fn list_devices(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &LIST, raw, |req| list(&state, req)).await
}

pub async fn revoke_device(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &REVOKE, raw, |req| revoke(&state, req)).await
}

async fn register(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let device_id = req.user.device_id.clone().ok_or_else(|| {
        AppError::bad_request("device id required (x-device-id header or token claim)")
    })?;
    let attributes: DeviceAttributes = req.body_as()?;

    let (device, created) = device_gate::touch_device(
        state.stores.devices.as_ref(),
        &req.user.user_id,
        &device_id,
        Some(attributes),
    )
    .await?;

    let response = DeviceResponse { device, created };
    if !created {
        return Reply::ok(&response).map(Outcome::from);
    }

    tracing::info!(user_id = %req.user.user_id, %device_id, "device registered");
    Ok(Outcome::new(Reply::created(&response)?).audited(
        AuditAction::DeviceRegistered,
        device_id,
        json!({ "deviceType": response.device.attributes.device_type }),
    ))
}

async fn touch(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    // The device gate already confirmed the claimed id.
    let device_id = req
        .user
        .device
        .as_ref()
        .map(|d| d.device_id.clone())
        .ok_or(AppError::DeviceNotFound)?;

    let (device, created) = device_gate::touch_device(
        state.stores.devices.as_ref(),
        &req.user.user_id,
        &device_id,
        None,
    )
    .await?;

    Reply::ok(&DeviceResponse { device, created }).map(Outcome::from)
}

async fn list(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let devices = state.stores.devices.list_by_user(&req.user.user_id).await?;

    Reply::ok(&DeviceListResponse {
        devices,
        current_device_id: req.user.device_id,
    })
    .map(Outcome::from)
}

async fn revoke(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let device_id = req.path_param("deviceId")?.to_string();
    let scope = RevokeScope::parse(req.query_param("scope"))?;

    device_gate::revoke(
        state.stores.devices.as_ref(),
        state.stores.identity_admin.as_ref(),
        &req.user.user_id,
        &device_id,
        scope,
    )
    .await?;

    let reply = Reply::ok(&RevokeResponse {
        device_id: device_id.clone(),
        scope,
    })?;
    Ok(Outcome::new(reply).audited(
        AuditAction::DeviceRevoked,
        device_id,
        json!({ "scope": scope }),
    ))
}
