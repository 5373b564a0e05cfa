/*
 * Responsibility
 * - /profiles: create, list accessible, read (Viewer), delete (Owner)
 * - Read and delete share one derived policy: the role follows the method
 */
use axum::{extract::State, http::Method};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::api::v1::dto::{
    parse_date,
    profiles::{CreateProfileRequest, ProfileListResponse, ProfileResponse},
};
use crate::api::v1::handlers::PROFILE_ID;
use crate::error::AppError;
use crate::models::{AuditAction, Profile, Role};
use crate::pipeline::{
    self, AccessPolicy, AccessRequirements, AuthorizedRequest, Endpoint, Outcome,
    ProfileIdSource, ProfileRequirement, RawRequest, Reply,
};
use crate::services::schema::{BodySchema, FieldRule, FieldType};
use crate::state::AppState;

const RELATIONSHIPS: &[&str] = &["self", "child", "partner", "parent", "other"];

static CREATE: Endpoint = Endpoint {
    name: "profiles.create",
    schema: BodySchema::new(&[
        FieldRule::required("name", FieldType::String).max_length(120),
        FieldRule::optional("birthDate", FieldType::String),
        FieldRule::optional("relationship", FieldType::String).one_of(RELATIONSHIPS),
    ]),
    policy: AccessPolicy::Static(AccessRequirements::DEVICE),
};

static LIST: Endpoint = Endpoint {
    name: "profiles.list",
    schema: BodySchema::EMPTY,
    policy: AccessPolicy::Static(AccessRequirements::DEVICE),
};

static ITEM: Endpoint = Endpoint {
    name: "profiles.item",
    schema: BodySchema::EMPTY,
    policy: AccessPolicy::Derived(role_for_method),
};

/// Reading a profile needs Viewer; anything else on it needs Owner.
fn role_for_method(req: &RawRequest) -> AccessRequirements {
    let required_role = if req.method == Method::GET {
        Role::Viewer
    } else {
        Role::Owner
    };

    AccessRequirements {
        profile: Some(ProfileRequirement {
            id: ProfileIdSource::PathParam(PROFILE_ID),
            required_role,
        }),
        ..AccessRequirements::DEVICE
    }
}

pub async fn create_profile(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &CREATE, raw, |req| create(&state, req)).await
}

pub async fn list_profiles(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &LIST, raw, |req| list(&state, req)).await
}

pub async fn get_profile(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &ITEM, raw, |req| get(&state, req)).await
}

pub async fn delete_profile(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &ITEM, raw, |req| delete(&state, req)).await
}

async fn create(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let body: CreateProfileRequest = req.body_as()?;
    let birth_date = body
        .birth_date
        .as_deref()
        .map(|raw| parse_date("birthDate", raw))
        .transpose()?;

    let profile = Profile {
        profile_id: Uuid::new_v4().to_string(),
        owner_id: req.user.user_id.clone(),
        name: body.name.trim().to_string(),
        birth_date,
        relationship: body.relationship,
        created_at: Utc::now(),
    };
    state.stores.profiles.create_profile(profile.clone()).await?;

    let details = json!({ "relationship": profile.relationship });
    let profile_id = profile.profile_id.clone();
    let reply = Reply::created(&ProfileResponse {
        profile,
        role: Role::Owner,
    })?;

    Ok(Outcome::new(reply).audited(AuditAction::ProfileCreated, profile_id, details))
}

async fn list(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let profiles = state
        .stores
        .profiles
        .list_accessible(&req.user.user_id)
        .await?;

    Reply::ok(&ProfileListResponse { profiles }).map(Outcome::from)
}

async fn get(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let profile_id = req.profile_id()?;
    let role = req.profile_role.ok_or(AppError::NotFound)?;

    // Deleted between the role check and this read.
    let profile = state
        .stores
        .profiles
        .get_profile(profile_id)
        .await?
        .ok_or(AppError::NotFound)?;

    Reply::ok(&ProfileResponse { profile, role }).map(Outcome::from)
}

async fn delete(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let profile_id = req.profile_id()?.to_string();

    if !state.stores.profiles.delete_profile(&profile_id).await? {
        return Err(AppError::NotFound);
    }
    tracing::info!(user_id = %req.user.user_id, %profile_id, "profile deleted");

    Ok(Outcome::new(Reply::no_content()).audited(
        AuditAction::ProfileDeleted,
        profile_id,
        serde_json::Value::Null,
    ))
}
