/*
 * Responsibility
 * - /profiles/{profileId}/shares: invite, list, revoke (Owner)
 * - accept: the invitee binds a pending invite addressed to their email
 */
use axum::extract::State;
use chrono::Utc;
use serde_json::json;

use crate::api::v1::dto::shares::{InviteRequest, ShareListResponse};
use crate::api::v1::handlers::PROFILE_ID;
use crate::error::AppError;
use crate::models::{AuditAction, Role, Share, ShareStatus};
use crate::pipeline::{
    self, AccessPolicy, AccessRequirements, AuthorizedRequest, Endpoint, Outcome, RawRequest,
    Reply,
};
use crate::services::identity::email_fingerprint;
use crate::services::schema::{BodySchema, FieldRule, FieldType};
use crate::state::AppState;

const OWNER_OF_PATH: AccessRequirements =
    AccessRequirements::profile_path(PROFILE_ID, Role::Owner);

static INVITE: Endpoint = Endpoint {
    name: "shares.invite",
    schema: BodySchema::new(&[
        FieldRule::required("email", FieldType::String).max_length(254),
        FieldRule::required("role", FieldType::String).one_of(&["Owner", "Viewer"]),
    ]),
    policy: AccessPolicy::Static(OWNER_OF_PATH),
};

static LIST: Endpoint = Endpoint {
    name: "shares.list",
    schema: BodySchema::EMPTY,
    policy: AccessPolicy::Static(OWNER_OF_PATH),
};

static ACCEPT: Endpoint = Endpoint {
    name: "shares.accept",
    schema: BodySchema::EMPTY,
    policy: AccessPolicy::Static(AccessRequirements::DEVICE),
};

static REVOKE: Endpoint = Endpoint {
    name: "shares.revoke",
    schema: BodySchema::EMPTY,
    policy: AccessPolicy::Static(OWNER_OF_PATH),
};

fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

pub async fn invite_share(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &INVITE, raw, |req| invite(&state, req)).await
}

pub async fn list_shares(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &LIST, raw, |req| list(&state, req)).await
}

pub async fn accept_share(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &ACCEPT, raw, |req| accept(&state, req)).await
}

pub async fn revoke_share(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &REVOKE, raw, |req| revoke(&state, req)).await
}

async fn invite(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let profile_id = req.profile_id()?.to_string();
    let body: InviteRequest = req.body_as()?;
    let invitee_email = normalize_email(&body.email);

    if invitee_email == normalize_email(&req.user.email) {
        return Err(AppError::bad_request("cannot share a profile with yourself"));
    }

    let share = Share {
        profile_id: profile_id.clone(),
        invitee_email,
        invitee_user_id: None,
        role: body.role,
        status: ShareStatus::Pending,
        invited_by: req.user.user_id.clone(),
        created_at: Utc::now(),
    };
    if !state.stores.profiles.create_share(share.clone()).await? {
        return Err(AppError::Conflict);
    }

    let invitee_fp = email_fingerprint(&share.invitee_email);
    tracing::info!(
        %profile_id,
        invitee_fp = %invitee_fp,
        role = share.role.as_str(),
        "share invited"
    );

    let details = json!({ "inviteeFp": invitee_fp, "role": share.role });
    Ok(Outcome::new(Reply::created(&share)?).audited(
        AuditAction::ShareInvited,
        profile_id,
        details,
    ))
}

async fn list(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let profile_id = req.profile_id()?;
    let shares = state.stores.profiles.list_shares(profile_id).await?;
    Reply::ok(&ShareListResponse { shares }).map(Outcome::from)
}

async fn accept(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let profile_id = req.path_param(PROFILE_ID)?.to_string();
    let email = normalize_email(&req.user.email);

    let share = state
        .stores
        .profiles
        .accept_share(&profile_id, &email, &req.user.user_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(
                user_id = %req.user.user_id,
                %profile_id,
                email_fp = %email_fingerprint(&email),
                "no pending invite for caller"
            );
            AppError::NotFound
        })?;

    let details = json!({ "role": share.role });
    Ok(Outcome::new(Reply::ok(&share)?).audited(
        AuditAction::ShareAccepted,
        profile_id,
        details,
    ))
}

async fn revoke(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let profile_id = req.profile_id()?.to_string();
    let invitee_email = normalize_email(req.path_param("email")?);

    if !state
        .stores
        .profiles
        .delete_share(&profile_id, &invitee_email)
        .await?
    {
        return Err(AppError::NotFound);
    }

    let details = json!({ "inviteeFp": email_fingerprint(&invitee_email) });
    Ok(Outcome::new(Reply::no_content()).audited(
        AuditAction::ShareRevoked,
        profile_id,
        details,
    ))
}
