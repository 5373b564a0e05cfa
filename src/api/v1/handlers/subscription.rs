/*
 * Responsibility
 * - GET /subscription (current tier from storage, not from the token)
 * - POST /subscription/cancel
 */
use axum::extract::State;
use serde_json::json;

use crate::api::v1::dto::subscription::SubscriptionResponse;
use crate::error::AppError;
use crate::models::{AuditAction, Tier};
use crate::pipeline::{
    self, AccessPolicy, AccessRequirements, AuthorizedRequest, Endpoint, Outcome, RawRequest,
    Reply,
};
use crate::services::schema::BodySchema;
use crate::services::subscription as lookup;
use crate::state::AppState;

static CURRENT: Endpoint = Endpoint {
    name: "subscription.current",
    schema: BodySchema::EMPTY,
    policy: AccessPolicy::Static(AccessRequirements::NONE),
};

static CANCEL: Endpoint = Endpoint {
    name: "subscription.cancel",
    schema: BodySchema::EMPTY,
    policy: AccessPolicy::Static(AccessRequirements::DEVICE),
};

pub async fn get_subscription(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &CURRENT, raw, |req| current(&state, req)).await
}

pub async fn cancel_subscription(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &CANCEL, raw, |req| cancel(&state, req)).await
}

async fn current(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let subscription = lookup::resolve_current(
        state.stores.subscriptions.as_ref(),
        state.subscriptions,
        &req.user.user_id,
    )
    .await?;

    Reply::ok(&SubscriptionResponse {
        tier: Tier::from_current(subscription.as_ref()),
        subscription,
    })
    .map(Outcome::from)
}

async fn cancel(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let canceled = lookup::cancel_current(
        state.stores.subscriptions.as_ref(),
        state.subscriptions,
        &req.user.user_id,
    )
    .await?;
    tracing::info!(user_id = %req.user.user_id, "subscription canceled");

    let details = json!({ "createdAt": canceled.created_at });
    let tier = lookup::resolve_tier(
        state.stores.subscriptions.as_ref(),
        state.subscriptions,
        &req.user.user_id,
    )
    .await?;

    let reply = Reply::ok(&SubscriptionResponse {
        tier,
        subscription: Some(canceled),
    })?;
    Ok(Outcome::new(reply).audited(
        AuditAction::SubscriptionCanceled,
        req.user.user_id,
        details,
    ))
}
