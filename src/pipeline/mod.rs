//! Uniform request pipeline for protected endpoints.
//!
//! Every protected handler hands its raw request, its declared [`Endpoint`]
//! and a business-logic callback to [`run`]. Stages run in a fixed order and
//! the first failure short-circuits into the error envelope:
//!
//! 1. parse body (`BAD_REQUEST`)
//! 2. validate body (`VALIDATION_ERROR`)
//! 3. identity (`UNAUTHENTICATED`)
//! 4. resolve the access policy, once
//! 5. device gate (`DEVICE_NOT_FOUND` / `FORBIDDEN`)
//! 6. device-limit gate (`DEVICE_LIMIT_EXCEEDED`)
//! 7. profile RBAC (`NOT_FOUND` / `FORBIDDEN`)
//! 8. callback; errors and panics become `INTERNAL_ERROR`
//! 9. best-effort audit of the successful outcome, spawned after the reply
//!    is computed so it can neither delay nor fail it
//!
//! The correlation id is the `x-request-id` the HTTP layer sets on every
//! request (see `middleware::http`); it names the request span, appears in
//! `INTERNAL_ERROR` bodies and is echoed back on every response.

pub mod policy;
pub mod reply;
pub mod request;

use std::{future::Future, panic::AssertUnwindSafe};

use futures_util::FutureExt;
use tracing::Instrument;

use crate::error::AppError;
use crate::models::Tier;
use crate::services::{
    device_gate, identity::email_fingerprint, rbac, schema::BodySchema, subscription,
};
use crate::state::AppState;

pub use policy::{AccessPolicy, AccessRequirements, ProfileIdSource, ProfileRequirement};
pub use reply::{AuditIntent, Outcome, Reply};
pub use request::{AuthorizedRequest, DEVICE_ID_HEADER, RawRequest, UserContext};

/// Declaration attached to one protected route.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: &'static str,
    pub schema: BodySchema,
    pub policy: AccessPolicy,
}

/// Run every gate for `endpoint`, then `handler`, then the audit append.
///
/// Always produces a reply; nothing escapes as a panic or a transport error.
pub async fn run<F, Fut>(
    state: &AppState,
    endpoint: &Endpoint,
    raw: RawRequest,
    handler: F,
) -> Reply
where
    F: FnOnce(AuthorizedRequest) -> Fut + Send,
    Fut: Future<Output = Result<Outcome, AppError>> + Send,
{
    let correlation_id = raw.correlation_id();
    let span = tracing::info_span!(
        "endpoint",
        name = endpoint.name,
        correlation_id = %correlation_id
    );

    async move {
        let authorized = match authorize(state, endpoint, raw, &correlation_id).await {
            Ok(authorized) => authorized,
            Err(err) => return reject(err, &correlation_id),
        };
        let user_id = authorized.user.user_id.clone();

        let result = AssertUnwindSafe(async move { handler(authorized).await })
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => return reject(err, &correlation_id),
            Err(payload) => {
                tracing::error!(panic = panic_message(&*payload), "handler panicked");
                return reject(AppError::internal("handler panicked"), &correlation_id);
            }
        };

        if outcome.reply.is_success()
            && let Some(intent) = outcome.audit
        {
            state
                .audit
                .dispatch(user_id, intent.action, intent.resource, intent.details);
        }

        outcome.reply
    }
    .instrument(span)
    .await
}

async fn authorize(
    state: &AppState,
    endpoint: &Endpoint,
    raw: RawRequest,
    correlation_id: &str,
) -> Result<AuthorizedRequest, AppError> {
    let body = endpoint.schema.parse(&raw.body)?;
    endpoint.schema.validate(&body)?;

    let identity = state.identity.extract(&raw.headers).map_err(|err| {
        tracing::warn!(error = %err, "identity rejected");
        AppError::Unauthenticated
    })?;
    tracing::debug!(
        user_id = %identity.user_id,
        email_fp = %email_fingerprint(&identity.email),
        "caller identified"
    );

    // Header wins over the token claim.
    let claimed_device_id = raw
        .header(DEVICE_ID_HEADER)
        .map(str::to_string)
        .or_else(|| identity.device_id.clone());

    let requirements = endpoint.policy.resolve(&raw);
    let user_id = identity.user_id.as_str();

    let device = if requirements.require_device {
        let Some(device_id) = claimed_device_id.as_deref() else {
            tracing::warn!(%user_id, "device required but none claimed");
            return Err(AppError::DeviceNotFound);
        };
        Some(
            device_gate::ensure_trusted_device(state.stores.devices.as_ref(), user_id, device_id)
                .await?,
        )
    } else {
        None
    };

    let mut subscription_active = identity.subscription_active;
    if requirements.enforce_device_limit {
        let tier = subscription::resolve_tier(
            state.stores.subscriptions.as_ref(),
            state.subscriptions,
            user_id,
        )
        .await?;
        subscription_active = tier == Tier::Paid;

        device_gate::ensure_within_device_limit(
            state.stores.devices.as_ref(),
            state.limits,
            user_id,
            tier,
            claimed_device_id.as_deref(),
        )
        .await?;
    }

    // The id checked here is the id business logic acts on.
    let (profile_id, profile_role) = match &requirements.profile {
        Some(requirement) => {
            let profile_id = requirement.id.resolve(&raw)?;
            let role = rbac::ensure_role(
                state.stores.profiles.as_ref(),
                user_id,
                &profile_id,
                requirement.required_role,
            )
            .await?;
            (Some(profile_id), Some(role))
        }
        None => (None, None),
    };

    Ok(AuthorizedRequest {
        user: UserContext {
            user_id: identity.user_id,
            email: identity.email,
            device_id: claimed_device_id,
            device,
            subscription_active,
        },
        body,
        path_params: raw.path_params,
        query: raw.query,
        correlation_id: correlation_id.to_string(),
        profile_id,
        profile_role,
    })
}

fn reject(err: AppError, correlation_id: &str) -> Reply {
    match &err {
        AppError::Internal(detail) => {
            tracing::error!(%correlation_id, %detail, "request failed");
        }
        other => {
            tracing::debug!(code = other.code(), "request rejected");
        }
    }
    err.into_reply(correlation_id)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
