/*
 * Responsibility
 * - v1 URL structure
 * - /health bypasses the pipeline; every other route runs it inside the
 *   handler (policy is declared per endpoint, not per route layer)
 */
use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

use crate::api::v1::handlers::{
    activity::profile_activity,
    devices::{heartbeat, list_devices, register_device, revoke_device},
    health::health,
    profiles::{create_profile, delete_profile, get_profile, list_profiles},
    shares::{accept_share, invite_share, list_shares, revoke_share},
    subscription::{cancel_subscription, get_subscription},
    vaccines::{add_vaccine, delete_vaccine, list_vaccines},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/devices", get(list_devices).post(register_device))
        .route("/devices/heartbeat", post(heartbeat))
        .route("/devices/{deviceId}", delete(revoke_device))
        .route("/subscription", get(get_subscription))
        .route("/subscription/cancel", post(cancel_subscription))
        .route("/profiles", get(list_profiles).post(create_profile))
        .route(
            "/profiles/{profileId}",
            get(get_profile).delete(delete_profile),
        )
        .route(
            "/profiles/{profileId}/shares",
            get(list_shares).post(invite_share),
        )
        .route("/profiles/{profileId}/shares/accept", post(accept_share))
        .route("/profiles/{profileId}/shares/{email}", delete(revoke_share))
        .route(
            "/profiles/{profileId}/vaccines",
            get(list_vaccines).post(add_vaccine),
        )
        .route(
            "/profiles/{profileId}/vaccines/{vaccineId}",
            delete(delete_vaccine),
        )
        .route("/profiles/{profileId}/activity", get(profile_activity))
}
