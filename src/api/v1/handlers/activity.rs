/*
 * Responsibility
 * - GET /profiles/{profileId}/activity (Owner): recent audit events for
 *   the profile, newest first
 */
use axum::extract::State;

use crate::api::v1::dto::profiles::ActivityResponse;
use crate::api::v1::handlers::PROFILE_ID;
use crate::error::AppError;
use crate::models::Role;
use crate::pipeline::{
    self, AccessPolicy, AccessRequirements, AuthorizedRequest, Endpoint, Outcome, RawRequest,
    Reply,
};
use crate::services::schema::BodySchema;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

static ACTIVITY: Endpoint = Endpoint {
    name: "profiles.activity",
    schema: BodySchema::EMPTY,
    policy: AccessPolicy::Static(AccessRequirements::profile_path(PROFILE_ID, Role::Owner)),
};

pub async fn profile_activity(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &ACTIVITY, raw, |req| activity(&state, req)).await
}

fn limit(raw: Option<&str>) -> Result<u32, AppError> {
    match raw {
        None => Ok(DEFAULT_LIMIT),
        Some(raw) => raw
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=MAX_LIMIT).contains(n))
            .ok_or_else(|| AppError::bad_request(format!("limit must be 1..={MAX_LIMIT}"))),
    }
}

async fn activity(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let profile_id = req.profile_id()?;
    let limit = limit(req.query_param("limit"))?;

    let events = state
        .stores
        .audit
        .list_by_resource(profile_id, limit)
        .await?;

    Reply::ok(&ActivityResponse { events }).map(Outcome::from)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, Some(50))]
    #[case(Some("10"), Some(10))]
    #[case(Some("0"), None)]
    #[case(Some("201"), None)]
    #[case(Some("ten"), None)]
    fn limit_bounds(#[case] raw: Option<&str>, #[case] expected: Option<u32>) {
        assert_eq!(limit(raw).ok(), expected);
    }
}
