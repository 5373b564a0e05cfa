/*
 * Responsibility
 * - /profiles/{profileId}/vaccines: add + delete (Owner), list (Viewer)
 */
use axum::extract::State;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::api::v1::dto::{
    parse_date,
    vaccines::{AddVaccineRequest, VaccineListResponse},
};
use crate::api::v1::handlers::PROFILE_ID;
use crate::error::{AppError, FieldError};
use crate::models::{AuditAction, Role, Vaccine};
use crate::pipeline::{
    self, AccessPolicy, AccessRequirements, AuthorizedRequest, Endpoint, Outcome, RawRequest,
    Reply,
};
use crate::services::schema::{BodySchema, FieldRule, FieldType};
use crate::state::AppState;

const MAX_DOSE: i64 = 20;

static ADD: Endpoint = Endpoint {
    name: "vaccines.add",
    schema: BodySchema::new(&[
        FieldRule::required("name", FieldType::String).max_length(120),
        FieldRule::required("administeredOn", FieldType::String),
        FieldRule::optional("dose", FieldType::Integer),
    ]),
    policy: AccessPolicy::Static(AccessRequirements::profile_path(PROFILE_ID, Role::Owner)),
};

static LIST: Endpoint = Endpoint {
    name: "vaccines.list",
    schema: BodySchema::EMPTY,
    policy: AccessPolicy::Static(AccessRequirements::profile_path(PROFILE_ID, Role::Viewer)),
};

static DELETE: Endpoint = Endpoint {
    name: "vaccines.delete",
    schema: BodySchema::EMPTY,
    policy: AccessPolicy::Static(AccessRequirements::profile_path(PROFILE_ID, Role::Owner)),
};

pub async fn add_vaccine(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &ADD, raw, |req| add(&state, req)).await
}

pub async fn list_vaccines(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &LIST, raw, |req| list(&state, req)).await
}

pub async fn delete_vaccine(State(state): State<AppState>, raw: RawRequest) -> Reply {
    pipeline::run(&state, &DELETE, raw, |req| delete(&state, req)).await
}

async fn add(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let profile_id = req.profile_id()?.to_string();
    let body: AddVaccineRequest = req.body_as()?;
    let administered_on = parse_date("administeredOn", &body.administered_on)?;

    let dose = match body.dose {
        Some(dose) if !(1..=MAX_DOSE).contains(&dose) => {
            return Err(AppError::Validation(vec![FieldError::new(
                "dose",
                format!("must be between 1 and {MAX_DOSE}"),
            )]));
        }
        Some(dose) => Some(dose as i32),
        None => None,
    };

    let vaccine = Vaccine {
        vaccine_id: Uuid::new_v4().to_string(),
        profile_id: profile_id.clone(),
        name: body.name.trim().to_string(),
        administered_on,
        dose,
        created_at: Utc::now(),
    };
    state.stores.vaccines.add(vaccine.clone()).await?;

    let details = json!({ "vaccineId": vaccine.vaccine_id, "name": vaccine.name });
    Ok(Outcome::new(Reply::created(&vaccine)?).audited(
        AuditAction::VaccineAdded,
        profile_id,
        details,
    ))
}

async fn list(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let profile_id = req.profile_id()?;
    let vaccines = state.stores.vaccines.list_for_profile(profile_id).await?;

    Reply::ok(&VaccineListResponse { vaccines }).map(Outcome::from)
}

async fn delete(state: &AppState, req: AuthorizedRequest) -> Result<Outcome, AppError> {
    let profile_id = req.profile_id()?.to_string();
    let vaccine_id = req.path_param("vaccineId")?.to_string();

    if !state
        .stores
        .vaccines
        .delete(&profile_id, &vaccine_id)
        .await?
    {
        return Err(AppError::NotFound);
    }

    Ok(Outcome::new(Reply::no_content()).audited(
        AuditAction::VaccineDeleted,
        profile_id,
        json!({ "vaccineId": vaccine_id }),
    ))
}
