/*
 * Responsibility
 * - Profile create body, profile responses
 */
use serde::{Deserialize, Serialize};

use crate::models::{AuditEvent, Profile, ProfileAccess, Role};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub name: String,
    pub birth_date: Option<String>,
    pub relationship: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct ProfileListResponse {
    pub profiles: Vec<ProfileAccess>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub events: Vec<AuditEvent>,
}
