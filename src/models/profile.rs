/*
 * Responsibility
 * - Family profile, sharing and vaccine record contracts
 * - Role hierarchy (Owner ⊇ Viewer)
 */
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Access role on a shared profile.
///
/// The order is total: `Owner` satisfies every requirement, `Viewer` only a
/// `Viewer` requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Viewer,
    Owner,
}

impl Role {
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "Owner",
            Self::Viewer => "Viewer",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Owner" => Some(Self::Owner),
            "Viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub profile_id: String,
    pub owner_id: String,
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub relationship: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShareStatus {
    Pending,
    Accepted,
}

impl ShareStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "PENDING" => Some(Self::Pending),
            "ACCEPTED" => Some(Self::Accepted),
            _ => None,
        }
    }
}

/// Grant of a role on a profile to another account.
///
/// Invites are addressed by e-mail; `invitee_user_id` is filled on acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    pub profile_id: String,
    pub invitee_email: String,
    pub invitee_user_id: Option<String>,
    pub role: Role,
    pub status: ShareStatus,
    pub invited_by: String,
    pub created_at: DateTime<Utc>,
}

/// A profile together with the caller's effective role on it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileAccess {
    #[serde(flatten)]
    pub profile: Profile,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vaccine {
    pub vaccine_id: String,
    pub profile_id: String,
    pub name: String,
    pub administered_on: NaiveDate,
    pub dose: Option<i32>,
    pub created_at: DateTime<Utc>,
}
