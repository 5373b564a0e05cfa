use serde::{Deserialize, Serialize};

/// Closed set of state-changing actions recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    ProfileCreated,
    ProfileDeleted,
    VaccineAdded,
    VaccineDeleted,
    ShareInvited,
    ShareAccepted,
    ShareRevoked,
    SubscriptionCanceled,
    DeviceRegistered,
    DeviceRevoked,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProfileCreated => "PROFILE_CREATED",
            Self::ProfileDeleted => "PROFILE_DELETED",
            Self::VaccineAdded => "VACCINE_ADDED",
            Self::VaccineDeleted => "VACCINE_DELETED",
            Self::ShareInvited => "SHARE_INVITED",
            Self::ShareAccepted => "SHARE_ACCEPTED",
            Self::ShareRevoked => "SHARE_REVOKED",
            Self::SubscriptionCanceled => "SUBSCRIPTION_CANCELED",
            Self::DeviceRegistered => "DEVICE_REGISTERED",
            Self::DeviceRevoked => "DEVICE_REVOKED",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        [
            Self::ProfileCreated,
            Self::ProfileDeleted,
            Self::VaccineAdded,
            Self::VaccineDeleted,
            Self::ShareInvited,
            Self::ShareAccepted,
            Self::ShareRevoked,
            Self::SubscriptionCanceled,
            Self::DeviceRegistered,
            Self::DeviceRevoked,
        ]
        .into_iter()
        .find(|action| action.as_str() == raw)
    }
}

/// Append-only activity record.
///
/// Owned by the actor (`user_id`), indexed by the affected `resource`.
/// `ts` is wall-clock epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub user_id: String,
    pub ts: i64,
    pub action: AuditAction,
    pub resource: String,
    #[serde(default)]
    pub details: serde_json::Value,
}
