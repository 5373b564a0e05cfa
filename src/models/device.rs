use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client-reported attributes captured when a device authenticates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAttributes {
    pub device_type: Option<String>,
    pub os_name: Option<String>,
    pub browser_name: Option<String>,
    pub locale: Option<String>,
    pub time_zone: Option<String>,
}

/// A trusted device. `device_id` is the primary key; `user_id` is the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    pub user_id: String,
    pub last_seen: DateTime<Utc>,
    #[serde(flatten)]
    pub attributes: DeviceAttributes,
}

impl Device {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}
