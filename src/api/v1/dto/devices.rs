/*
 * Responsibility
 * - Device registration body and device listing / revoke responses
 */
use serde::Serialize;

use crate::models::Device;
use crate::services::device_gate::RevokeScope;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    #[serde(flatten)]
    pub device: Device,
    pub created: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceListResponse {
    pub devices: Vec<Device>,
    pub current_device_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeResponse {
    pub device_id: String,
    pub scope: RevokeScope,
}
