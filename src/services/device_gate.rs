//! Trusted-device allowlist and per-tier device ceiling.
//!
//! Both checks read current state and take no lock. Two registrations racing
//! for the last slot can both pass and leave the account one over its
//! ceiling; the next request from that account re-checks and is refused.

use chrono::Utc;
use serde::Serialize;

use crate::error::AppError;
use crate::models::{Device, DeviceAttributes, Tier};
use crate::repos::{DeviceStore, IdentityAdmin};

/// Maximum trusted devices per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub free: u32,
    pub paid: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self { free: 1, paid: 5 }
    }
}

impl DeviceLimits {
    pub fn ceiling(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Free => self.free,
            Tier::Paid => self.paid,
        }
    }
}

/// Confirm `claimed_device_id` is registered to `user_id`.
pub async fn ensure_trusted_device(
    devices: &dyn DeviceStore,
    user_id: &str,
    claimed_device_id: &str,
) -> Result<Device, AppError> {
    let device = devices
        .get(claimed_device_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(%user_id, device_id = %claimed_device_id, "device not registered");
            AppError::DeviceNotFound
        })?;

    if !device.is_owned_by(user_id) {
        tracing::warn!(
            %user_id,
            device_id = %claimed_device_id,
            "device belongs to another account"
        );
        return Err(AppError::Forbidden);
    }

    Ok(device)
}

/// Refuse the request when the account would hold more devices than its tier
/// allows.
///
/// The projection counts the caller's rows, plus one when `claimed_device_id`
/// is not registered yet (the request is about to add it).
pub async fn ensure_within_device_limit(
    devices: &dyn DeviceStore,
    limits: DeviceLimits,
    user_id: &str,
    tier: Tier,
    claimed_device_id: Option<&str>,
) -> Result<(), AppError> {
    let adds_device = match claimed_device_id {
        Some(device_id) => match devices.get(device_id).await? {
            Some(existing) if !existing.is_owned_by(user_id) => {
                tracing::warn!(%user_id, %device_id, "claimed device belongs to another account");
                return Err(AppError::Forbidden);
            }
            Some(_) => false,
            None => true,
        },
        None => false,
    };

    let count = devices.count_by_user(user_id).await?;
    let projected = count + u64::from(adds_device);
    let ceiling = limits.ceiling(tier);

    if projected > u64::from(ceiling) {
        tracing::warn!(%user_id, ?tier, count, ceiling, adds_device, "device limit exceeded");
        return Err(AppError::DeviceLimitExceeded);
    }

    Ok(())
}

/// Record a successful authentication from `device_id`: create the row on
/// first sight, refresh `last_seen` and attributes afterwards.
pub async fn touch_device(
    devices: &dyn DeviceStore,
    user_id: &str,
    device_id: &str,
    attributes: Option<DeviceAttributes>,
) -> Result<(Device, bool), AppError> {
    let existing = devices.get(device_id).await?;
    if let Some(device) = &existing
        && !device.is_owned_by(user_id)
    {
        return Err(AppError::Forbidden);
    }

    let created = existing.is_none();
    let attributes = match (attributes, existing) {
        (Some(attrs), _) => attrs,
        (None, Some(device)) => device.attributes,
        (None, None) => DeviceAttributes::default(),
    };

    let device = Device {
        device_id: device_id.to_string(),
        user_id: user_id.to_string(),
        last_seen: Utc::now(),
        attributes,
    };
    devices.put(device.clone()).await?;

    Ok((device, created))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RevokeScope {
    #[default]
    Single,
    Global,
}

impl RevokeScope {
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw {
            None | Some("single") => Ok(Self::Single),
            Some("global") => Ok(Self::Global),
            Some(_) => Err(AppError::bad_request("scope must be 'single' or 'global'")),
        }
    }
}

/// Remove a trusted device owned by `user_id`.
///
/// `Global` first invalidates every token issued to the account, and only
/// then deletes the row; if the sign-out fails the row stays.
pub async fn revoke(
    devices: &dyn DeviceStore,
    identity_admin: &dyn IdentityAdmin,
    user_id: &str,
    device_id: &str,
    scope: RevokeScope,
) -> Result<Device, AppError> {
    let device = ensure_trusted_device(devices, user_id, device_id).await?;

    if scope == RevokeScope::Global {
        let sessions = identity_admin.global_sign_out(user_id).await?;
        tracing::info!(%user_id, sessions, "global sign-out");
    }

    devices.delete(device_id).await?;
    tracing::info!(%user_id, %device_id, ?scope, "device revoked");

    Ok(device)
}
