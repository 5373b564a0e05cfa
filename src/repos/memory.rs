//! In-memory store backend.
//!
//! Used when no `DATABASE_URL` is configured in development, and by tests.
//! Behaves like the Postgres adapters, including read-then-write races:
//! nothing here serializes a count against a later insert.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::{
    AuditEvent, Device, Profile, ProfileAccess, Role, Share, ShareStatus, Subscription,
    SubscriptionStatus, Vaccine,
};
use crate::repos::{
    AuditStore, DeviceStore, IdentityAdmin, ProfileStore, RepoResult, SubscriptionPage,
    SubscriptionStore, VaccineStore,
    subscription_repo::{decode_page_token, encode_page_token},
};

#[derive(Debug, Default)]
struct Tables {
    devices: HashMap<String, Device>,
    // user_id -> created_at -> row
    subscriptions: HashMap<String, BTreeMap<DateTime<Utc>, Subscription>>,
    profiles: HashMap<String, Profile>,
    shares: Vec<Share>,
    vaccines: Vec<Vaccine>,
    audit: Vec<AuditEvent>,
    signed_out: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscription rows are written by the billing flow, which lives outside
    /// this service; this stands in for it.
    pub async fn insert_subscription(&self, subscription: Subscription) {
        let mut tables = self.tables.write().await;
        tables
            .subscriptions
            .entry(subscription.user_id.clone())
            .or_default()
            .insert(subscription.created_at, subscription);
    }

    pub async fn subscriptions_of(&self, user_id: &str) -> Vec<Subscription> {
        let tables = self.tables.read().await;
        tables
            .subscriptions
            .get(user_id)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Accounts that went through a global sign-out, in order.
    pub async fn signed_out_users(&self) -> Vec<String> {
        self.tables.read().await.signed_out.clone()
    }
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn get(&self, device_id: &str) -> RepoResult<Option<Device>> {
        Ok(self.tables.read().await.devices.get(device_id).cloned())
    }

    async fn put(&self, device: Device) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        tables.devices.insert(device.device_id.clone(), device);
        Ok(())
    }

    async fn delete(&self, device_id: &str) -> RepoResult<bool> {
        Ok(self.tables.write().await.devices.remove(device_id).is_some())
    }

    async fn count_by_user(&self, user_id: &str) -> RepoResult<u64> {
        let tables = self.tables.read().await;
        let count = tables
            .devices
            .values()
            .filter(|device| device.user_id == user_id)
            .count();
        Ok(count as u64)
    }

    async fn list_by_user(&self, user_id: &str) -> RepoResult<Vec<Device>> {
        let tables = self.tables.read().await;
        let mut devices: Vec<Device> = tables
            .devices
            .values()
            .filter(|device| device.user_id == user_id)
            .cloned()
            .collect();
        devices.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(devices)
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn query_newest_first(
        &self,
        user_id: &str,
        page_token: Option<&str>,
        page_size: u32,
    ) -> RepoResult<SubscriptionPage> {
        let before = page_token.map(decode_page_token).transpose()?;
        let tables = self.tables.read().await;
        let Some(rows) = tables.subscriptions.get(user_id) else {
            return Ok(SubscriptionPage::default());
        };

        let mut newest_first = rows
            .values()
            .rev()
            .filter(|row| before.is_none_or(|cursor| row.created_at < cursor));
        let page: Vec<Subscription> = newest_first
            .by_ref()
            .take(page_size as usize)
            .cloned()
            .collect();
        let has_more = newest_first.next().is_some();

        let next_page_token = if has_more {
            page.last().map(|row| encode_page_token(row.created_at))
        } else {
            None
        };

        Ok(SubscriptionPage {
            rows: page,
            next_page_token,
        })
    }

    async fn mark_canceled(
        &self,
        user_id: &str,
        created_at: DateTime<Utc>,
        canceled_at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .subscriptions
            .get_mut(user_id)
            .and_then(|rows| rows.get_mut(&created_at))
        else {
            return Ok(false);
        };

        row.status = SubscriptionStatus::Canceled;
        row.canceled_at = Some(canceled_at);
        Ok(true)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile_owner(&self, profile_id: &str) -> RepoResult<Option<String>> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .get(profile_id)
            .map(|profile| profile.owner_id.clone()))
    }

    async fn get_accepted_share(
        &self,
        profile_id: &str,
        user_id: &str,
    ) -> RepoResult<Option<Role>> {
        let tables = self.tables.read().await;
        Ok(tables
            .shares
            .iter()
            .find(|share| {
                share.profile_id == profile_id
                    && share.status == ShareStatus::Accepted
                    && share.invitee_user_id.as_deref() == Some(user_id)
            })
            .map(|share| share.role))
    }

    async fn create_profile(&self, profile: Profile) -> RepoResult<()> {
        let mut tables = self.tables.write().await;
        tables.profiles.insert(profile.profile_id.clone(), profile);
        Ok(())
    }

    async fn get_profile(&self, profile_id: &str) -> RepoResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(profile_id).cloned())
    }

    async fn delete_profile(&self, profile_id: &str) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.profiles.remove(profile_id).is_some();
        tables.shares.retain(|share| share.profile_id != profile_id);
        tables
            .vaccines
            .retain(|vaccine| vaccine.profile_id != profile_id);
        Ok(removed)
    }

    async fn list_accessible(&self, user_id: &str) -> RepoResult<Vec<ProfileAccess>> {
        let tables = self.tables.read().await;
        let owned = tables
            .profiles
            .values()
            .filter(|profile| profile.owner_id == user_id)
            .map(|profile| ProfileAccess {
                profile: profile.clone(),
                role: Role::Owner,
            });
        let shared = tables
            .shares
            .iter()
            .filter(|share| {
                share.status == ShareStatus::Accepted
                    && share.invitee_user_id.as_deref() == Some(user_id)
            })
            .filter_map(|share| {
                tables
                    .profiles
                    .get(&share.profile_id)
                    .filter(|profile| profile.owner_id != user_id)
                    .map(|profile| ProfileAccess {
                        profile: profile.clone(),
                        role: share.role,
                    })
            });

        let mut all: Vec<ProfileAccess> = owned.chain(shared).collect();
        all.sort_by(|a, b| b.profile.created_at.cmp(&a.profile.created_at));
        Ok(all)
    }

    async fn create_share(&self, share: Share) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let exists = tables.shares.iter().any(|existing| {
            existing.profile_id == share.profile_id && existing.invitee_email == share.invitee_email
        });
        if exists {
            return Ok(false);
        }
        tables.shares.push(share);
        Ok(true)
    }

    async fn accept_share(
        &self,
        profile_id: &str,
        invitee_email: &str,
        user_id: &str,
    ) -> RepoResult<Option<Share>> {
        let mut tables = self.tables.write().await;
        let Some(share) = tables.shares.iter_mut().find(|share| {
            share.profile_id == profile_id
                && share.invitee_email == invitee_email
                && share.status == ShareStatus::Pending
        }) else {
            return Ok(None);
        };

        share.status = ShareStatus::Accepted;
        share.invitee_user_id = Some(user_id.to_string());
        Ok(Some(share.clone()))
    }

    async fn delete_share(&self, profile_id: &str, invitee_email: &str) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.shares.len();
        tables.shares.retain(|share| {
            !(share.profile_id == profile_id && share.invitee_email == invitee_email)
        });
        Ok(tables.shares.len() < before)
    }

    async fn list_shares(&self, profile_id: &str) -> RepoResult<Vec<Share>> {
        let tables = self.tables.read().await;
        Ok(tables
            .shares
            .iter()
            .filter(|share| share.profile_id == profile_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VaccineStore for MemoryStore {
    async fn add(&self, vaccine: Vaccine) -> RepoResult<()> {
        self.tables.write().await.vaccines.push(vaccine);
        Ok(())
    }

    async fn list_for_profile(&self, profile_id: &str) -> RepoResult<Vec<Vaccine>> {
        let tables = self.tables.read().await;
        let mut vaccines: Vec<Vaccine> = tables
            .vaccines
            .iter()
            .filter(|vaccine| vaccine.profile_id == profile_id)
            .cloned()
            .collect();
        vaccines.sort_by(|a, b| {
            b.administered_on
                .cmp(&a.administered_on)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(vaccines)
    }

    async fn delete(&self, profile_id: &str, vaccine_id: &str) -> RepoResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.vaccines.len();
        tables.vaccines.retain(|vaccine| {
            !(vaccine.profile_id == profile_id && vaccine.vaccine_id == vaccine_id)
        });
        Ok(tables.vaccines.len() < before)
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, event: AuditEvent) -> RepoResult<()> {
        self.tables.write().await.audit.push(event);
        Ok(())
    }

    async fn list_by_resource(&self, resource: &str, limit: u32) -> RepoResult<Vec<AuditEvent>> {
        let tables = self.tables.read().await;
        // Appends arrive in ts order, so reverse insertion order is newest first.
        Ok(tables
            .audit
            .iter()
            .rev()
            .filter(|event| event.resource == resource)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl IdentityAdmin for MemoryStore {
    async fn global_sign_out(&self, user_id: &str) -> RepoResult<u64> {
        self.tables
            .write()
            .await
            .signed_out
            .push(user_id.to_string());
        Ok(1)
    }
}
