/*
 * Responsibility
 * - Shared context attached to the Router (AppState)
 *   - stores behind trait objects, identity extractor, audit recorder,
 *     device ceilings and subscription scan bounds
 * - Cheap to Clone (Arc inside)
 */
use std::{sync::Arc, time::Duration};

use crate::repos::{MemoryStore, Stores};
use crate::services::{AuditRecorder, DeviceLimits, IdentityExtractor, SubscriptionLookup};

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub identity: Arc<IdentityExtractor>,
    pub audit: AuditRecorder,
    pub limits: DeviceLimits,
    pub subscriptions: SubscriptionLookup,
}

impl AppState {
    pub fn new(
        stores: Stores,
        identity: IdentityExtractor,
        audit_write_timeout: Duration,
        limits: DeviceLimits,
        subscriptions: SubscriptionLookup,
    ) -> Self {
        let audit = AuditRecorder::new(stores.audit.clone(), audit_write_timeout);
        Self {
            stores,
            identity: Arc::new(identity),
            audit,
            limits,
            subscriptions,
        }
    }

    /// In-memory stores, claims taken verbatim, default limits.
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self::new(
            Stores::memory(store),
            IdentityExtractor::trusted(),
            Duration::from_secs(2),
            DeviceLimits::default(),
            SubscriptionLookup::default(),
        )
    }
}
