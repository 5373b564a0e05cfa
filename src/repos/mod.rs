/*
 * Responsibility
 * - Narrow interfaces to the external stores (device / subscription /
 *   profile+share / vaccine / audit / identity issuer admin)
 * - Postgres adapters next to each trait; in-memory backend in `memory`
 */
pub mod audit_repo;
pub mod device_repo;
pub mod error;
pub mod memory;
pub mod profile_repo;
pub mod session_repo;
pub mod subscription_repo;
pub mod vaccine_repo;

use std::sync::Arc;

use sqlx::PgPool;

pub use audit_repo::AuditStore;
pub use device_repo::DeviceStore;
pub use error::{RepoError, RepoResult};
pub use memory::MemoryStore;
pub use profile_repo::ProfileStore;
pub use session_repo::IdentityAdmin;
pub use subscription_repo::{SubscriptionPage, SubscriptionStore};
pub use vaccine_repo::VaccineStore;

/// Every store the request pipeline and handlers reach, behind trait objects.
#[derive(Clone)]
pub struct Stores {
    pub devices: Arc<dyn DeviceStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub vaccines: Arc<dyn VaccineStore>,
    pub audit: Arc<dyn AuditStore>,
    pub identity_admin: Arc<dyn IdentityAdmin>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            devices: Arc::new(device_repo::PgDeviceStore::new(pool.clone())),
            subscriptions: Arc::new(subscription_repo::PgSubscriptionStore::new(pool.clone())),
            profiles: Arc::new(profile_repo::PgProfileStore::new(pool.clone())),
            vaccines: Arc::new(vaccine_repo::PgVaccineStore::new(pool.clone())),
            audit: Arc::new(audit_repo::PgAuditStore::new(pool.clone())),
            identity_admin: Arc::new(session_repo::PgSessionRevoker::new(pool)),
        }
    }

    /// All stores backed by one shared in-memory instance.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            devices: store.clone(),
            subscriptions: store.clone(),
            profiles: store.clone(),
            vaccines: store.clone(),
            audit: store.clone(),
            identity_admin: store,
        }
    }
}
