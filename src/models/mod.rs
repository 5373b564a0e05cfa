/*
 * Responsibility
 * - Data contracts shared by the gates, the pipeline and the store adapters
 * - No I/O here; repos map these to/from rows
 */
pub mod audit;
pub mod device;
pub mod profile;
pub mod subscription;

pub use audit::{AuditAction, AuditEvent};
pub use device::{Device, DeviceAttributes};
pub use profile::{Profile, ProfileAccess, Role, Share, ShareStatus, Vaccine};
pub use subscription::{Subscription, SubscriptionStatus, Tier};
