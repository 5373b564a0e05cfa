/*
 * Responsibility
 * - Gates and building blocks the request pipeline composes
 *   (identity, schema, device trust, profile RBAC, audit, subscription)
 */
pub mod audit;
pub mod device_gate;
pub mod identity;
pub mod rbac;
pub mod schema;
pub mod subscription;

pub use audit::AuditRecorder;
pub use device_gate::DeviceLimits;
pub use identity::IdentityExtractor;
pub use subscription::SubscriptionLookup;
