/*
 * Responsibility
 * - v1 handlers: each protected handler declares its Endpoint (schema +
 *   access policy) and hands its business logic to pipeline::run
 */
pub mod activity;
pub mod devices;
pub mod health;
pub mod profiles;
pub mod shares;
pub mod subscription;
pub mod vaccines;

pub(crate) const PROFILE_ID: &str = "profileId";
