//! Role check on shared profiles.
//!
//! "Profile does not exist" and "caller has no access" both answer
//! `NotFound`; only the log tells them apart.

use crate::error::AppError;
use crate::models::Role;
use crate::repos::ProfileStore;

/// Effective role of `user_id` on `profile_id`, if any.
pub async fn effective_role(
    profiles: &dyn ProfileStore,
    user_id: &str,
    profile_id: &str,
) -> Result<Option<Role>, AppError> {
    let Some(owner) = profiles.get_profile_owner(profile_id).await? else {
        tracing::warn!(%user_id, %profile_id, "profile does not exist");
        return Ok(None);
    };

    if owner == user_id {
        return Ok(Some(Role::Owner));
    }

    let shared = profiles.get_accepted_share(profile_id, user_id).await?;
    if shared.is_none() {
        tracing::warn!(%user_id, %profile_id, "no accepted share for caller");
    }
    Ok(shared)
}

/// Require at least `required` on `profile_id`; returns the effective role.
pub async fn ensure_role(
    profiles: &dyn ProfileStore,
    user_id: &str,
    profile_id: &str,
    required: Role,
) -> Result<Role, AppError> {
    let role = effective_role(profiles, user_id, profile_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if !role.satisfies(required) {
        tracing::warn!(
            %user_id,
            %profile_id,
            held = role.as_str(),
            required = required.as_str(),
            "insufficient role"
        );
        return Err(AppError::Forbidden);
    }

    Ok(role)
}
