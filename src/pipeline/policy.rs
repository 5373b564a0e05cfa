//! Access policy attached to each protected endpoint.
//!
//! The vocabulary is fixed: device presence, device-count ceiling and a
//! profile role requirement. A policy is either static or derived from the
//! raw request; either way it is resolved once per request, before any gate.

use crate::error::AppError;
use crate::models::Role;
use crate::pipeline::request::RawRequest;

/// Where the target profile id comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileIdSource {
    PathParam(&'static str),
    QueryParam(&'static str),
    Literal(String),
}

impl ProfileIdSource {
    pub fn resolve(&self, req: &RawRequest) -> Result<String, AppError> {
        let found = match self {
            Self::PathParam(name) => req.path_param(name),
            Self::QueryParam(name) => req.query_param(name),
            Self::Literal(id) => Some(id.as_str()),
        };

        found
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::bad_request("missing profile id"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRequirement {
    pub id: ProfileIdSource,
    pub required_role: Role,
}

/// The resolved set of checks for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRequirements {
    pub require_device: bool,
    pub enforce_device_limit: bool,
    pub profile: Option<ProfileRequirement>,
}

impl AccessRequirements {
    pub const NONE: Self = Self {
        require_device: false,
        enforce_device_limit: false,
        profile: None,
    };

    pub const DEVICE: Self = Self {
        require_device: true,
        enforce_device_limit: false,
        profile: None,
    };

    pub const fn profile_path(param: &'static str, required_role: Role) -> Self {
        Self {
            require_device: true,
            enforce_device_limit: false,
            profile: Some(ProfileRequirement {
                id: ProfileIdSource::PathParam(param),
                required_role,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub enum AccessPolicy {
    Static(AccessRequirements),
    Derived(fn(&RawRequest) -> AccessRequirements),
}

impl AccessPolicy {
    pub fn resolve(&self, req: &RawRequest) -> AccessRequirements {
        match self {
            Self::Static(requirements) => requirements.clone(),
            Self::Derived(derive) => derive(req),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{body::Bytes, http::HeaderMap, http::Method};

    use super::*;

    fn raw(path: &[(&str, &str)]) -> RawRequest {
        RawRequest {
            method: Method::GET,
            headers: HeaderMap::new(),
            path_params: path
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            query: HashMap::new(),
            body: Bytes::new(),
        }
    }

    fn viewer_of_path(req: &RawRequest) -> AccessRequirements {
        AccessRequirements {
            profile: req.path_param("profileId").map(|id| ProfileRequirement {
                id: ProfileIdSource::Literal(id.to_string()),
                required_role: Role::Viewer,
            }),
            ..AccessRequirements::DEVICE
        }
    }

    #[test]
    fn derived_policy_reads_the_request() {
        let policy = AccessPolicy::Derived(viewer_of_path);
        let resolved = policy.resolve(&raw(&[("profileId", "p1")]));

        let profile = resolved.profile.unwrap();
        assert_eq!(profile.id, ProfileIdSource::Literal("p1".into()));
        assert_eq!(profile.required_role, Role::Viewer);
        assert!(resolved.require_device);
    }

    #[test]
    fn missing_path_param_is_a_bad_request() {
        let source = ProfileIdSource::PathParam("profileId");
        assert!(matches!(
            source.resolve(&raw(&[])),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(source.resolve(&raw(&[("profileId", " p9 ")])).unwrap(), "p9");
    }
}
