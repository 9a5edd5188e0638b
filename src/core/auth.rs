//! Caller identity and role policies
//!
//! Authentication happens upstream. The identity provider in front of the
//! service forwards the caller as two headers:
//! - `x-user-id`: the caller's employee id
//! - `x-user-role`: `super_admin`, `admin`, `employee` or any other role name
//!
//! Handlers take a [`Caller`] argument and lifecycle services check an
//! [`AuthPolicy`] before they write anything.

use crate::core::error::{DocketError, RequestError};
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Role of a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    SuperAdmin,
    Admin,
    Employee,
    /// Any role the service does not gate on
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Employee => "employee",
            Role::Other(name) => name,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "super_admin" | "superadmin" => Role::SuperAdmin,
            "admin" => Role::Admin,
            "employee" => Role::Employee,
            _ => Role::Other(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller of an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub id: String,
    pub role: Role,
}

impl Caller {
    pub fn new(id: impl Into<String>, role: impl Into<Role>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
        }
    }

    /// Read the caller from forwarded identity headers
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, RequestError> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let id = header(USER_ID_HEADER).ok_or_else(|| RequestError::Unauthorized {
            message: format!("missing {USER_ID_HEADER} header"),
        })?;
        let role = header(USER_ROLE_HEADER).ok_or_else(|| RequestError::Unauthorized {
            message: format!("missing {USER_ROLE_HEADER} header"),
        })?;

        Ok(Caller::new(id, role))
    }

    /// Fail with `AccessDenied` unless the caller satisfies `policy`
    pub fn require(&self, policy: &AuthPolicy) -> Result<(), RequestError> {
        if policy.check(self) {
            Ok(())
        } else {
            Err(RequestError::AccessDenied {
                message: format!("role '{}' may not perform this operation", self.role),
            })
        }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = DocketError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Caller::from_headers(&parts.headers)?)
    }
}

/// Authorization policy for an operation
#[derive(Debug, Clone)]
pub enum AuthPolicy {
    /// Any identified caller
    Authenticated,

    /// Caller must have one of these roles
    HasRole(Vec<Role>),

    /// Super administrators only
    SuperAdminOnly,
}

impl AuthPolicy {
    /// Check if the caller satisfies this policy
    pub fn check(&self, caller: &Caller) -> bool {
        match self {
            AuthPolicy::Authenticated => !caller.id.is_empty(),
            AuthPolicy::HasRole(roles) => roles.contains(&caller.role),
            AuthPolicy::SuperAdminOnly => caller.role == Role::SuperAdmin,
        }
    }
}
