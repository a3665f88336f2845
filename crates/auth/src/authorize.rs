use thiserror::Error;

use crate::{IdentityClaims, Permission};

/// Per-operation access requirements.
///
/// Every route declares one of these; a single gate evaluates it before the
/// handler runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    pub requires_auth: bool,
    pub requires_permission: Option<Permission>,
}

impl AccessPolicy {
    /// Anonymous callers allowed.
    pub fn public() -> Self {
        Self::default()
    }

    /// Any verified identity.
    pub fn authenticated() -> Self {
        Self {
            requires_auth: true,
            requires_permission: None,
        }
    }

    /// A verified identity whose permissions grant `permission`.
    pub fn permission(permission: Permission) -> Self {
        Self {
            requires_auth: true,
            requires_permission: Some(permission),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("You must be logged in!")]
    Unauthenticated,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(Permission),
}

/// Evaluate `policy` against the (optional) caller identity.
///
/// - No IO
/// - No panics
pub fn authorize(identity: Option<&IdentityClaims>, policy: &AccessPolicy) -> Result<(), AuthzError> {
    let needs_identity = policy.requires_auth || policy.requires_permission.is_some();

    let Some(identity) = identity else {
        return if needs_identity {
            Err(AuthzError::Unauthenticated)
        } else {
            Ok(())
        };
    };

    match &policy.requires_permission {
        Some(required) if !identity.permissions.grants(required) => {
            Err(AuthzError::Forbidden(required.clone()))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::names;
    use crate::roles::CUSTOMER;
    use crate::{PermissionSet, Roles};
    use petstore_core::UserId;

    fn identity(permissions: PermissionSet) -> IdentityClaims {
        IdentityClaims {
            id: UserId::new(),
            email: "a@x.com".to_string(),
            full_name: "A".to_string(),
            role: Roles::single(CUSTOMER),
            permissions,
        }
    }

    #[test]
    fn public_routes_admit_everyone() {
        let policy = AccessPolicy::public();
        assert_eq!(authorize(None, &policy), Ok(()));
        assert_eq!(authorize(Some(&identity(PermissionSet::new())), &policy), Ok(()));
    }

    #[test]
    fn authenticated_requires_identity() {
        let policy = AccessPolicy::authenticated();
        assert_eq!(authorize(None, &policy), Err(AuthzError::Unauthenticated));
        assert_eq!(authorize(Some(&identity(PermissionSet::new())), &policy), Ok(()));
    }

    #[test]
    fn permission_requires_identity_and_grant() {
        let policy = AccessPolicy::permission(names::CAN_DELETE_PET);

        assert_eq!(authorize(None, &policy), Err(AuthzError::Unauthenticated));

        let mut denied = PermissionSet::new();
        denied.set(&names::CAN_DELETE_PET, false);
        denied.set(&names::CAN_UPDATE_PET, true);
        assert_eq!(
            authorize(Some(&identity(denied)), &policy),
            Err(AuthzError::Forbidden(names::CAN_DELETE_PET))
        );

        let granted: PermissionSet = [names::CAN_DELETE_PET].into_iter().collect();
        assert_eq!(authorize(Some(&identity(granted)), &policy), Ok(()));
    }

    #[test]
    fn permission_without_requires_auth_flag_still_needs_identity() {
        let policy = AccessPolicy {
            requires_auth: false,
            requires_permission: Some(names::CAN_INSERT_PET),
        };
        assert_eq!(authorize(None, &policy), Err(AuthzError::Unauthenticated));
    }
}
