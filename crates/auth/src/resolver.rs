//! Role → permission resolution.

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;

use crate::{PermissionSet, Role, RoleName, Roles};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("role lookup failed: {0}")]
pub struct RoleLookupError(pub String);

/// Read access to role definitions (usually the credential store).
#[async_trait]
pub trait RoleSource: Send + Sync {
    async fn find_role_by_name(&self, name: &RoleName) -> Result<Option<Role>, RoleLookupError>;
}

/// Merge the permissions of every held role into one set.
///
/// Lookups run concurrently and are merged once all complete. Unknown role
/// names contribute nothing; a failed lookup fails the whole resolution.
pub async fn resolve_permissions<R>(source: &R, roles: &Roles) -> Result<PermissionSet, RoleLookupError>
where
    R: RoleSource + ?Sized,
{
    let found = join_all(roles.iter().map(|name| source.find_role_by_name(name))).await;

    let mut merged = PermissionSet::new();
    for (name, role) in roles.iter().zip(found) {
        match role? {
            Some(role) => merged.merge(&role.permissions),
            None => tracing::debug!(role = %name, "role not found; contributes no permissions"),
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use futures::executor::block_on;
    use proptest::prelude::*;

    use super::*;
    use crate::permissions::names;
    use crate::Permission;

    struct Table(HashMap<RoleName, Role>);

    #[async_trait]
    impl RoleSource for Table {
        async fn find_role_by_name(&self, name: &RoleName) -> Result<Option<Role>, RoleLookupError> {
            Ok(self.0.get(name).cloned())
        }
    }

    struct Broken;

    #[async_trait]
    impl RoleSource for Broken {
        async fn find_role_by_name(&self, _name: &RoleName) -> Result<Option<Role>, RoleLookupError> {
            Err(RoleLookupError("connection reset".to_string()))
        }
    }

    fn table(roles: Vec<Role>) -> Table {
        Table(roles.into_iter().map(|r| (r.name.clone(), r)).collect())
    }

    fn role(name: &'static str, perms: &[Permission]) -> Role {
        Role {
            name: RoleName::from_static(name),
            permissions: perms.iter().cloned().collect(),
        }
    }

    #[test]
    fn grant_survives_regardless_of_order() {
        let mut b = role("B", &[]);
        b.permissions.set(&names::CAN_DELETE_PET, false);
        let source = table(vec![role("A", &[names::CAN_DELETE_PET]), b]);

        let ab = Roles::new(vec![RoleName::from_static("A"), RoleName::from_static("B")]);
        let ba = Roles::new(vec![RoleName::from_static("B"), RoleName::from_static("A")]);

        let from_ab = block_on(resolve_permissions(&source, &ab)).unwrap();
        let from_ba = block_on(resolve_permissions(&source, &ba)).unwrap();

        assert!(from_ab.grants(&names::CAN_DELETE_PET));
        assert_eq!(from_ab, from_ba);
    }

    #[test]
    fn unknown_roles_contribute_nothing() {
        let source = table(vec![role("Employee", &[names::CAN_INSERT_PET])]);
        let roles = Roles::new(vec![
            RoleName::from_static("Ghost"),
            RoleName::from_static("Employee"),
        ]);

        let perms = block_on(resolve_permissions(&source, &roles)).unwrap();
        assert_eq!(perms.granted().collect::<Vec<_>>(), vec!["canInsertPet"]);

        let none = block_on(resolve_permissions(&source, &Roles::single(RoleName::from_static("Ghost"))))
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn lookup_failure_fails_resolution() {
        let result = block_on(resolve_permissions(&Broken, &Roles::single(RoleName::from_static("Admin"))));
        assert_eq!(result, Err(RoleLookupError("connection reset".to_string())));
    }

    #[test]
    fn works_through_trait_objects() {
        let source: Box<dyn RoleSource> = Box::new(table(vec![role("Admin", &names::ALL)]));
        let perms = block_on(resolve_permissions(&*source, &Roles::single(RoleName::from_static("Admin"))))
            .unwrap();
        assert!(perms.grants(&names::CAN_VIEW_EDITS));
    }

    fn tables() -> impl Strategy<Value = (Vec<Vec<bool>>, Vec<usize>)> {
        prop::collection::vec(prop::collection::vec(any::<bool>(), names::ALL.len()), 1..6)
            .prop_flat_map(|grants| {
                let order: Vec<usize> = (0..grants.len()).collect();
                (Just(grants), Just(order).prop_shuffle())
            })
    }

    proptest! {
        #[test]
        fn resolution_is_order_independent_union((grants, order) in tables()) {
            let roles: Vec<Role> = grants
                .iter()
                .enumerate()
                .map(|(i, flags)| {
                    let mut permissions = PermissionSet::new();
                    for (p, granted) in names::ALL.iter().zip(flags) {
                        permissions.set(p, *granted);
                    }
                    Role { name: RoleName::new(format!("role-{i}")), permissions }
                })
                .collect();

            let in_order = Roles::new(roles.iter().map(|r| r.name.clone()).collect());
            let shuffled = Roles::new(order.iter().map(|i| roles[*i].name.clone()).collect());

            let mut expected = PermissionSet::new();
            for r in &roles {
                expected.merge(&r.permissions);
            }

            let source = table(roles);
            let a = block_on(resolve_permissions(&source, &in_order)).unwrap();
            let b = block_on(resolve_permissions(&source, &shuffled)).unwrap();

            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.granted().collect::<Vec<_>>(), expected.granted().collect::<Vec<_>>());
        }
    }
}
