use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque camelCase capability names (e.g. "canDeletePet").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Capabilities checked by the API routes.
pub mod names {
    use super::Permission;

    pub const CAN_INSERT_PET: Permission = Permission::from_static("canInsertPet");
    pub const CAN_UPDATE_PET: Permission = Permission::from_static("canUpdatePet");
    pub const CAN_DELETE_PET: Permission = Permission::from_static("canDeletePet");
    pub const CAN_UPDATE_USER: Permission = Permission::from_static("canUpdateUser");
    pub const CAN_VIEW_EDITS: Permission = Permission::from_static("canViewEdits");

    pub const ALL: [Permission; 5] = [
        CAN_INSERT_PET,
        CAN_UPDATE_PET,
        CAN_DELETE_PET,
        CAN_UPDATE_USER,
        CAN_VIEW_EDITS,
    ];
}

/// Permission name → granted flag.
///
/// Only explicit `true` entries grant a capability; absent and `false` entries
/// are equivalent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeMap<String, bool>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grants(&self, permission: &Permission) -> bool {
        self.0.get(permission.as_str()).copied().unwrap_or(false)
    }

    pub fn set(&mut self, permission: &Permission, granted: bool) {
        self.0.insert(permission.as_str().to_string(), granted);
    }

    /// Union: copy every `true` entry of `other` into `self`.
    ///
    /// Never clears a grant, so merging is commutative and idempotent.
    pub fn merge(&mut self, other: &PermissionSet) {
        for (name, granted) in &other.0 {
            if *granted {
                self.0.insert(name.clone(), true);
            }
        }
    }

    /// Names of granted permissions, sorted.
    pub fn granted(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, granted)| **granted)
            .map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.granted().next().is_none()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = Permission>>(iter: T) -> Self {
        let mut set = Self::new();
        for p in iter {
            set.set(&p, true);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::names::*;
    use super::*;

    #[test]
    fn only_true_entries_grant() {
        let mut set = PermissionSet::new();
        set.set(&CAN_DELETE_PET, false);
        set.set(&CAN_INSERT_PET, true);

        assert!(set.grants(&CAN_INSERT_PET));
        assert!(!set.grants(&CAN_DELETE_PET));
        assert!(!set.grants(&CAN_UPDATE_PET));
    }

    #[test]
    fn merge_never_revokes() {
        let mut a: PermissionSet = [CAN_DELETE_PET].into_iter().collect();
        let mut b = PermissionSet::new();
        b.set(&CAN_DELETE_PET, false);

        a.merge(&b);
        assert!(a.grants(&CAN_DELETE_PET));

        b.merge(&a);
        assert!(b.grants(&CAN_DELETE_PET));
    }

    #[test]
    fn serializes_as_plain_map() {
        let set: PermissionSet = [CAN_UPDATE_PET].into_iter().collect();
        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!({ "canUpdatePet": true }));
    }
}
