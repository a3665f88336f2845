use std::borrow::Cow;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::permissions::{names, PermissionSet};

/// Role identifier used for RBAC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(Cow<'static, str>);

impl RoleName {
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

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const CUSTOMER: RoleName = RoleName::from_static("Customer");
pub const EMPLOYEE: RoleName = RoleName::from_static("Employee");
pub const ADMIN: RoleName = RoleName::from_static("Admin");

/// A named bundle of permissions, as held by the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: RoleName,
    #[serde(default)]
    pub permissions: PermissionSet,
}

/// Roles seeded into an empty store.
pub fn default_roles() -> Vec<Role> {
    vec![
        Role {
            name: CUSTOMER,
            permissions: PermissionSet::new(),
        },
        Role {
            name: EMPLOYEE,
            permissions: [names::CAN_INSERT_PET, names::CAN_UPDATE_PET]
                .into_iter()
                .collect(),
        },
        Role {
            name: ADMIN,
            permissions: names::ALL.into_iter().collect(),
        },
    ]
}

/// The role(s) held by an identity, in assignment order.
///
/// On the wire this is a bare string when exactly one role is held and an
/// array otherwise; both shapes are accepted when reading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roles(Vec<RoleName>);

impl Roles {
    pub fn single(role: RoleName) -> Self {
        Self(vec![role])
    }

    pub fn new(roles: Vec<RoleName>) -> Self {
        Self(roles)
    }

    pub fn as_slice(&self) -> &[RoleName] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleName> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Roles {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.as_slice() {
            [one] => one.serialize(serializer),
            many => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Roles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(RoleName),
            Many(Vec<RoleName>),
        }

        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(role) => Roles::single(role),
            OneOrMany::Many(roles) => Roles(roles),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_role_is_a_bare_string() {
        let roles = Roles::single(CUSTOMER);
        assert_eq!(serde_json::to_value(&roles).unwrap(), json!("Customer"));
    }

    #[test]
    fn several_roles_are_an_array() {
        let roles = Roles::new(vec![EMPLOYEE, ADMIN]);
        assert_eq!(
            serde_json::to_value(&roles).unwrap(),
            json!(["Employee", "Admin"])
        );
    }

    #[test]
    fn accepts_both_shapes() {
        let one: Roles = serde_json::from_value(json!("Admin")).unwrap();
        let many: Roles = serde_json::from_value(json!(["Customer", "Admin"])).unwrap();

        assert_eq!(one.as_slice(), &[ADMIN]);
        assert_eq!(many.as_slice(), &[CUSTOMER, ADMIN]);
    }

    #[test]
    fn admin_holds_every_known_permission() {
        let admin = default_roles().into_iter().find(|r| r.name == ADMIN).unwrap();
        for p in names::ALL {
            assert!(admin.permissions.grants(&p), "admin lacks {p}");
        }
    }
}
