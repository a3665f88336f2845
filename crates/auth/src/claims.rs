use serde::{Deserialize, Serialize};

use petstore_core::UserId;

use crate::{PermissionSet, Roles};

/// Identity claim set carried inside a signed token.
///
/// Permissions are resolved once, when the token is issued; a holder keeps the
/// same set until the token expires or is reissued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaims {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: Roles,
    #[serde(default)]
    pub permissions: PermissionSet,
}

impl IdentityClaims {
    /// Summary of this identity for `lastUpdatedBy`-style fields.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role.clone(),
        }
    }
}

/// Who performed a change (identity without its permissions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub role: Roles,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::names;
    use crate::roles::CUSTOMER;
    use serde_json::json;

    #[test]
    fn wire_shape_is_camel_case() {
        let id = UserId::new();
        let claims = IdentityClaims {
            id,
            email: "a@x.com".to_string(),
            full_name: "A".to_string(),
            role: Roles::single(CUSTOMER),
            permissions: [names::CAN_INSERT_PET].into_iter().collect(),
        };

        assert_eq!(
            serde_json::to_value(&claims).unwrap(),
            json!({
                "id": id.to_string(),
                "email": "a@x.com",
                "fullName": "A",
                "role": "Customer",
                "permissions": { "canInsertPet": true },
            })
        );
    }
}
